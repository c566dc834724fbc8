//! `get_release_prs` — merged pull requests around a release, grouped by kind.
//!
//! The release window is approximated by the tag's publish date: closed
//! issues updated since then are listed and only merged pull requests kept.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::github::types::{IssueItem, Release};
use crate::github::GitHubApi;
use crate::Result;

use super::{ToolOutput, ToolResult};

const BUG_KEYWORDS: [&str; 4] = ["bug", "fix", "defect", "hotfix"];
const ENHANCEMENT_KEYWORDS: [&str; 4] = ["feature", "enhancement", "new", "feat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrCategory {
    BugFix,
    Enhancement,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub labels: Vec<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseChanges {
    pub owner: String,
    pub repo: String,
    pub tag: String,
    pub published_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub bug_fixes: Vec<PullRequestSummary>,
    pub enhancements: Vec<PullRequestSummary>,
    pub other: Vec<PullRequestSummary>,
}

/// The label itself and its last `kind/x` or `type: x` segment, lowercased.
fn label_names(label: &str) -> (String, String) {
    let whole = label.trim().to_lowercase();
    let last = whole
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    (whole, last)
}

/// Categorize a pull request by its labels, then by a conventional-commit title prefix.
pub fn categorize(title: &str, labels: &[String]) -> PrCategory {
    let title = title.trim().to_lowercase();
    let label_has = |keywords: &[&'static str; 4]| {
        labels.iter().any(|label| {
            let (whole, last) = label_names(label);
            keywords.iter().any(|k| *k == whole || *k == last)
        })
    };

    if label_has(&BUG_KEYWORDS) || title.starts_with("fix") {
        PrCategory::BugFix
    } else if label_has(&ENHANCEMENT_KEYWORDS) || title.starts_with("feat") {
        PrCategory::Enhancement
    } else {
        PrCategory::Other
    }
}

pub async fn get_release_prs(
    github: &dyn GitHubApi,
    owner: &str,
    repo: &str,
    tag: &str,
    per_page: u32,
) -> Result<ToolOutput> {
    let release_path = format!("repos/{owner}/{repo}/releases/tags/{tag}");
    let release_response = github.get(&release_path, &[]).await.map_err(|e| match e {
        Error::NotFound(_) => Error::NotFound(format!("release tag {tag} in {owner}/{repo}")),
        other => other,
    })?;
    let release: Release = release_response.parse()?;

    let since = release
        .published_at
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let issues_path = format!("repos/{owner}/{repo}/issues");
    let query = [
        ("state", "closed".to_string()),
        ("sort", "updated".to_string()),
        ("direction", "desc".to_string()),
        ("since", since),
        ("per_page", per_page.to_string()),
    ];
    let issues_response = github.get(&issues_path, &query).await?;
    let items: Vec<IssueItem> = issues_response.parse()?;

    let mut changes = ReleaseChanges {
        owner: owner.to_string(),
        repo: repo.to_string(),
        tag: release.tag_name,
        published_at: release.published_at,
        total: 0,
        bug_fixes: Vec::new(),
        enhancements: Vec::new(),
        other: Vec::new(),
    };

    for item in items.into_iter().filter(IssueItem::is_merged_pr) {
        let labels: Vec<String> = item.labels.into_iter().map(|l| l.name).collect();
        let summary = PullRequestSummary {
            number: item.number,
            url: item.html_url,
            title: item.title,
            labels,
        };

        match categorize(&summary.title, &summary.labels) {
            PrCategory::BugFix => changes.bug_fixes.push(summary),
            PrCategory::Enhancement => changes.enhancements.push(summary),
            PrCategory::Other => changes.other.push(summary),
        }
        changes.total += 1;
    }

    debug!(
        "{}/{} {}: {} PRs ({} fixes, {} enhancements)",
        owner,
        repo,
        tag,
        changes.total,
        changes.bug_fixes.len(),
        changes.enhancements.len()
    );

    Ok(ToolOutput {
        result: ToolResult::GetReleasePrs(changes),
        rate_limit: issues_response.rate_limit,
        github_calls: 2,
    })
}
