//! `check_latest_release` — most recent published release of a repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::github::types::Release;
use crate::github::GitHubApi;
use crate::Result;

use super::{ToolOutput, ToolResult};

const SNIPPET_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub owner: String,
    pub repo: String,
    pub tag: String,
    pub name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// `YYYY-MM-DD`
    pub published_date: Option<String>,
    pub url: Option<String>,
    pub notes: String,
    pub notes_snippet: String,
    pub assets: Vec<String>,
}

impl ReleaseInfo {
    fn from_release(owner: &str, repo: &str, release: Release) -> Self {
        let notes = release.body.unwrap_or_default();
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            tag: release.tag_name,
            name: release.name.filter(|n| !n.is_empty()),
            published_date: release.published_at.map(|d| d.format("%Y-%m-%d").to_string()),
            published_at: release.published_at,
            url: release.html_url,
            notes_snippet: snippet(&notes),
            notes,
            assets: release.assets.into_iter().map(|a| a.name).collect(),
        }
    }
}

/// First line-flattened characters of the release notes
fn snippet(notes: &str) -> String {
    let flat: String = notes.replace(['\r', '\n'], " ");
    let flat = flat.trim();
    if flat.chars().count() > SNIPPET_CHARS {
        format!("{}...", flat.chars().take(SNIPPET_CHARS).collect::<String>())
    } else {
        flat.to_string()
    }
}

pub async fn check_latest_release(
    github: &dyn GitHubApi,
    owner: &str,
    repo: &str,
) -> Result<ToolOutput> {
    let path = format!("repos/{owner}/{repo}/releases/latest");

    let response = github.get(&path, &[]).await.map_err(|e| match e {
        Error::NotFound(_) => Error::NotFound(format!(
            "repository {owner}/{repo} does not exist or has no published releases"
        )),
        other => other,
    })?;

    let release: Release = response.parse()?;
    debug!("Latest release of {}/{}: {}", owner, repo, release.tag_name);

    Ok(ToolOutput {
        result: ToolResult::CheckLatestRelease(ReleaseInfo::from_release(owner, repo, release)),
        rate_limit: response.rate_limit,
        github_calls: 1,
    })
}
