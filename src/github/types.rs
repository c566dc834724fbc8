//! Wire types for the GitHub REST API responses we consume.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `GET /repos/{owner}/{repo}/releases/latest` and `/releases/tags/{tag}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
}

/// A single file from `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// An item of `GET /repos/{owner}/{repo}/issues`; pull requests carry `pull_request`.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub pull_request: Option<PullRequestRef>,
}

impl IssueItem {
    /// Whether this item is a pull request that was merged (not merely closed).
    pub fn is_merged_pr(&self) -> bool {
        self.pull_request
            .as_ref()
            .is_some_and(|pr| pr.merged_at.is_some())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

/// `GET /rate_limit`
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimitResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResource {
    pub limit: u32,
    pub remaining: u32,
    #[serde(default)]
    pub used: u32,
    /// Unix seconds
    pub reset: i64,
}
