//! Tool registry - dispatches a [`ToolCall`] to its GitHub lookup

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::github::{ApiResponse, GitHubApi, RateLimit, RateLimitStatus};
use crate::Result;

use super::{check_latest_release, get_dependency_file, get_release_prs};
use super::{ToolCall, ToolResult};

/// Limits applied by the tools
#[derive(Debug, Clone, Copy)]
pub struct ToolOptions {
    pub max_file_lines: usize,
    pub max_release_prs: u32,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            max_file_lines: 50,
            max_release_prs: 50,
        }
    }
}

impl From<&Config> for ToolOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_file_lines: config.max_file_lines,
            max_release_prs: config.max_release_prs,
        }
    }
}

/// A tool result plus the quota state observed while producing it
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub result: ToolResult,
    pub rate_limit: RateLimit,
    /// GitHub requests spent on this invocation
    pub github_calls: u32,
}

/// A failed invocation and what it spent before failing
#[derive(Debug)]
pub struct ToolFailure {
    pub error: Error,
    /// GitHub requests issued, including the one that failed
    pub github_calls: u32,
    /// Last quota observed, including one reported with a rate-limit refusal
    pub rate_limit: Option<RateLimit>,
}

impl From<Error> for ToolFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            github_calls: 0,
            rate_limit: None,
        }
    }
}

/// Counts the requests of one invocation and keeps the last quota seen.
struct MeteredGitHub<'a> {
    inner: &'a dyn GitHubApi,
    calls: AtomicU32,
    rate_limit: Mutex<Option<RateLimit>>,
}

impl<'a> MeteredGitHub<'a> {
    fn new(inner: &'a dyn GitHubApi) -> Self {
        Self {
            inner,
            calls: AtomicU32::new(0),
            rate_limit: Mutex::new(None),
        }
    }

    fn observe(&self, quota: &RateLimit) {
        if !quota.is_known() {
            return;
        }
        if let Ok(mut last) = self.rate_limit.lock() {
            *last = Some(quota.clone());
        }
    }

    fn into_failure(self, error: Error) -> ToolFailure {
        ToolFailure {
            error,
            github_calls: self.calls.into_inner(),
            rate_limit: self.rate_limit.into_inner().ok().flatten(),
        }
    }
}

#[async_trait]
impl<'a> GitHubApi for MeteredGitHub<'a> {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let response = self.inner.get(path, query).await;
        match &response {
            Ok(ok) => self.observe(&ok.rate_limit),
            Err(Error::RateLimited { quota, .. }) => self.observe(quota),
            Err(_) => {}
        }
        response
    }

    async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        self.inner.rate_limit_status().await
    }
}

/// Registry of the fixed tool set, bound to one GitHub client
#[derive(Clone)]
pub struct ToolRegistry {
    github: Arc<dyn GitHubApi>,
    options: ToolOptions,
}

impl ToolRegistry {
    pub fn new(github: Arc<dyn GitHubApi>, options: ToolOptions) -> Self {
        Self { github, options }
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolOutput, ToolFailure> {
        debug!("Executing tool: {}", call.tool_name());
        let metered = MeteredGitHub::new(self.github.as_ref());
        let github: &dyn GitHubApi = &metered;

        let outcome = match call {
            ToolCall::CheckLatestRelease { owner, repo } => {
                check_latest_release(github, owner, repo).await
            }
            ToolCall::GetDependencyFile { owner, repo, path } => {
                get_dependency_file(github, owner, repo, path, self.options.max_file_lines).await
            }
            ToolCall::GetReleasePrs { owner, repo, tag } => {
                get_release_prs(github, owner, repo, tag, self.options.max_release_prs).await
            }
        };

        outcome.map_err(|error| metered.into_failure(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{FakeGitHub, FakeReply};
    use chrono::{TimeZone, Utc};
    use crate::tools::ToolName;
    use serde_json::json;

    #[tokio::test]
    async fn test_registry_dispatches_by_variant() {
        let gh = Arc::new(
            FakeGitHub::new().with_json(
                "repos/hashicorp/vault/releases/latest",
                json!({"tag_name": "v1.15.2"}),
            ),
        );
        let registry = ToolRegistry::new(gh.clone(), ToolOptions::default());

        let call = ToolCall::CheckLatestRelease {
            owner: "hashicorp".to_string(),
            repo: "vault".to_string(),
        };
        let output = tokio_test::assert_ok!(registry.execute(&call).await);

        assert_eq!(output.result.tool_name(), ToolName::CheckLatestRelease);
        assert_eq!(gh.calls(), vec!["repos/hashicorp/vault/releases/latest"]);
    }

    #[tokio::test]
    async fn test_registry_propagates_failures() {
        let registry = ToolRegistry::new(Arc::new(FakeGitHub::new()), ToolOptions::default());
        let call = ToolCall::GetDependencyFile {
            owner: "o".to_string(),
            repo: "r".to_string(),
            path: "go.mod".to_string(),
        };
        let failure = tokio_test::assert_err!(registry.execute(&call).await);
        assert!(matches!(failure.error, Error::NotFound(_)));
        assert_eq!(failure.github_calls, 1);
        assert_eq!(failure.rate_limit, None);
    }

    #[tokio::test]
    async fn test_failure_reports_calls_and_quota() {
        let exhausted = RateLimit {
            limit: Some(60),
            remaining: Some(0),
            reset: Utc.timestamp_opt(1_700_000_000, 0).single(),
        };
        let gh = FakeGitHub::new()
            .with_json(
                "repos/argoproj/argo-cd/releases/tags/v2.9.0",
                json!({"tag_name": "v2.9.0", "published_at": "2023-11-06T00:00:00Z"}),
            )
            .with(
                "repos/argoproj/argo-cd/issues",
                FakeReply::StatusWithQuota(403, exhausted.clone()),
            );
        let registry = ToolRegistry::new(Arc::new(gh), ToolOptions::default());
        let call = ToolCall::GetReleasePrs {
            owner: "argoproj".to_string(),
            repo: "argo-cd".to_string(),
            tag: "v2.9.0".to_string(),
        };

        let failure = tokio_test::assert_err!(registry.execute(&call).await);
        assert!(matches!(failure.error, Error::RateLimited { .. }));
        assert_eq!(failure.github_calls, 2);
        assert_eq!(failure.rate_limit, Some(exhausted));
    }

    #[tokio::test]
    async fn test_failure_keeps_quota_of_earlier_success() {
        let gh = FakeGitHub::new().with_json(
            "repos/argoproj/argo-cd/releases/tags/v2.9.0",
            json!({"tag_name": "v2.9.0", "published_at": "2023-11-06T00:00:00Z"}),
        );
        let registry = ToolRegistry::new(Arc::new(gh), ToolOptions::default());
        let call = ToolCall::GetReleasePrs {
            owner: "argoproj".to_string(),
            repo: "argo-cd".to_string(),
            tag: "v2.9.0".to_string(),
        };

        let failure = tokio_test::assert_err!(registry.execute(&call).await);
        assert_eq!(failure.github_calls, 2);
        assert_eq!(failure.rate_limit, Some(FakeGitHub::quota()));
    }

    #[test]
    fn test_options_from_config() {
        let config = Config {
            max_file_lines: 7,
            ..Config::default()
        };
        assert_eq!(ToolOptions::from(&config).max_file_lines, 7);
    }
}
