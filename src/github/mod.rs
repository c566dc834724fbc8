//! GitHub client — thin wrapper over the REST API.
//!
//! Every call is a single authenticated `GET`. Responses are returned as raw
//! JSON alongside the quota headers; non-2xx statuses are classified into
//! [`Error`] kinds by [`classify_status`].

pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::Error;
use crate::Result;

use types::RateLimitResponse;

/// Quota state read from `X-RateLimit-*` response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers.get(name)?.to_str().ok()?.trim().parse().ok()
        }

        Self {
            limit: header(headers, "x-ratelimit-limit"),
            remaining: header(headers, "x-ratelimit-remaining"),
            reset: header::<i64>(headers, "x-ratelimit-reset")
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    pub fn is_known(&self) -> bool {
        self.limit.is_some() || self.remaining.is_some()
    }
}

/// Snapshot from `GET /rate_limit`, used by the health dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub used: u32,
    pub reset: Option<DateTime<Utc>>,
    pub authenticated: bool,
}

/// A successful response: parsed JSON body plus quota headers.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Value,
    pub rate_limit: RateLimit,
}

impl ApiResponse {
    /// Deserialize the body into a typed container
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.body)
            .map_err(|e| Error::Decode(format!("unexpected GitHub response shape: {e}")))
    }
}

/// GitHub API surface consumed by the tools.
///
/// `path` is relative to the API root, e.g. `repos/hashicorp/vault/releases/latest`.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse>;

    async fn rate_limit_status(&self) -> Result<RateLimitStatus>;
}

/// Turn a non-2xx GitHub status into an error kind.
pub fn classify_status(status: u16, rate_limit: &RateLimit, body: &str, path: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());

    let rate_limited = status == 429
        || (status == 403
            && (rate_limit.is_exhausted() || message.to_lowercase().contains("rate limit")));

    match status {
        404 => Error::NotFound(path.to_string()),
        _ if rate_limited => Error::RateLimited {
            message: format!("GitHub quota exhausted ({message})"),
            quota: rate_limit.clone(),
        },
        401 | 403 => Error::Auth(format!(
            "GitHub rejected the credentials ({status}): {message}. Check GITHUB_TOKEN."
        )),
        _ => Error::upstream(Some(status), format!("GitHub returned {status}: {message}")),
    }
}

/// GitHub REST client
#[derive(Clone)]
pub struct GitHubClient {
    base_url: Url,
    token: Option<String>,
    client: Client,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.github_api_url)
            .map_err(|e| Error::Config(format!("Invalid github_api_url: {e}")))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            token: config.github_token.clone().filter(|t| !t.trim().is_empty()),
            client,
        })
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("github_api_url cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("relwatch/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));
        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse> {
        let url = self.build_url(path)?;
        debug!("GitHub GET {}", url);

        let response = self
            .client
            .get(url)
            .headers(self.headers())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let rate_limit = RateLimit::from_headers(response.headers());
        debug!("GitHub {} (remaining quota: {:?})", status, rate_limit.remaining);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &rate_limit, &body, path));
        }

        let text = response.text().await?;
        let body = serde_json::from_str(&text)
            .map_err(|e| Error::Decode(format!("GitHub returned malformed JSON: {e}")))?;

        Ok(ApiResponse { body, rate_limit })
    }

    async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        let response = self.get("rate_limit", &[]).await?;
        let parsed: RateLimitResponse = response.parse()?;
        let core = parsed.resources.core;

        Ok(RateLimitStatus {
            limit: core.limit,
            remaining: core.remaining,
            used: core.used,
            reset: Utc.timestamp_opt(core.reset, 0).single(),
            authenticated: self.token.is_some(),
        })
    }
}

/// Scripted reply for [`FakeGitHub`].
#[cfg(test)]
#[derive(Debug, Clone)]
pub enum FakeReply {
    Json(Value),
    Status(u16),
    StatusWithQuota(u16, RateLimit),
}

/// Fake GitHub API for testing. Unscripted paths answer 404.
#[cfg(test)]
pub struct FakeGitHub {
    replies: std::collections::HashMap<String, FakeReply>,
    calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl FakeGitHub {
    pub fn new() -> Self {
        Self {
            replies: std::collections::HashMap::new(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, path: &str, reply: FakeReply) -> Self {
        self.replies.insert(path.to_string(), reply);
        self
    }

    pub fn with_json(self, path: &str, body: Value) -> Self {
        self.with(path, FakeReply::Json(body))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn quota() -> RateLimit {
        RateLimit {
            limit: Some(5000),
            remaining: Some(4990),
            reset: Utc.timestamp_opt(1_700_000_000, 0).single(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn get(&self, path: &str, _query: &[(&str, String)]) -> Result<ApiResponse> {
        self.calls.lock().unwrap().push(path.to_string());

        match self.replies.get(path) {
            Some(FakeReply::Json(body)) => Ok(ApiResponse {
                body: body.clone(),
                rate_limit: Self::quota(),
            }),
            Some(FakeReply::Status(status)) => {
                Err(classify_status(*status, &Self::quota(), "", path))
            }
            Some(FakeReply::StatusWithQuota(status, quota)) => {
                Err(classify_status(*status, quota, "", path))
            }
            None => Err(classify_status(404, &Self::quota(), "", path)),
        }
    }

    async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        let quota = Self::quota();
        Ok(RateLimitStatus {
            limit: quota.limit.unwrap_or_default(),
            remaining: quota.remaining.unwrap_or_default(),
            used: 10,
            reset: quota.reset,
            authenticated: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));

        let rl = RateLimit::from_headers(&headers);
        assert_eq!(rl.limit, Some(60));
        assert!(rl.is_exhausted());
        assert_eq!(rl.reset.map(|r| r.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_rate_limit_missing_headers() {
        let rl = RateLimit::from_headers(&HeaderMap::new());
        assert!(!rl.is_known());
        assert!(!rl.is_exhausted());
    }

    #[test]
    fn test_classify_status() {
        let quota = RateLimit::default();
        assert!(matches!(classify_status(404, &quota, "", "p"), Error::NotFound(_)));
        assert!(matches!(classify_status(401, &quota, "", "p"), Error::Auth(_)));
        assert!(matches!(classify_status(403, &quota, "{\"message\":\"Forbidden\"}", "p"), Error::Auth(_)));
        assert!(matches!(classify_status(500, &quota, "", "p"), Error::Upstream { status: Some(500), .. }));
        assert!(matches!(classify_status(429, &quota, "", "p"), Error::RateLimited { .. }));
    }

    #[test]
    fn test_classify_exhausted_quota_as_rate_limited() {
        let quota = RateLimit {
            limit: Some(60),
            remaining: Some(0),
            reset: Utc.timestamp_opt(1_700_000_000, 0).single(),
        };
        match classify_status(403, &quota, "", "repos/a/b") {
            Error::RateLimited { quota: reported, .. } => assert_eq!(reported, quota),
            other => panic!("expected RateLimited, got {other:?}"),
        }

        let body = r#"{"message":"API rate limit exceeded for 1.2.3.4."}"#;
        assert!(matches!(
            classify_status(403, &RateLimit::default(), body, "p"),
            Error::RateLimited { .. }
        ));
    }

    #[test]
    fn test_build_url_encodes_segments() {
        let config = Config::default();
        let client = GitHubClient::new(&config).unwrap();
        let url = client.build_url("repos/grafana/grafana/contents/my dir/package.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/grafana/grafana/contents/my%20dir/package.json"
        );
    }

    #[test]
    fn test_token_sets_bearer_header() {
        let config = Config {
            github_token: Some("ghp_abc".to_string()),
            ..Config::default()
        };
        let client = GitHubClient::new(&config).unwrap();
        let headers = client.headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer ghp_abc");

        let anonymous = GitHubClient::new(&Config::default()).unwrap();
        assert!(anonymous.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_fake_github_unscripted_is_not_found() {
        let gh = FakeGitHub::new();
        let err = gh.get("repos/a/b/releases/latest", &[]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(gh.call_count(), 1);
    }
}
