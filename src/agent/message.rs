//! Message and answer types for agent turns

use serde::{Deserialize, Serialize};

use crate::error::{Error, FailureKind};
use crate::github::RateLimit;
use crate::tools::{ToolCall, ToolResult};

use super::router::TurnState;

/// Message role in an LLM request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A message sent to the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Outbound calls spent on one turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnUsage {
    pub llm_calls: u32,
    pub github_calls: u32,
    /// Quota observed on the last GitHub response, if any
    pub rate_limit: Option<RateLimit>,
}

/// The final text (plus raw data) shown to the user for one turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub raw_tool_result: Option<ToolResult>,
    pub tool_call: Option<ToolCall>,
    pub failure: Option<FailureKind>,
    pub usage: TurnUsage,
    /// States visited by the router, `Idle` through `Done`
    pub states: Vec<TurnState>,
}

impl Answer {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

const CAPABILITIES: &str = "I can help with:\n\
- the latest release of a repository (e.g. `hashicorp/vault`)\n\
- a dependency file from a repository (e.g. `package.json` for `grafana/grafana`)\n\
- the bug fixes and enhancements in a release tag (e.g. `argoproj/argo-cd v2.9.0`)";

/// Plain-language description of a failure for the user
pub fn describe_failure(err: &Error) -> String {
    match err {
        Error::Auth(detail) => format!(
            "Authentication failed: {detail}\nCheck that GEMINI_API_KEY and GITHUB_TOKEN are set and valid."
        ),
        Error::NotFound(detail) => format!("Not found: I couldn't find {detail}."),
        Error::RateLimited { message, quota } => match quota.reset {
            Some(reset) => format!(
                "Rate limited: {message}. The quota resets at {} UTC; please try again after that.",
                reset.format("%Y-%m-%d %H:%M:%S")
            ),
            None => format!("Rate limited: {message}. Please try again later."),
        },
        Error::Upstream { message, .. } => {
            format!("The upstream service returned an error: {message}")
        }
        Error::Decode(detail) => format!("I received a response I couldn't read: {detail}"),
        Error::Json(e) => format!("I received a response I couldn't read: {e}"),
        Error::Timeout(detail) => {
            format!("The request timed out before completing ({detail}). Please try again.")
        }
        Error::UnroutableQuery(detail) => {
            format!("I can't answer that ({detail}).\n\n{CAPABILITIES}")
        }
        Error::Cancelled => "The request was cancelled.".to_string(),
        Error::Config(_) | Error::Io(_) | Error::Other(_) => {
            format!("Something went wrong while answering: {err}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_describe_not_found() {
        let text = describe_failure(&Error::NotFound("repository a/b".to_string()));
        assert!(text.to_lowercase().contains("not found"));
        assert!(text.contains("a/b"));
    }

    #[test]
    fn test_describe_rate_limited_with_reset() {
        let reset = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single();
        let text = describe_failure(&Error::RateLimited {
            message: "GitHub quota exhausted".to_string(),
            quota: RateLimit {
                limit: Some(60),
                remaining: Some(0),
                reset,
            },
        });
        assert!(text.contains("2024-05-01 12:30:00"));
    }

    #[test]
    fn test_describe_unroutable_lists_capabilities() {
        let text = describe_failure(&Error::UnroutableQuery("no matching tool".to_string()));
        assert!(text.contains("hashicorp/vault"));
        assert!(text.contains("argoproj/argo-cd v2.9.0"));
    }

    #[test]
    fn test_describe_timeout() {
        let text = describe_failure(&Error::Timeout("30s elapsed".to_string()));
        assert!(text.contains("timed out"));
    }
}
