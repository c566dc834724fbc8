//! Intent classification — which tool, if any, a question asks for.
//!
//! [`LlmClassifier`] asks the model for exactly one tool name and falls back
//! to [`KeywordClassifier`] when the model is unavailable or answers off-script.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::tools::ToolName;
use crate::Result;

use super::extract::{is_manifest_path, is_repository_token, is_url, tokens};
use super::llm::LlmClient;
use super::message::Message;

const RELEASE_PR_WORDS: [&str; 19] = [
    "bug", "bugs", "bugfix", "bugfixes", "fix", "fixes", "fixed", "enhancement",
    "enhancements", "feature", "features", "pr", "prs", "pull", "changes", "changed",
    "changelog", "summary", "summarize",
];

const DEPENDENCY_WORDS: [&str; 6] = [
    "dependency", "dependencies", "deps", "manifest", "file", "contents",
];

const LATEST_RELEASE_WORDS: [&str; 7] = [
    "latest", "release", "releases", "version", "versions", "newest", "current",
];

/// How a classification was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Model,
    /// The model was asked but its answer could not be used
    KeywordFallback,
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// `None` when no tool matches
    pub tool: Option<ToolName>,
    pub method: ClassificationMethod,
}

impl Classification {
    /// Language-model requests spent on this classification
    pub fn llm_calls(&self) -> u32 {
        match self.method {
            ClassificationMethod::Model | ClassificationMethod::KeywordFallback => 1,
            ClassificationMethod::Keyword => 0,
        }
    }
}

/// Maps a question to one of the registered tools, or none.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> Result<Classification>;
}

/// Local keyword matching
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Pick a tool by keywords. Release-PR intent wins over file intent,
    /// which wins over a plain latest-release question.
    ///
    /// Repository names and URLs are not part of the intent: the words in
    /// `actions/dependency-review-action` say nothing about the question.
    pub fn match_tool(&self, query: &str) -> Option<ToolName> {
        let intent: Vec<&str> = tokens(query)
            .filter(|t| !is_repository_token(t) && !is_url(t))
            .collect();
        let lower = intent.join(" ").to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has_any = |vocab: &[&str]| words.iter().any(|w| vocab.iter().any(|v| v == w));

        if has_any(&RELEASE_PR_WORDS[..]) || lower.contains("pull request") {
            Some(ToolName::GetReleasePrs)
        } else if has_any(&DEPENDENCY_WORDS[..]) || intent.iter().any(|t| is_manifest_path(t)) {
            Some(ToolName::GetDependencyFile)
        } else if has_any(&LATEST_RELEASE_WORDS[..]) {
            Some(ToolName::CheckLatestRelease)
        } else {
            None
        }
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, query: &str) -> Result<Classification> {
        Ok(Classification {
            tool: self.match_tool(query),
            method: ClassificationMethod::Keyword,
        })
    }
}

/// Model-backed classifier with a constrained single-word reply
pub struct LlmClassifier {
    llm: Arc<dyn LlmClient>,
    fallback: KeywordClassifier,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            fallback: KeywordClassifier::new(),
        }
    }

    /// Classification instruction listing each tool and the allowed replies
    pub fn instruction() -> String {
        let tools: Vec<String> = ToolName::ALL
            .iter()
            .map(|t| format!("- {}: {} Parameters: {}", t.as_str(), t.description(), t.parameters()))
            .collect();
        let allowed: Vec<&str> = ToolName::ALL
            .iter()
            .map(|t| t.as_str())
            .chain(std::iter::once("none"))
            .collect();

        format!(
            "You route questions for a GitHub release assistant. The available tools are:\n{}\n\n\
             Reply with the tool that answers the user's question. Respond with exactly one of: {}. \
             Reply `none` for anything else, including coding help or general knowledge. \
             Output the single word only.",
            tools.join("\n"),
            allowed.join(", ")
        )
    }

    /// `Some(None)` for an explicit "none", `None` when the reply is off-script
    pub fn parse_reply(reply: &str) -> Option<Option<ToolName>> {
        let word = reply
            .split_whitespace()
            .next()?
            .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .to_lowercase();

        if word == "none" {
            return Some(None);
        }
        ToolName::parse(&word).map(Some)
    }

    fn fallback(&self, query: &str) -> Classification {
        Classification {
            tool: self.fallback.match_tool(query),
            method: ClassificationMethod::KeywordFallback,
        }
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, query: &str) -> Result<Classification> {
        let messages = vec![Message::system(Self::instruction()), Message::user(query)];

        match self.llm.chat(&messages).await {
            Ok(response) => match Self::parse_reply(response.text_or_empty()) {
                Some(tool) => {
                    debug!("Model classified query as {:?}", tool);
                    Ok(Classification {
                        tool,
                        method: ClassificationMethod::Model,
                    })
                }
                None => {
                    warn!(
                        "Unusable classifier reply {:?}, falling back to keywords",
                        response.text_or_empty()
                    );
                    Ok(self.fallback(query))
                }
            },
            Err(e) => {
                warn!("Classifier model unavailable ({}), falling back to keywords", e);
                Ok(self.fallback(query))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::{FakeLlmClient, LlmResponse};
    use crate::error::Error;

    #[test]
    fn test_keyword_latest_release() {
        let c = KeywordClassifier::new();
        assert_eq!(
            c.match_tool("What's the latest version of hashicorp/vault?"),
            Some(ToolName::CheckLatestRelease)
        );
        assert_eq!(
            c.match_tool("newest release of kubernetes/kubernetes"),
            Some(ToolName::CheckLatestRelease)
        );
    }

    #[test]
    fn test_keyword_dependency_file() {
        let c = KeywordClassifier::new();
        assert_eq!(
            c.match_tool("Show me package.json for grafana/grafana"),
            Some(ToolName::GetDependencyFile)
        );
        assert_eq!(
            c.match_tool("go.mod of hashicorp/vault"),
            Some(ToolName::GetDependencyFile)
        );
    }

    #[test]
    fn test_keyword_release_prs() {
        let c = KeywordClassifier::new();
        assert_eq!(
            c.match_tool("bug fixes in argoproj/argo-cd v2.9.0"),
            Some(ToolName::GetReleasePrs)
        );
        assert_eq!(
            c.match_tool("which pull requests went into release v1.2.0 of a/b"),
            Some(ToolName::GetReleasePrs)
        );
    }

    #[test]
    fn test_keyword_no_match() {
        let c = KeywordClassifier::new();
        assert_eq!(c.match_tool("Tell me a joke"), None);
        assert_eq!(c.match_tool("How do I write a loop in hashicorp/vault"), None);
        // "prefix" must not trigger "fix"
        assert_eq!(c.match_tool("what prefix does hashicorp/vault use"), None);
    }

    #[test]
    fn test_keyword_ignores_repository_names() {
        let c = KeywordClassifier::new();
        for query in [
            "latest release of actions/dependency-review-action?",
            "latest release of Codium-ai/pr-agent",
            "What's the newest version of sindresorhus/file-type",
            "latest release of conventional-changelog/standard-version",
            "latest release of https://github.com/Codium-ai/pr-agent",
        ] {
            assert_eq!(c.match_tool(query), Some(ToolName::CheckLatestRelease), "{query}");
        }
        assert_eq!(
            c.match_tool("show ui/package.json for sindresorhus/file-type"),
            Some(ToolName::GetDependencyFile)
        );
        assert_eq!(
            c.match_tool("bug fixes in actions/dependency-review-action v4.0.0"),
            Some(ToolName::GetReleasePrs)
        );
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(
            LlmClassifier::parse_reply("check_latest_release"),
            Some(Some(ToolName::CheckLatestRelease))
        );
        assert_eq!(
            LlmClassifier::parse_reply("`get_release_prs`\n"),
            Some(Some(ToolName::GetReleasePrs))
        );
        assert_eq!(LlmClassifier::parse_reply("None."), Some(None));
        assert_eq!(LlmClassifier::parse_reply("I think you want a release"), None);
        assert_eq!(LlmClassifier::parse_reply(""), None);
    }

    #[test]
    fn test_instruction_lists_allowed_replies() {
        let instruction = LlmClassifier::instruction();
        assert!(instruction.contains(
            "exactly one of: check_latest_release, get_dependency_file, get_release_prs, none"
        ));
        for tool in ToolName::ALL {
            assert!(instruction.contains(&tool.parameters().to_string()), "{tool}");
        }
    }

    #[tokio::test]
    async fn test_llm_classifier_uses_model_reply() {
        let llm = Arc::new(FakeLlmClient::new(vec!["get_dependency_file"]));
        let classifier = LlmClassifier::new(llm.clone());

        let result = classifier.classify("what does grafana/grafana depend on").await.unwrap();
        assert_eq!(result.tool, Some(ToolName::GetDependencyFile));
        assert_eq!(result.method, ClassificationMethod::Model);
        assert_eq!(result.llm_calls(), 1);
        assert_eq!(llm.requests()[0][1].content, "what does grafana/grafana depend on");
    }

    #[tokio::test]
    async fn test_llm_classifier_model_says_none() {
        let llm = Arc::new(FakeLlmClient::new(vec!["none"]));
        let classifier = LlmClassifier::new(llm);
        let result = classifier.classify("latest release of a/b").await.unwrap();
        assert_eq!(result.tool, None);
    }

    #[tokio::test]
    async fn test_llm_classifier_falls_back_when_unavailable() {
        let llm = Arc::new(FakeLlmClient::scripted(vec![Err(Error::Timeout("slow".to_string()))]));
        let classifier = LlmClassifier::new(llm);

        let result = classifier
            .classify("What's the latest version of hashicorp/vault?")
            .await
            .unwrap();
        assert_eq!(result.tool, Some(ToolName::CheckLatestRelease));
        assert_eq!(result.method, ClassificationMethod::KeywordFallback);
    }

    #[tokio::test]
    async fn test_llm_classifier_falls_back_on_off_script_reply() {
        let llm = Arc::new(FakeLlmClient::scripted(vec![Ok(LlmResponse::text(
            "Sure! Let me check that for you.",
        ))]));
        let classifier = LlmClassifier::new(llm);

        let result = classifier.classify("bug fixes in argoproj/argo-cd v2.9.0").await.unwrap();
        assert_eq!(result.tool, Some(ToolName::GetReleasePrs));
        assert_eq!(result.method, ClassificationMethod::KeywordFallback);
    }
}
