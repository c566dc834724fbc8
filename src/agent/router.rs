//! Agent router - one question, one tool call, one answer

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ClassifierMode, Config};
use crate::error::{Error, FailureKind};
use crate::github::GitHubClient;
use crate::tools::{ToolCall, ToolOptions, ToolRegistry, ToolResult};
use crate::Result;

use super::classifier::{IntentClassifier, KeywordClassifier, LlmClassifier};
use super::extract::{ArgumentExtractor, PatternExtractor};
use super::grounding::ungrounded_identifiers;
use super::llm::{GeminiClient, LlmClient};
use super::message::{describe_failure, Answer, TurnUsage};
use super::summarize::{LlmSummarizer, Summarizer};

/// Where a turn is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Classifying,
    ToolSelected,
    Rejected,
    Executing,
    Synthesizing,
    FailureReported,
    Done,
}

/// Bookkeeping for a single turn
struct Turn {
    states: Vec<TurnState>,
    usage: TurnUsage,
    tool_call: Option<ToolCall>,
}

impl Turn {
    fn new() -> Self {
        Self {
            states: vec![TurnState::Idle],
            usage: TurnUsage::default(),
            tool_call: None,
        }
    }

    fn enter(&mut self, state: TurnState) {
        debug!("Turn state: {:?}", state);
        self.states.push(state);
    }

    fn finish(
        mut self,
        text: String,
        raw_tool_result: Option<ToolResult>,
        failure: Option<FailureKind>,
    ) -> Answer {
        self.enter(TurnState::Done);
        Answer {
            text,
            raw_tool_result,
            tool_call: self.tool_call,
            failure,
            usage: self.usage,
            states: self.states,
        }
    }

    /// Convert a failure into a user-facing answer. Cancellation is never answered.
    fn fail(self, err: &Error, raw_tool_result: Option<ToolResult>) -> Result<Answer> {
        if matches!(err, Error::Cancelled) {
            return Err(Error::Cancelled);
        }
        info!("Turn failed with {}: {}", err.kind(), err);

        let mut text = describe_failure(err);
        if raw_tool_result.is_some() {
            text.push_str("\n\nThe raw tool output is still available.");
        }
        Ok(self.finish(text, raw_tool_result, Some(err.kind())))
    }
}

/// Race a stage against the cancellation token.
async fn until_cancelled<T, E: From<Error>>(
    cancel: &CancellationToken,
    stage: impl Future<Output = std::result::Result<T, E>>,
) -> std::result::Result<T, E> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled.into()),
        result = stage => result,
    }
}

/// Routes a question to exactly one tool and synthesizes the answer.
///
/// Each session owns its router; nothing mutable is shared between turns.
pub struct AgentRouter {
    classifier: Arc<dyn IntentClassifier>,
    extractor: Arc<dyn ArgumentExtractor>,
    registry: ToolRegistry,
    summarizer: Arc<dyn Summarizer>,
}

impl AgentRouter {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        extractor: Arc<dyn ArgumentExtractor>,
        registry: ToolRegistry,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            classifier,
            extractor,
            registry,
            summarizer,
        }
    }

    /// Wire up the live clients from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let github = Arc::new(GitHubClient::new(config)?);
        let llm: Arc<dyn LlmClient> = Arc::new(GeminiClient::new(config)?);

        let classifier: Arc<dyn IntentClassifier> = match config.classifier {
            ClassifierMode::Model => Arc::new(LlmClassifier::new(llm.clone())),
            ClassifierMode::Keyword => Arc::new(KeywordClassifier::new()),
        };
        info!("Router using model {} with {:?} classification", llm.model(), config.classifier);

        Ok(Self::new(
            classifier,
            Arc::new(PatternExtractor::new()?),
            ToolRegistry::new(github, ToolOptions::from(config)),
            Arc::new(LlmSummarizer::new(llm)),
        ))
    }

    /// Answer one question.
    ///
    /// Every failure becomes an [`Answer`] describing it, except cancellation,
    /// which returns [`Error::Cancelled`].
    pub async fn answer(&self, query: &str, cancel: &CancellationToken) -> Result<Answer> {
        let span = info_span!("turn", id = %Uuid::new_v4());
        self.run_turn(query.trim(), cancel).instrument(span).await
    }

    async fn run_turn(&self, query: &str, cancel: &CancellationToken) -> Result<Answer> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        info!("Answering: {}", query);

        let mut turn = Turn::new();
        turn.enter(TurnState::Classifying);

        if query.is_empty() {
            turn.enter(TurnState::Rejected);
            return turn.fail(&Error::UnroutableQuery("the question is empty".to_string()), None);
        }
        if !self.extractor.names_repository(query) {
            turn.enter(TurnState::Rejected);
            return turn.fail(
                &Error::UnroutableQuery("the question does not name a repository as `owner/repo`".to_string()),
                None,
            );
        }

        let classification = match until_cancelled(cancel, self.classifier.classify(query)).await {
            Ok(classification) => classification,
            Err(e) => {
                turn.enter(TurnState::Rejected);
                return turn.fail(&e, None);
            }
        };
        turn.usage.llm_calls += classification.llm_calls();

        let Some(tool) = classification.tool else {
            turn.enter(TurnState::Rejected);
            return turn.fail(
                &Error::UnroutableQuery("no available tool matches the question".to_string()),
                None,
            );
        };

        let call = match self.extractor.extract(tool, query) {
            Ok(call) => call,
            Err(e) => {
                turn.enter(TurnState::Rejected);
                return turn.fail(&e, None);
            }
        };
        info!("Selected {} via {:?}", tool, classification.method);
        turn.tool_call = Some(call.clone());
        turn.enter(TurnState::ToolSelected);

        turn.enter(TurnState::Executing);
        let output = match until_cancelled(cancel, self.registry.execute(&call)).await {
            Ok(output) => output,
            Err(failure) => {
                turn.usage.github_calls += failure.github_calls;
                turn.usage.rate_limit = failure.rate_limit;
                turn.enter(TurnState::FailureReported);
                return turn.fail(&failure.error, None);
            }
        };
        turn.usage.github_calls += output.github_calls;
        if output.rate_limit.is_known() {
            turn.usage.rate_limit = Some(output.rate_limit.clone());
        }

        turn.enter(TurnState::Synthesizing);
        turn.usage.llm_calls += 1;
        match until_cancelled(cancel, self.summarizer.summarize(query, &output.result)).await {
            Ok(text) => {
                let ungrounded = ungrounded_identifiers(&text, &output.result);
                if !ungrounded.is_empty() {
                    warn!(
                        "Answer mentions identifiers absent from the tool result: {}",
                        ungrounded.join(", ")
                    );
                }
                Ok(turn.finish(text, Some(output.result), None))
            }
            Err(e) => {
                turn.enter(TurnState::FailureReported);
                turn.fail(&e, Some(output.result))
            }
        }
    }
}
