//! Agent module — question routing and answer synthesis.
//!
//! This module contains:
//! - Intent classification ([`IntentClassifier`]) and argument extraction ([`ArgumentExtractor`])
//! - LLM client trait and the Gemini implementation
//! - Answer synthesis ([`Summarizer`]) and the grounding audit
//! - [`AgentRouter`], which runs one turn end to end

pub mod classifier;
pub mod extract;
pub mod grounding;
pub mod llm;
mod message;
pub mod router;
pub mod summarize;

// Re-exports for convenience
pub use classifier::{Classification, ClassificationMethod, IntentClassifier, KeywordClassifier, LlmClassifier};
pub use extract::{ArgumentExtractor, PatternExtractor, RepoRef};
pub use llm::{GeminiClient, LlmClient, LlmResponse, Usage};
pub use message::{describe_failure, Answer, Message, Role, TurnUsage};
pub use router::{AgentRouter, TurnState};
pub use summarize::{LlmSummarizer, Summarizer};
