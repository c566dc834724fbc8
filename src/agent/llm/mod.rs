//! LLM client abstraction layer.
//!
//! This module provides:
//! - [`LlmClient`] trait for swappable LLM providers
//! - [`GeminiClient`], the generative-language API implementation
//!
//! The agent only needs single-turn text generation: a system instruction
//! plus one user prompt in, generated text out.

mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use types::*;

pub mod gemini;

pub use gemini::GeminiClient;

use super::message::Message;

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text content of the response.
    pub content: Option<String>,

    /// Reason the response finished.
    pub finish_reason: String,

    /// Token usage statistics.
    pub usage: Usage,
}

impl LlmResponse {
    /// Create a simple text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: "STOP".to_string(),
            usage: Usage::default(),
        }
    }

    /// Generated text, empty when the model returned none.
    pub fn text_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// LLM client trait — swappable provider abstraction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send messages and get response.
    async fn chat(&self, messages: &[Message]) -> Result<LlmResponse>;

    /// Model this client talks to.
    fn model(&self) -> &str;
}

/// Fake LLM client for testing.
#[cfg(test)]
pub struct FakeLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<LlmResponse>>>,
    requests: std::sync::Mutex<Vec<Vec<Message>>>,
}

#[cfg(test)]
impl FakeLlmClient {
    /// Create with predefined text responses.
    pub fn new(responses: Vec<&str>) -> Self {
        Self::scripted(responses.into_iter().map(|s| Ok(LlmResponse::text(s))).collect())
    }

    /// Create with a mix of replies and failures, consumed in order.
    pub fn scripted(responses: Vec<Result<LlmResponse>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Messages of every request received so far.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, messages: &[Message]) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .unwrap_or_else(|| Err(crate::error::Error::Other("No more fake responses".to_string())))
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_fake_llm_client() {
        let client = FakeLlmClient::new(vec!["Hello!", "World!"]);

        let resp1 = client.chat(&[Message::user("a")]).await.unwrap();
        assert_eq!(resp1.content.as_deref(), Some("Hello!"));

        let resp2 = client.chat(&[]).await.unwrap();
        assert_eq!(resp2.text_or_empty(), "World!");

        assert!(client.chat(&[]).await.is_err());
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.requests()[0][0].content, "a");
    }

    #[tokio::test]
    async fn test_fake_llm_client_failures() {
        let client = FakeLlmClient::scripted(vec![Err(Error::Timeout("slow".to_string()))]);
        let err = client.chat(&[]).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
