//! Gemini LLM client implementation (API key authentication).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::github::RateLimit;
use crate::Result;

use super::super::message::{Message, Role};
use super::{GeminiErrorEnvelope, GeminiResponse, LlmClient, LlmResponse, Usage};

/// Gemini API client using API key authentication.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client from configuration.
    ///
    /// Fails with [`Error::Auth`] when no API key is configured, so a missing
    /// credential surfaces at startup rather than as an empty answer.
    pub fn new(config: &Config) -> Result<Self> {
        if config.gemini_api_key.trim().is_empty() {
            return Err(Error::Auth("GEMINI_API_KEY is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key: config.gemini_api_key.clone(),
            model: config.model.clone(),
            base_url: config.gemini_api_url.trim_end_matches('/').to_string(),
            temperature: 0.2,
            client,
        })
    }

    fn build_url(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, messages: &[Message]) -> Value {
        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                json!({
                    "role": "user",
                    "parts": [{"text": m.content}]
                })
            })
            .collect();

        let mut request = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": 2048
            }
        });

        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        if !system.is_empty() {
            request["systemInstruction"] = json!({
                "parts": [{"text": system.join("\n\n")}]
            });
        }

        request
    }

    fn parse_response(&self, response: &GeminiResponse) -> Result<LlmResponse> {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
        {
            return Err(Error::upstream(None, format!("Gemini blocked the prompt: {reason}")));
        }

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| Error::Decode("No candidates in Gemini response".to_string()))?;

        let text: String = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();

        let usage = response
            .usage_metadata
            .as_ref()
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                completion_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content: Some(text).filter(|t| !t.is_empty()),
            finish_reason: candidate
                .finish_reason
                .clone()
                .unwrap_or_else(|| "STOP".to_string()),
            usage,
        })
    }
}

/// Turn a non-2xx Gemini status into an error kind
fn classify_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

    match status {
        401 | 403 => Error::Auth(format!("Gemini rejected the API key: {message}")),
        // An invalid key is reported as 400 INVALID_ARGUMENT
        400 if message.contains("API key") => {
            Error::Auth(format!("Gemini rejected the API key: {message}"))
        }
        429 => Error::RateLimited {
            message: format!("Gemini quota exhausted: {message}"),
            quota: RateLimit::default(),
        },
        _ => Error::upstream(Some(status), format!("Gemini API error ({status}): {message}")),
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat(&self, messages: &[Message]) -> Result<LlmResponse> {
        let request = self.build_request(messages);
        debug!("Gemini request to {} ({} messages)", self.model, messages.len());

        let response = self
            .client
            .post(self.build_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &error_text));
        }

        let text = response.text().await?;
        let gemini_response: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Decode(format!("Malformed Gemini response: {e}")))?;
        self.parse_response(&gemini_response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
