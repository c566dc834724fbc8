//! Response synthesis — turn a tool result into a short answer.
//!
//! The prompt carries the tool result verbatim and tells the model to state
//! nothing that is not in it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Error;
use crate::tools::ToolResult;
use crate::Result;

use super::llm::LlmClient;
use super::message::Message;

pub const SUMMARY_INSTRUCTION: &str = "You are a Platform Engineering GitHub Update Checker. \
Your answer MUST be based EXCLUSIVELY on the `tool_output` JSON supplied with the question. \
Do not mention any version, tag, date, repository, file or pull request that does not appear in `tool_output`, \
and do not use outside knowledge. If the question asks for something `tool_output` does not contain, say it is not available. \
Write a clear, concise, professional report in Markdown. \
For file contents, reproduce the relevant lines in a code block. \
For release changes, list bug fixes and enhancements separately with their pull request numbers.";

/// Produces the final natural-language answer from a tool result.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, query: &str, result: &ToolResult) -> Result<String>;
}

/// Build the grounded summarization prompt
pub fn build_summary_messages(query: &str, result: &ToolResult) -> Vec<Message> {
    let prompt = format!(
        "Question: {query}\n\nTool: {}\n\ntool_output:\n```json\n{}\n```",
        result.tool_name(),
        result.to_json_pretty()
    );
    vec![Message::system(SUMMARY_INSTRUCTION), Message::user(prompt)]
}

/// Summarizer backed by the language model
pub struct LlmSummarizer {
    llm: Arc<dyn LlmClient>,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, query: &str, result: &ToolResult) -> Result<String> {
        let messages = build_summary_messages(query, result);
        let response = self.llm.chat(&messages).await?;

        let text = response.text_or_empty().trim();
        if text.is_empty() {
            return Err(Error::Decode(format!(
                "the model returned no text (finish reason: {})",
                response.finish_reason
            )));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::FakeLlmClient;
    use crate::tools::ReleaseInfo;

    fn release() -> ToolResult {
        ToolResult::CheckLatestRelease(ReleaseInfo {
            owner: "hashicorp".to_string(),
            repo: "vault".to_string(),
            tag: "v1.15.2".to_string(),
            name: None,
            published_at: None,
            published_date: Some("2023-11-06".to_string()),
            url: None,
            notes: String::new(),
            notes_snippet: String::new(),
            assets: vec![],
        })
    }

    #[test]
    fn test_prompt_embeds_tool_result_verbatim() {
        let result = release();
        let messages = build_summary_messages("latest vault?", &result);

        assert_eq!(messages[0].content, SUMMARY_INSTRUCTION);
        assert!(messages[1].content.contains("Question: latest vault?"));
        assert!(messages[1].content.contains(&result.to_json_pretty()));
        assert!(messages[1].content.contains("Tool: check_latest_release"));
    }

    #[test]
    fn test_instruction_forbids_fabrication() {
        assert!(SUMMARY_INSTRUCTION.contains("EXCLUSIVELY"));
        assert!(SUMMARY_INSTRUCTION.contains("do not use outside knowledge"));
    }

    #[tokio::test]
    async fn test_llm_summarizer() {
        let llm = Arc::new(FakeLlmClient::new(vec!["  Vault's latest release is v1.15.2.\n"]));
        let summarizer = LlmSummarizer::new(llm.clone());

        let text = summarizer.summarize("latest vault?", &release()).await.unwrap();
        assert_eq!(text, "Vault's latest release is v1.15.2.");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_summary_is_decode_error() {
        let llm = Arc::new(FakeLlmClient::new(vec![""]));
        let summarizer = LlmSummarizer::new(llm);
        let err = summarizer.summarize("q", &release()).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
