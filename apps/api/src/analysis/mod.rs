//! Resume analysis: the inference seam, its response shape, and feedback parsing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{strip_json_fences, Attachment, LlmClient, LlmError, LlmResponse};
use crate::models::Feedback;
use crate::storage::BlobStore;

pub mod prompts;

pub use prompts::prepare_instructions;

/// `{message: {content: string | [{text}, ...]}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub message: AnalysisMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMessage {
    pub content: MessageContent,
}

/// Providers answer either with a bare string or with a list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
}

impl AnalysisResponse {
    #[cfg(test)]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            message: AnalysisMessage {
                content: MessageContent::Text(text.into()),
            },
        }
    }

    /// The feedback text, whichever shape the content has.
    /// For a list, only the first part counts.
    pub fn text(&self) -> Option<&str> {
        match &self.message.content {
            MessageContent::Text(text) => Some(text.as_str()),
            MessageContent::Parts(parts) => parts.first().and_then(|p| p.text.as_deref()),
        }
    }
}

impl From<LlmResponse> for AnalysisResponse {
    fn from(response: LlmResponse) -> Self {
        let parts = response
            .text_blocks()
            .map(|text| ContentPart {
                text: Some(text.to_string()),
            })
            .collect();
        Self {
            message: AnalysisMessage {
                content: MessageContent::Parts(parts),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("feedback must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Deserializes extracted response text into structured feedback.
pub fn parse_feedback(text: &str) -> Result<Feedback, FeedbackError> {
    match serde_json::from_str::<Value>(strip_json_fences(text))? {
        Value::Object(map) => Ok(map),
        Value::Null => Err(FeedbackError::NotAnObject("null")),
        Value::Bool(_) => Err(FeedbackError::NotAnObject("a boolean")),
        Value::Number(_) => Err(FeedbackError::NotAnObject("a number")),
        Value::String(_) => Err(FeedbackError::NotAnObject("a string")),
        Value::Array(_) => Err(FeedbackError::NotAnObject("an array")),
    }
}

/// Inference seam: rate the stored document against the rendered instructions.
#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    async fn feedback(
        &self,
        document_path: &str,
        instructions: &str,
    ) -> Result<AnalysisResponse, LlmError>;
}

/// Fetches the stored resume and sends it to Claude as a PDF document block.
pub struct LlmResumeAnalyzer {
    llm: LlmClient,
    blobs: Arc<dyn BlobStore>,
}

impl LlmResumeAnalyzer {
    pub fn new(llm: LlmClient, blobs: Arc<dyn BlobStore>) -> Self {
        Self { llm, blobs }
    }
}

#[async_trait]
impl ResumeAnalyzer for LlmResumeAnalyzer {
    async fn feedback(
        &self,
        document_path: &str,
        instructions: &str,
    ) -> Result<AnalysisResponse, LlmError> {
        let document = self
            .blobs
            .download(document_path)
            .await
            .map_err(|e| LlmError::Attachment(e.to_string()))?;
        info!(
            "Sending {} ({} bytes) for analysis",
            document_path,
            document.len()
        );

        let attachment = Attachment::pdf(&document);
        let response = self
            .llm
            .call(instructions, JSON_ONLY_SYSTEM, Some(&attachment))
            .await?;

        let response = AnalysisResponse::from(response);
        if response.text().is_none() {
            return Err(LlmError::EmptyContent);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_from_plain_string_content() {
        let response: AnalysisResponse =
            serde_json::from_value(json!({"message": {"content": "{\"score\": 80}"}})).unwrap();
        assert_eq!(response.text(), Some("{\"score\": 80}"));
    }

    #[test]
    fn test_text_from_first_part_of_list_content() {
        let response: AnalysisResponse = serde_json::from_value(json!({
            "message": {"content": [{"text": "first"}, {"text": "second"}]}
        }))
        .unwrap();
        assert_eq!(response.text(), Some("first"));
    }

    #[test]
    fn test_text_from_empty_list_is_none() {
        let response: AnalysisResponse =
            serde_json::from_value(json!({"message": {"content": []}})).unwrap();
        assert_eq!(response.text(), None);
    }

    #[test]
    fn test_from_llm_response_keeps_text_blocks() {
        let llm: LlmResponse = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "{\"score\": 42}"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .unwrap();
        let response = AnalysisResponse::from(llm);
        assert_eq!(response.text(), Some("{\"score\": 42}"));
    }

    #[test]
    fn test_parse_feedback_object() {
        let feedback = parse_feedback(r#"{"score": 80}"#).unwrap();
        assert_eq!(Value::Object(feedback), json!({"score": 80}));
    }

    #[test]
    fn test_parse_feedback_strips_code_fences() {
        let feedback = parse_feedback("```json\n{\"overallScore\": 71}\n```").unwrap();
        assert_eq!(feedback["overallScore"], 71);
    }

    #[test]
    fn test_parse_feedback_rejects_invalid_json() {
        assert!(matches!(
            parse_feedback("Sure! Here is your feedback"),
            Err(FeedbackError::Json(_))
        ));
    }

    #[test]
    fn test_parse_feedback_rejects_non_objects() {
        assert!(matches!(
            parse_feedback("[1, 2]"),
            Err(FeedbackError::NotAnObject("an array"))
        ));
        assert!(matches!(
            parse_feedback("\"fine\""),
            Err(FeedbackError::NotAnObject("a string"))
        ));
    }
}
