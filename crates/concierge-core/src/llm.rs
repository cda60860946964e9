// Provider-agnostic LLM types
//
// The orchestrator and the language detector talk to the model through the
// `LlmClient` trait; `OpenAiChatClient` is the production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Message role for LLM calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    User,
    Assistant,
    Tool,
}

/// A single content part within a multipart message
#[derive(Debug, Clone, PartialEq)]
pub enum LlmPart {
    Text { text: String },
    /// Base64 audio payload with its container format ("wav", "mp3", "webm")
    Audio { data: String, format: String },
}

/// Message content: plain text or parts (text + audio)
#[derive(Debug, Clone, PartialEq)]
pub enum LlmContent {
    Text(String),
    Parts(Vec<LlmPart>),
}

impl LlmContent {
    /// Concatenated text portions (media parts are skipped)
    pub fn to_text(&self) -> String {
        match self {
            LlmContent::Text(s) => s.clone(),
            LlmContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    LlmPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id, echoed back with the result
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Tool made available to the model for one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments object
    pub parameters: Value,
}

/// Message in the in-turn conversation fed to the model
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: LlmContent,
    /// Tool calls carried by an assistant message
    pub tool_calls: Vec<ToolCall>,
    /// Correlation id for a tool-result message
    pub tool_call_id: Option<String>,
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: LlmContent::Text(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user_parts(parts: Vec<LlmPart>) -> Self {
        Self {
            role: LlmRole::User,
            content: LlmContent::Parts(parts),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::Assistant,
            content: LlmContent::Text(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Assistant message carrying the model's tool invocations
    pub fn assistant_tool_calls(text: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: LlmRole::Assistant,
            content: LlmContent::Text(text.into()),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// Structured result returned to the model for one tool call
    pub fn tool_result(call_id: impl Into<String>, result: &Value) -> Self {
        Self {
            role: LlmRole::Tool,
            content: LlmContent::Text(result.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// One LLM call
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<LlmMessage>,
    pub tools: Vec<ToolDeclaration>,
    pub temperature: Option<f32>,
}

/// Model reply: final text and/or tool invocations
#[derive(Debug, Clone, Default)]
pub struct LlmReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl LlmReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tools(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: text.into(),
            tool_calls,
        }
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one chat completion (non-streaming)
    async fn chat(&self, request: LlmRequest) -> Result<LlmReply>;
}
