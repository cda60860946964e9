// Chat endpoint DTOs
//
// Field names follow the frontend contract (camelCase on the wire).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Audio attached to a chat request (voice input)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioInput {
    /// Audio MIME type (audio/webm, audio/wav, audio/mp3, ...)
    pub mime_type: String,
    /// Base64-encoded audio bytes
    pub data: String,
}

/// Optional client metadata
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientMeta {
    /// Client-supplied trace id, echoed into logs and error bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// POST /chat request body
///
/// At least one of `message` / `audio` must be present.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Opaque session identifier (expected UUIDv4, not enforced)
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioInput>,
    /// Request TTS audio in the response
    #[serde(default)]
    pub voice_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientMeta>,
}

impl ChatRequest {
    /// Inline payload bytes subject to the request size cap
    /// (credentials excluded: the bearer travels in a header).
    pub fn inline_bytes(&self) -> usize {
        let message = self.message.as_deref().map(str::len).unwrap_or(0);
        let audio = self.audio.as_ref().map(|a| a.data.len()).unwrap_or(0);
        message + audio
    }
}

/// Synthesized audio attached to a chat response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioOutput {
    /// Always "audio/mpeg" in v1
    pub mime_type: String,
    /// Base64-encoded MP3 bytes
    pub data: String,
}

/// Outcome of one backend tool dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolStatus {
    Ok,
    Error,
    Timeout,
}

/// Observability record for one tool dispatch
///
/// Never carries argument values or backend payloads.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolTrace {
    pub name: String,
    pub status: ToolStatus,
    /// Duration of the backend call only, in milliseconds
    pub duration_ms: u64,
}

/// Non-fatal degradation notice attached to a successful response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
}

/// Warning code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    TtsUnavailable,
}

impl Warning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// POST /chat response body (200)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub session_id: String,
    /// BCP-47 tag used for this turn
    pub language: String,
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_trace: Option<Vec<ToolTrace>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Warning>>,
}

/// GET /health response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
