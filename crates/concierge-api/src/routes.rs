// HTTP routes: GET /health and POST /chat

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::error;
use utoipa::OpenApi;

use concierge_contracts::{
    AudioInput, AudioOutput, ChatRequest, ChatResponse, ClientMeta, ErrorBody, ErrorCode,
    HealthResponse, ToolStatus, ToolTrace, Warning, WarningCode,
};

use crate::error::ApiError;
use crate::turn::{TurnController, MAX_INLINE_BYTES};

/// App state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<TurnController>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(health, chat),
    components(schemas(
        ChatRequest,
        ChatResponse,
        AudioInput,
        AudioOutput,
        ClientMeta,
        ToolTrace,
        ToolStatus,
        Warning,
        WarningCode,
        ErrorBody,
        ErrorCode,
    )),
    tags((name = "chat", description = "Conversational gateway endpoints")),
    info(
        title = "Concierge Gateway API",
        description = "Chat gateway between the hotel frontend and the hotel REST backend",
    )
)]
pub struct ApiDoc;

/// Build the gateway router
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        // Inline-bytes enforcement happens in the controller; the transport
        // cap only needs headroom for the JSON framing around it
        .layer(DefaultBodyLimit::max(MAX_INLINE_BYTES + 1024 * 1024))
        .with_state(state)
}

/// GET /health - service health check (public)
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "chat"
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /chat - run one conversational turn
///
/// With `Accept: audio/mpeg` (voiceMode required) the body is the raw MP3
/// and the reply text travels URL-escaped in the `X-Agent-Text` header.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Malformed input", body = ErrorBody),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 413, description = "Inline payload over 20 MiB", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Unexpected server fault", body = ErrorBody),
    ),
    tag = "chat"
)]
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let trace_id = request.client.as_ref().and_then(|c| c.trace_id.clone());

    let bearer = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized().with_trace_id(trace_id.clone()))?;

    let wants_audio = accepts_mpeg(&headers);
    if wants_audio && !request.voice_mode {
        return Err(ApiError::bad_request("Accept: audio/mpeg requires voiceMode=true")
            .with_trace_id(trace_id));
    }

    // Coarse turn deadline; the orchestrator aborts softly before this fires
    let deadline = state.controller.turn_deadline();
    let response = match tokio::time::timeout(
        deadline,
        state.controller.run_turn(request, bearer),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            error!("Turn exceeded the coarse deadline");
            return Err(ApiError::internal("Turn deadline exceeded").with_trace_id(trace_id));
        }
    };

    if wants_audio {
        if let Some(audio) = &response.audio {
            let bytes = BASE64.decode(&audio.data).map_err(|e| {
                ApiError::internal(format!("Corrupt synthesized audio: {e}"))
                    .with_trace_id(trace_id.clone())
            })?;
            let text = urlencoding::encode(&response.reply).into_owned();
            let headers = [
                (CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
                (
                    HeaderName::from_static("x-agent-text"),
                    HeaderValue::from_str(&text)
                        .unwrap_or_else(|_| HeaderValue::from_static("")),
                ),
            ];
            return Ok((headers, bytes).into_response());
        }
        // Synthesis degraded: fall through to JSON carrying the warning
    }

    Ok(Json(response).into_response())
}

/// Extract the opaque bearer credential from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Does the client ask for raw audio back?
fn accepts_mpeg(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("audio/mpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction_requires_the_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn accept_header_detection() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_mpeg(&headers));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!accepts_mpeg(&headers));
        headers.insert(ACCEPT, HeaderValue::from_static("audio/mpeg"));
        assert!(accepts_mpeg(&headers));
    }
}
