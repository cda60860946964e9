// Per-turn coordinator
//
// Composes rate limiting, session state, language detection, the FC
// orchestrator and TTS into one request/response cycle. Everything after
// the orchestrator run is best-effort: a persistence or TTS failure never
// changes the reply the guest sees.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use concierge_contracts::{
    AudioOutput, ChatRequest, ChatResponse, SessionDoc, StoredMessage, Warning, WarningCode,
};
use concierge_core::orchestrator::AudioPayload;
use concierge_core::{
    AppConfig, LanguageDetector, LlmClient, Orchestrator, ToolDispatcher, TurnInput,
    DEFAULT_LANGUAGE,
};
use concierge_storage::{Admission, RateLimiter, SessionStore};

use crate::error::ApiError;
use crate::tts::TtsClient;

/// Inline request bytes accepted before PAYLOAD_TOO_LARGE (20 MiB)
pub const MAX_INLINE_BYTES: usize = 20 * 1024 * 1024;

/// History stand-in for audio-only turns; raw audio is never persisted
const VOICE_PLACEHOLDER: &str = "[voice message]";

/// Top-level per-turn coordinator
pub struct TurnController {
    orchestrator: Orchestrator,
    detector: LanguageDetector,
    store: Arc<dyn SessionStore>,
    limiter: Arc<dyn RateLimiter>,
    tts: Arc<dyn TtsClient>,
    model_main: String,
    max_fc_rounds: usize,
    session_max_messages: usize,
    turn_deadline: Duration,
}

impl TurnController {
    pub fn new(
        config: &AppConfig,
        llm_main: Arc<dyn LlmClient>,
        llm_detect: Arc<dyn LlmClient>,
        dispatcher: Arc<dyn ToolDispatcher>,
        store: Arc<dyn SessionStore>,
        limiter: Arc<dyn RateLimiter>,
        tts: Arc<dyn TtsClient>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(llm_main, dispatcher),
            detector: LanguageDetector::new(llm_detect, config.llm_model_detect.clone()),
            store,
            limiter,
            tts,
            model_main: config.llm_model_main.clone(),
            max_fc_rounds: config.max_fc_rounds,
            session_max_messages: config.session_max_messages,
            turn_deadline: config.turn_deadline,
        }
    }

    /// Coarse wall-clock bound for one whole turn
    pub fn turn_deadline(&self) -> Duration {
        self.turn_deadline
    }

    /// Run one chat turn end to end
    pub async fn run_turn(
        &self,
        request: ChatRequest,
        bearer: String,
    ) -> Result<ChatResponse, ApiError> {
        let trace_id = request
            .client
            .as_ref()
            .and_then(|c| c.trace_id.clone());
        let fail =
            |err: ApiError| err.with_trace_id(trace_id.clone());

        // 1. Validate input
        if request.message.is_none() && request.audio.is_none() {
            return Err(fail(ApiError::bad_request(
                "Either 'message' or 'audio' must be provided",
            )));
        }
        if let Some(id) = &trace_id {
            if id.len() > 64 {
                return Err(fail(ApiError::bad_request("traceId exceeds 64 characters")));
            }
        }
        if request.inline_bytes() > MAX_INLINE_BYTES {
            return Err(fail(ApiError::payload_too_large()));
        }
        let audio = request
            .audio
            .as_ref()
            .map(|a| {
                audio_format(&a.mime_type)
                    .map(|format| AudioPayload {
                        data: a.data.clone(),
                        format: format.to_string(),
                    })
                    .ok_or_else(|| {
                        ApiError::bad_request(format!("Unsupported audio MIME type '{}'", a.mime_type))
                    })
            })
            .transpose()
            .map_err(&fail)?;

        // 2. Admit
        if let Admission::Denied { retry_after_secs } =
            self.limiter.admit(&request.session_id).await
        {
            return Err(fail(ApiError::rate_limited(retry_after_secs)));
        }

        // 3. Load session (absent on store outage; the turn proceeds bare)
        let mut doc = self
            .store
            .load(&request.session_id)
            .await
            .unwrap_or_else(|| SessionDoc::new(Utc::now()));

        // 4. Language: cached tag wins; detection runs once per session
        let language = match &doc.language {
            Some(tag) => tag.clone(),
            None => match request.message.as_deref() {
                Some(text) if !text.trim().is_empty() => self.detector.detect(text).await,
                _ => DEFAULT_LANGUAGE.to_string(),
            },
        };

        // 5. Orchestrate
        let outcome = self
            .orchestrator
            .run(TurnInput {
                language: language.clone(),
                history: doc.messages.clone(),
                user_text: request.message.clone(),
                audio,
                bearer: Some(bearer),
                model: self.model_main.clone(),
                max_rounds: self.max_fc_rounds,
                deadline: Instant::now().into_std() + self.turn_deadline,
            })
            .await
            .map_err(|e| {
                error!(error = %e, "Turn orchestration failed");
                fail(ApiError::internal("Failed to produce a reply"))
            })?;

        // 6. Persist (best-effort; never alters the reply)
        let now = Utc::now();
        let user_content = request
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| VOICE_PLACEHOLDER.to_string());
        doc.language = Some(language.clone());
        doc.push_exchange(
            StoredMessage::user(user_content, now),
            StoredMessage::assistant(outcome.reply.clone(), now),
            self.session_max_messages,
        );
        self.store.save(&request.session_id, &doc).await;

        // 7. Optional TTS
        let mut warnings = Vec::new();
        let audio_out = if request.voice_mode {
            match self.tts.synthesize(&outcome.reply).await {
                Ok(audio) => Some(AudioOutput {
                    mime_type: audio.mime_type.to_string(),
                    data: BASE64.encode(audio.bytes),
                }),
                Err(e) => {
                    warn!(error = %e, "TTS degraded to text-only");
                    warnings.push(Warning::new(
                        WarningCode::TtsUnavailable,
                        "Audio synthesis unavailable, returning text only",
                    ));
                    None
                }
            }
        } else {
            None
        };

        info!(
            session_id = %request.session_id,
            %language,
            tool_calls = outcome.trace.len(),
            aborted = outcome.aborted,
            "Turn completed"
        );

        // 8. Assemble
        Ok(ChatResponse {
            session_id: request.session_id,
            language,
            reply: outcome.reply,
            audio: audio_out,
            tool_trace: if outcome.trace.is_empty() {
                None
            } else {
                Some(outcome.trace)
            },
            warnings: if warnings.is_empty() {
                None
            } else {
                Some(warnings)
            },
        })
    }
}

/// Map a supported audio MIME type to the model-facing container format
fn audio_format(mime_type: &str) -> Option<&'static str> {
    match mime_type.split(';').next().unwrap_or_default().trim() {
        "audio/wav" | "audio/x-wav" => Some("wav"),
        "audio/mp3" | "audio/mpeg" => Some("mp3"),
        "audio/webm" => Some("webm"),
        _ => None,
    }
}
