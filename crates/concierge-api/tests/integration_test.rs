// Integration tests for the concierge gateway
//
// Each test spawns the real router on an ephemeral port with scripted
// collaborators (LLM, tool dispatcher, session store, TTS) and drives it
// over HTTP, asserting on observable wire behavior only.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use concierge_api::routes::{routes, AppState};
use concierge_api::tts::{TtsAudio, TtsClient, TtsError};
use concierge_api::turn::TurnController;
use concierge_contracts::SessionDoc;
use concierge_core::error::Result as CoreResult;
use concierge_core::tools::ToolSpec;
use concierge_core::{
    AppConfig, DispatchError, LlmClient, LlmReply, LlmRequest, ToolDispatcher,
};
use concierge_storage::{MemoryRateLimiter, MemorySessionStore, RateLimiter, SessionStore};

// ============================================================================
// Scripted collaborators
// ============================================================================

struct ScriptedLlm {
    replies: Mutex<Vec<LlmReply>>,
    fallback: LlmReply,
    calls: Mutex<u32>,
}

impl ScriptedLlm {
    fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(Vec::new()),
            fallback: LlmReply::text(text),
            calls: Mutex::new(0),
        })
    }

    fn scripted(replies: Vec<LlmReply>, fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            fallback: LlmReply::text(fallback),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, _request: LlmRequest) -> CoreResult<LlmReply> {
        *self.calls.lock().unwrap() += 1;
        let mut replies = self.replies.lock().unwrap();
        Ok(if replies.is_empty() {
            self.fallback.clone()
        } else {
            replies.remove(0)
        })
    }
}

#[derive(Default)]
struct RecordingDispatcher {
    seen: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl ToolDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        spec: &ToolSpec,
        args: &Value,
        _bearer: Option<&str>,
    ) -> Result<Value, DispatchError> {
        self.seen
            .lock()
            .unwrap()
            .push((spec.name.to_string(), args.clone()));
        Ok(json!([]))
    }
}

/// Store in permanent outage: loads read as absence, writes vanish
struct OutageStore;

#[async_trait]
impl SessionStore for OutageStore {
    async fn load(&self, _id: &str) -> Option<SessionDoc> {
        None
    }
    async fn save(&self, _id: &str, _doc: &SessionDoc) {}
    async fn touch(&self, _id: &str) {}
}

struct FixedTts(Result<Vec<u8>, ()>);

#[async_trait]
impl TtsClient for FixedTts {
    async fn synthesize(&self, _text: &str) -> Result<TtsAudio, TtsError> {
        match &self.0 {
            Ok(bytes) => Ok(TtsAudio {
                mime_type: "audio/mpeg",
                bytes: bytes.clone(),
            }),
            Err(()) => Err(TtsError::Unavailable),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

struct App {
    base_url: String,
    store: Arc<MemorySessionStore>,
    detect: Arc<ScriptedLlm>,
}

async fn spawn_app_with(
    main: Arc<ScriptedLlm>,
    detect: Arc<ScriptedLlm>,
    store: Arc<dyn SessionStore>,
    limiter: Arc<dyn RateLimiter>,
    tts: Arc<dyn TtsClient>,
) -> String {
    let config = AppConfig::from_env();
    let controller = TurnController::new(
        &config,
        main,
        detect,
        Arc::new(RecordingDispatcher::default()),
        store,
        limiter,
        tts,
    );
    serve(controller).await
}

async fn serve(controller: TurnController) -> String {
    let app = routes(AppState {
        controller: Arc::new(controller),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_app(main_reply: &str, detect_reply: &str) -> App {
    let store = Arc::new(MemorySessionStore::new(Duration::from_secs(3600)));
    let detect = ScriptedLlm::answering(detect_reply);
    let base_url = spawn_app_with(
        ScriptedLlm::answering(main_reply),
        detect.clone(),
        store.clone(),
        Arc::new(MemoryRateLimiter::new(30)),
        Arc::new(FixedTts(Err(()))),
    )
    .await;
    App {
        base_url,
        store,
        detect,
    }
}

fn chat_body(session_id: &str, message: &str) -> Value {
    json!({ "sessionId": session_id, "message": message, "voiceMode": false })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn health_reports_ok_without_auth() {
    let app = spawn_app("hi", "en-US").await;
    let response = reqwest::get(format!("{}/health", app.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn chat_without_credential_is_unauthorized() {
    let app = spawn_app("hi", "en-US").await;
    let response = reqwest::Client::new()
        .post(format!("{}/chat", app.base_url))
        .json(&chat_body("S1", "Hello"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn cold_polish_session_detects_and_persists() {
    let app = spawn_app("Dzień dobry! W czym mogę pomóc?", "pl-PL").await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/chat", app.base_url))
        .bearer_auth("jwt-token")
        .json(&chat_body("S1", "Cześć, szukam informacji o hotelu"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["sessionId"], "S1");
    assert_eq!(body["language"], "pl-PL");
    assert!(!body["reply"].as_str().unwrap().is_empty());

    let doc = app.store.load("S1").await.unwrap();
    assert_eq!(doc.language.as_deref(), Some("pl-PL"));
    assert_eq!(doc.messages.len(), 2);
}

#[tokio::test]
async fn warm_session_skips_language_detection() {
    let app = spawn_app("Oczywiście!", "pl-PL").await;
    let client = reqwest::Client::new();

    for message in ["Cześć, szukam informacji o hotelu", "a jakie macie pokoje?"] {
        let response = client
            .post(format!("{}/chat", app.base_url))
            .bearer_auth("jwt-token")
            .json(&chat_body("S1", message))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["language"], "pl-PL");
    }

    assert_eq!(app.detect.calls(), 1);
    assert_eq!(app.store.load("S1").await.unwrap().messages.len(), 4);
}

#[tokio::test]
async fn session_store_outage_still_returns_200() {
    let base_url = spawn_app_with(
        ScriptedLlm::answering("Hello! How can I help you today?"),
        ScriptedLlm::answering("en-US"),
        Arc::new(OutageStore),
        Arc::new(MemoryRateLimiter::new(30)),
        Arc::new(FixedTts(Err(()))),
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{base_url}/chat"))
        .bearer_auth("jwt-token")
        .json(&chat_body("S3", "Hello"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(!body["reply"].as_str().unwrap().is_empty());
    assert!(body["language"].is_string());
}

#[tokio::test]
async fn requests_beyond_the_window_limit_get_429() {
    let app = spawn_app("ok", "en-US").await;
    let client = reqwest::Client::new();

    for i in 1..=35u32 {
        let response = client
            .post(format!("{}/chat", app.base_url))
            .bearer_auth("jwt-token")
            .json(&chat_body("S4", "ping"))
            .send()
            .await
            .unwrap();

        if i <= 30 {
            assert_eq!(response.status(), 200, "request {i} should pass");
        } else {
            assert_eq!(response.status(), 429, "request {i} should be limited");
            let body: Value = response.json().await.unwrap();
            assert_eq!(body["code"], "RATE_LIMITED");
            let retry = body["details"]["retryAfter"].as_u64().unwrap();
            assert!((1..=60).contains(&retry));
        }
    }
}

#[tokio::test]
async fn missing_message_and_audio_is_bad_request_with_trace_id() {
    let app = spawn_app("ok", "en-US").await;
    let response = reqwest::Client::new()
        .post(format!("{}/chat", app.base_url))
        .bearer_auth("jwt-token")
        .json(&json!({
            "sessionId": "S1",
            "voiceMode": false,
            "client": { "traceId": "trace-123" }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["traceId"], "trace-123");
}

#[tokio::test]
async fn voice_mode_with_mpeg_accept_returns_raw_audio() {
    let mp3 = b"ID3\x04fake-mp3-bytes".to_vec();
    let base_url = spawn_app_with(
        ScriptedLlm::answering("Here are our rooms."),
        ScriptedLlm::answering("en-US"),
        Arc::new(MemorySessionStore::new(Duration::from_secs(3600))),
        Arc::new(MemoryRateLimiter::new(30)),
        Arc::new(FixedTts(Ok(mp3.clone()))),
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{base_url}/chat"))
        .bearer_auth("jwt-token")
        .header("Accept", "audio/mpeg")
        .json(&json!({ "sessionId": "S1", "message": "Rooms?", "voiceMode": true }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "audio/mpeg"
    );
    let header_text = response.headers()["x-agent-text"].to_str().unwrap().to_string();
    assert_eq!(
        urlencoding::decode(&header_text).unwrap(),
        "Here are our rooms."
    );
    assert_eq!(response.bytes().await.unwrap().to_vec(), mp3);
}

#[tokio::test]
async fn voice_mode_json_accept_carries_base64_audio() {
    let mp3 = b"ID3\x04more-fake-bytes".to_vec();
    let base_url = spawn_app_with(
        ScriptedLlm::answering("Dinner is at seven."),
        ScriptedLlm::answering("en-US"),
        Arc::new(MemorySessionStore::new(Duration::from_secs(3600))),
        Arc::new(MemoryRateLimiter::new(30)),
        Arc::new(FixedTts(Ok(mp3.clone()))),
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{base_url}/chat"))
        .bearer_auth("jwt-token")
        .json(&json!({ "sessionId": "S1", "message": "Dinner?", "voiceMode": true }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["audio"]["mimeType"], "audio/mpeg");
    // Base64 round-trip law: decoding yields the provider bytes
    let decoded = BASE64
        .decode(body["audio"]["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, mp3);
}

#[tokio::test]
async fn mpeg_accept_without_voice_mode_is_rejected() {
    let app = spawn_app("ok", "en-US").await;
    let response = reqwest::Client::new()
        .post(format!("{}/chat", app.base_url))
        .bearer_auth("jwt-token")
        .header("Accept", "audio/mpeg")
        .json(&chat_body("S1", "hello"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn tts_outage_in_voice_mode_degrades_to_json_with_warning() {
    let base_url = spawn_app_with(
        ScriptedLlm::answering("Text only, sorry."),
        ScriptedLlm::answering("en-US"),
        Arc::new(MemorySessionStore::new(Duration::from_secs(3600))),
        Arc::new(MemoryRateLimiter::new(30)),
        Arc::new(FixedTts(Err(()))),
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{base_url}/chat"))
        .bearer_auth("jwt-token")
        .header("Accept", "audio/mpeg")
        .json(&json!({ "sessionId": "S1", "message": "Talk to me", "voiceMode": true }))
        .send()
        .await
        .unwrap();

    // No audio to return raw, so the JSON envelope carries the warning
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["audio"].is_null());
    assert_eq!(body["warnings"][0]["code"], "TTS_UNAVAILABLE");
}

#[tokio::test]
async fn tool_round_trip_shows_up_in_the_trace() {
    let main = ScriptedLlm::scripted(
        vec![
            LlmReply::with_tools(
                "",
                vec![concierge_core::ToolCall {
                    id: "call_1".into(),
                    name: "rooms_filter".into(),
                    arguments: json!({
                        "checkInDate": "2025-10-15",
                        "checkOutDate": "2025-10-18",
                        "numberOfAdults": 2,
                        "numberOfChildren": 0
                    }),
                }],
            ),
            LlmReply::text("We have three rooms available."),
        ],
        "done",
    );
    let base_url = spawn_app_with(
        main,
        ScriptedLlm::answering("en-US"),
        Arc::new(MemorySessionStore::new(Duration::from_secs(3600))),
        Arc::new(MemoryRateLimiter::new(30)),
        Arc::new(FixedTts(Err(()))),
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{base_url}/chat"))
        .bearer_auth("jwt-token")
        .json(&chat_body("S2", "Room for 2 adults Oct 15-18"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["toolTrace"].as_array().unwrap().len(), 1);
    assert_eq!(body["toolTrace"][0]["name"], "rooms_filter");
    assert_eq!(body["toolTrace"][0]["status"], "OK");
    assert!(body["toolTrace"][0]["durationMs"].is_u64());
}
