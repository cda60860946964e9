// Gateway configuration from environment variables
//
// All knobs come from the environment; unparseable numeric values fall back
// to their defaults with a logged warning so a bad deploy manifest degrades
// instead of refusing to boot.

use std::time::Duration;

use tracing::warn;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn from_env() -> Self {
        match std::env::var("APP_ENV").as_deref() {
            Ok("production") => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Session TTL, sliding (minutes on the wire, stored as Duration)
    pub session_ttl: Duration,
    /// Upper bound on persisted history entries per session
    pub session_max_messages: usize,
    /// Requests admitted per session per 60-second window
    pub rate_limit_per_min: u32,
    /// Upper bound on model invocations per turn
    pub max_fc_rounds: usize,
    /// Coarse wall-clock deadline for a whole turn
    pub turn_deadline: Duration,
    /// Hotel backend base URL
    pub backend_url: String,
    /// Per-tool-call backend timeout
    pub backend_timeout: Duration,
    /// Main conversational model
    pub llm_model_main: String,
    /// Cheaper model for language detection
    pub llm_model_detect: String,
    /// LLM provider API key
    pub llm_api_key: String,
    /// Override for OpenAI-compatible endpoints (None = provider default)
    pub llm_base_url: Option<String>,
    /// TTS provider API key (None disables synthesis)
    pub tts_api_key: Option<String>,
    pub tts_voice_id: Option<String>,
    pub tts_model_id: Option<String>,
    /// Session store connection string
    pub redis_url: String,
    pub app_env: AppEnv,
    /// HTTP bind address
    pub bind_addr: String,
}

impl AppConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Self {
        Self {
            session_ttl: Duration::from_secs(env_u64("SESSION_TTL_MIN", 60) * 60),
            session_max_messages: env_u64("SESSION_MAX_MESSAGES", 20) as usize,
            rate_limit_per_min: env_u64("RATE_LIMIT_PER_MIN", 30) as u32,
            max_fc_rounds: env_u64("MAX_FC_ROUNDS", 6) as usize,
            turn_deadline: Duration::from_secs(env_u64("TURN_DEADLINE_SEC", 60)),
            backend_url: env_or("BACKEND_URL", "http://localhost:8081"),
            backend_timeout: Duration::from_secs(env_u64("BACKEND_TIMEOUT_SEC", 10)),
            llm_model_main: env_or("LLM_MODEL_MAIN", "gpt-4o-mini"),
            llm_model_detect: env_or("LLM_MODEL_DETECT", "gpt-4o-mini"),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or_default(),
            llm_base_url: std::env::var("LLM_BASE_URL").ok(),
            tts_api_key: std::env::var("TTS_API_KEY").ok().filter(|v| !v.is_empty()),
            tts_voice_id: std::env::var("TTS_VOICE_ID").ok(),
            tts_model_id: std::env::var("TTS_MODEL_ID").ok(),
            redis_url: env_or("REDIS_URL", "redis://localhost:6379/0"),
            app_env: AppEnv::from_env(),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var = name, value = %raw, default, "Unparseable env var, using default");
                default
            }
        },
        Err(_) => default,
    }
}
