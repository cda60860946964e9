// Concierge gateway server
//
// Wires the production collaborators (OpenAI-protocol LLM, hotel backend,
// Redis session store and rate limiter, TTS) into the turn controller and
// serves the HTTP surface. When Redis is unreachable at boot the gateway
// falls back to in-memory state so a cache outage cannot keep it down.

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use concierge_api::routes::{routes, ApiDoc, AppState};
use concierge_api::tts::HttpTtsClient;
use concierge_api::turn::TurnController;
use concierge_core::{AppConfig, BackendClient, LlmClient, OpenAiChatClient};
use concierge_storage::{
    MemoryRateLimiter, MemorySessionStore, RateLimiter, RedisRateLimiter, RedisSessionStore,
    SessionStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; LOG_LEVEL is the deploy-facing knob, RUST_LOG wins
    let default_filter = std::env::var("LOG_LEVEL")
        .map(|level| format!("concierge_api={level},concierge_core={level},tower_http=info"))
        .unwrap_or_else(|_| "concierge_api=debug,concierge_core=debug,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("concierge-api starting...");

    let config = AppConfig::from_env();
    tracing::info!(
        env = ?config.app_env,
        model = %config.llm_model_main,
        "Configuration loaded"
    );

    // LLM client: one handle serves the main model and the detector
    let llm: Arc<dyn LlmClient> = match &config.llm_base_url {
        Some(base_url) => Arc::new(OpenAiChatClient::with_base_url(
            config.llm_api_key.clone(),
            base_url.clone(),
        )),
        None => Arc::new(OpenAiChatClient::new(config.llm_api_key.clone())),
    };

    let dispatcher = Arc::new(BackendClient::new(
        config.backend_url.clone(),
        config.backend_timeout,
    ));
    tracing::info!(backend_url = %config.backend_url, "Hotel backend configured");

    // Session state: Redis in production, in-memory fallback when absent
    let (store, limiter): (Arc<dyn SessionStore>, Arc<dyn RateLimiter>) =
        match redis::Client::open(config.redis_url.as_str()) {
            Ok(client) => match redis::aio::ConnectionManager::new(client).await {
                Ok(manager) => {
                    tracing::info!("Connected to Redis session store");
                    (
                        Arc::new(RedisSessionStore::new(manager.clone(), config.session_ttl)),
                        Arc::new(RedisRateLimiter::new(manager, config.rate_limit_per_min)),
                    )
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unreachable, using in-memory session state");
                    (
                        Arc::new(MemorySessionStore::new(config.session_ttl)),
                        Arc::new(MemoryRateLimiter::new(config.rate_limit_per_min)),
                    )
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Invalid REDIS_URL, using in-memory session state");
                (
                    Arc::new(MemorySessionStore::new(config.session_ttl)),
                    Arc::new(MemoryRateLimiter::new(config.rate_limit_per_min)),
                )
            }
        };

    let tts = Arc::new(HttpTtsClient::new(
        config.tts_api_key.clone(),
        config.tts_voice_id.clone(),
        config.tts_model_id.clone(),
    ));
    if config.tts_api_key.is_none() {
        tracing::warn!("TTS_API_KEY not set: voice responses degrade to text-only");
    }

    let controller = Arc::new(TurnController::new(
        &config,
        llm.clone(),
        llm,
        dispatcher,
        store,
        limiter,
        tts,
    ));

    let app = routes(AppState { controller })
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
