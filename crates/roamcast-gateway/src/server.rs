//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use roamcast_channels::{Delivery, TelegramChannel};
use roamcast_core::{RoamcastConfig, Store};
use roamcast_providers::{OpenAiClient, PostGenerator, RelevanceFilter};
use roamcast_scheduler::Scheduler;

/// Shared state for the gateway server.
pub struct AppState {
    pub config: RoamcastConfig,
    pub store: Arc<dyn Store>,
    pub scheduler: Scheduler,
    pub generator: PostGenerator,
    pub relevance: RelevanceFilter,
    pub delivery: Delivery,
    pub telegram: TelegramChannel,
    pub start_time: std::time::Instant,
    /// Serializes the due-check → generate → mark cycle so overlapping polls
    /// cannot double-post within one window.
    pub post_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    /// Wire up the collaborators from config + an opened store.
    pub fn new(config: RoamcastConfig, store: Arc<dyn Store>) -> Self {
        let telegram = TelegramChannel::new(&config.telegram.bot_token);
        let delivery = if config.delivery.relay_mode {
            Delivery::Relay
        } else {
            Delivery::Direct(telegram.clone())
        };
        let client = OpenAiClient::new(&config.api_key, &config.api_base_url);
        let relevance = RelevanceFilter::new(
            OpenAiClient::new(&config.api_key, &config.api_base_url),
            &config.llm,
        );
        let generator = PostGenerator::new(client, config.llm.clone());
        let scheduler = Scheduler::new(store.clone());

        Self {
            config,
            store,
            scheduler,
            generator,
            relevance,
            delivery,
            telegram,
            start_time: std::time::Instant::now(),
            post_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The group currently being published to: the registry's active group,
    /// falling back to the configured default.
    pub async fn target_group(&self) -> String {
        match self.store.active_group().await {
            Ok(Some(id)) => id,
            _ => self.config.telegram.group_id.clone(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(super::routes::health_check))
        .route("/api/v1/should-post", get(super::routes::should_post))
        .route("/api/v1/generate-post", post(super::routes::generate_post))
        .route("/api/v1/schedule", get(super::routes::schedule_info))
        .route("/api/v1/comment", post(super::routes::ingest_comment))
        .route("/api/v1/stats", get(super::routes::stats))
        .route(
            "/api/v1/webhook/telegram",
            post(super::routes::telegram_webhook),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn start(config: RoamcastConfig) -> anyhow::Result<()> {
    let missing = config.missing_required();
    if !missing.is_empty() {
        tracing::warn!("⚠️ Missing required settings: {}", missing.join(", "));
    }

    let store = roamcast_storage::open(&config.storage).await?;
    let state = Arc::new(AppState::new(config, store));

    // Startup connectivity check — non-fatal, the poll loop retries anyway.
    match state.telegram.get_me().await {
        Ok(me) => tracing::info!(
            "🤖 Telegram bot: @{}",
            me.username.as_deref().unwrap_or("unknown")
        ),
        Err(e) => tracing::warn!("⚠️ Telegram not reachable yet: {e}"),
    }
    tracing::info!(
        "📦 Delivery mode: {}",
        if state.delivery.is_relay() { "relay" } else { "direct" }
    );

    let addr = format!("{}:{}", state.config.gateway.host, state.config.gateway.port);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Gateway server listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
