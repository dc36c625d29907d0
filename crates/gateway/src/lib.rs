//! # WealthDesk Gateway
//!
//! HTTP + WebSocket server: the advisor channel (`/ws`), a health probe,
//! and the REST read surface under `/api`.
//!
//! Built on Axum. All shared subsystems (store, provider registry,
//! reasoning backends, session registry) are constructed once at startup
//! and shared via `Arc`.

pub mod api;
pub mod sessions;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::Json;
use axum::routing::get;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use wealthdesk_config::AppConfig;
use wealthdesk_core::Error;
use wealthdesk_engine::Orchestrator;
use wealthdesk_providers::default_registry;
use wealthdesk_reasoning::AnthropicReasoning;
use wealthdesk_store::SqliteStore;

use crate::sessions::SessionRegistry;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub store: Arc<SqliteStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<SessionRegistry>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws::ws_handler))
        .nest("/api", api::api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .gateway
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<axum::http::HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Start the gateway: open the store, wire the engine, bind, and serve.
pub async fn start(config: AppConfig) -> Result<(), Error> {
    let state = build_state(config).await?;
    let addr = format!(
        "{}:{}",
        state.config.gateway.host, state.config.gateway.port
    );

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    Ok(())
}

/// Construct all shared subsystems once.
pub async fn build_state(config: AppConfig) -> Result<SharedState, Error> {
    let store = Arc::new(SqliteStore::new(&config.store.path).await?);

    if config.store.seed_on_start {
        let created = wealthdesk_store::seed::seed(&store).await?;
        if created > 0 {
            info!(clients = created, "Seeded demo dataset");
        }
    }

    let api_key = config.reasoning.api_key.clone().unwrap_or_default();
    if api_key.is_empty() {
        warn!("No reasoning API key configured; classifier and synthesis will use fallbacks");
    }

    let router = Arc::new(
        AnthropicReasoning::new(api_key.clone(), config.reasoning.router_model.clone())
            .with_temperature(0.2),
    );
    let writer = Arc::new(AnthropicReasoning::new(
        api_key,
        config.reasoning.writer_model.clone(),
    ));

    let registry = Arc::new(default_registry(&config.advisor_name));
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), registry, router, writer));
    let sessions = Arc::new(SessionRegistry::new());

    Ok(Arc::new(GatewayState {
        config,
        store,
        orchestrator,
        sessions,
    }))
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
