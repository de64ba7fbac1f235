//! Threaded chat backend.
//!
//! Conversations hold a forest of messages; every message can be answered
//! by an upstream chat-completion API, with the reply attached as a child.
//! The HTTP surface lives under `/api`, health probes under `/health`.

pub mod auth;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod providers;
pub mod routes;
pub mod services;
pub mod tree;

#[cfg(test)]
mod tests;

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    auth::IdentityResolver,
    config::ThreadchatConfig,
    db::DbPool,
    providers::{CompletionProvider, open_ai::OpenAICompatibleProvider},
    services::Services,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ThreadchatConfig>,
    pub db: Arc<DbPool>,
    pub services: Services,
    pub identity: Arc<IdentityResolver>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub async fn new(config: ThreadchatConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if config.database.is_none() {
            return Err("database not configured".into());
        }

        // One client for the completion API and JWKS fetches; reqwest pools per host.
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        let pool = DbPool::from_config(&config.database).await?;
        if config.database.run_migrations() {
            pool.run_migrations().await?;
        }
        let db = Arc::new(pool);

        let provider = OpenAICompatibleProvider::from_config(&config.completion, http_client.clone())
            .map(|p| Arc::new(p) as Arc<dyn CompletionProvider>);
        match &provider {
            Some(_) => tracing::info!(
                base_url = %config.completion.base_url,
                model = %config.completion.model,
                "Completion API configured"
            ),
            None => tracing::warn!(
                "No completion API key configured; assistant replies will be placeholders"
            ),
        }

        let services = Services::new(db.clone(), provider, &config.completion);

        if config.auth.identity.is_none() {
            tracing::warn!(
                "No identity source configured; every /api request will be rejected. \
                 Configure [auth.identity] in threadchat.toml."
            );
        }
        let identity = Arc::new(IdentityResolver::new(&config.auth, http_client.clone()));

        Ok(Self {
            config: Arc::new(config),
            db,
            services,
            identity,
            http_client,
        })
    }
}

/// Assemble the full router: health probes, the `/api` tree, and the
/// request-id, CORS, tracing and body-limit layers.
pub fn build_app(config: &ThreadchatConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness))
        .nest("/api", routes::get_api_routes(state.clone()));

    // Layers run outside-in in reverse order: the request id is set before
    // the trace span opens and copied onto the response afterwards.
    app = app.layer(PropagateRequestIdLayer::x_request_id());

    if let Some(cors_layer) = config.server.cors.clone().into_layer() {
        app = app.layer(cors_layer);
    }

    let request_logging = &config.observability.request_logging;
    if request_logging.enabled {
        let level = request_logging.level.to_tracing_level();
        app = app.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(level))
                .on_response(DefaultOnResponse::new().level(level)),
        );
    }

    app.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .with_state(state)
}
