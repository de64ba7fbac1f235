//! JSON API under `/api`. Every route requires an authenticated principal.

mod auth;
mod conversations;
mod error;
mod messages;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
pub use error::{ApiError, ErrorBody};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{AppState, middleware::principal_middleware};

pub fn get_api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route(
            "/conversations",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/conversations/{id}",
            get(conversations::get).delete(conversations::delete),
        )
        .route(
            "/conversations/{id}/auto-title",
            post(conversations::auto_title),
        )
        .route("/conversations/{id}/messages", get(conversations::messages))
        .route("/conversations/{id}/timeline", get(conversations::timeline))
        .route("/messages", post(messages::create))
        .route("/messages/{id}/context", get(messages::context))
        .route("/messages/{id}/tree", get(messages::tree))
        .route("/messages/{id}/complete", post(messages::complete))
        .route_layer(from_fn_with_state(state, principal_middleware))
}

/// Request bodies are parsed as JSON regardless of `Content-Type`.
fn json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(e.to_string()))
}

/// Ids that are not UUIDs cannot name anything that exists.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}
