use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ApiError, json_body, parse_id};
use crate::{
    AppState,
    auth::Principal,
    models::{ContextEntry, CreateMessageRequest, Message},
    services::Subtree,
    tree::ContextMode,
};

#[derive(Debug, Default, Deserialize)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

impl ModeQuery {
    fn mode(&self) -> ContextMode {
        ContextMode::from_query(self.mode.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub messages: Vec<ContextEntry>,
}

/// Post a message to one of the caller's conversations. The body is read as
/// JSON whatever its `Content-Type`.
#[tracing::instrument(name = "api.messages.create", skip_all)]
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let request: CreateMessageRequest = json_body(&body)?;
    request.validate()?;

    let message = state.services.messages.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// The context a completion on this message would receive.
#[tracing::instrument(name = "api.messages.context", skip(state, principal))]
pub async fn context(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Query(query): Query<ModeQuery>,
) -> Result<Json<ContextResponse>, ApiError> {
    let id = parse_id(&id)?;
    let messages = state
        .services
        .messages
        .context(&principal, id, query.mode())
        .await?;
    Ok(Json(ContextResponse {
        messages: messages.iter().map(ContextEntry::from).collect(),
    }))
}

#[tracing::instrument(name = "api.messages.tree", skip(state, principal))]
pub async fn tree(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Subtree>, ApiError> {
    let id = parse_id(&id)?;
    let subtree = state.services.messages.subtree(&principal, id).await?;
    Ok(Json(subtree))
}

/// Generate an assistant reply to this message.
#[tracing::instrument(name = "api.messages.complete", skip(state, principal))]
pub async fn complete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Query(query): Query<ModeQuery>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let id = parse_id(&id)?;
    let message = state
        .services
        .completions
        .complete(&principal, id, query.mode())
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
