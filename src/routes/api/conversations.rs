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
    models::{Conversation, CreateConversationRequest, Message},
    services::Timeline,
    tree::ContextMode,
};

#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub mode: Option<String>,
    /// Message selected in the thread panel.
    pub thread: Option<String>,
    /// Message whose completion is in flight on the client.
    pub pending: Option<String>,
}

/// The caller's conversations, most recently updated first.
#[tracing::instrument(name = "api.conversations.list", skip_all)]
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ItemsResponse<Conversation>>, ApiError> {
    let items = state.services.conversations.list(&principal).await?;
    Ok(Json(ItemsResponse { items }))
}

/// Create a conversation. The body is optional: `{}` or nothing at all
/// creates an untitled conversation.
#[tracing::instrument(name = "api.conversations.create", skip_all)]
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let request: CreateConversationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateConversationRequest::default()
    } else {
        json_body(&body)?
    };
    request.validate()?;

    let conversation = state
        .services
        .conversations
        .create(&principal, request)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

#[tracing::instrument(name = "api.conversations.get", skip(state, principal))]
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    let id = parse_id(&id)?;
    let conversation = state.services.conversations.get(&principal, id).await?;
    Ok(Json(conversation))
}

#[tracing::instrument(name = "api.conversations.delete", skip(state, principal))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = parse_id(&id)?;
    state.services.conversations.delete(&principal, id).await?;
    Ok(Json(DeletedResponse { ok: true }))
}

#[tracing::instrument(name = "api.conversations.auto_title", skip(state, principal))]
pub async fn auto_title(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<TitleResponse>, ApiError> {
    let id = parse_id(&id)?;
    let title = state
        .services
        .conversations
        .auto_title(&principal, id)
        .await?;
    Ok(Json(TitleResponse { title }))
}

/// Every message of the conversation in creation order.
#[tracing::instrument(name = "api.conversations.messages", skip(state, principal))]
pub async fn messages(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ItemsResponse<Message>>, ApiError> {
    let id = parse_id(&id)?;
    let items = state.services.messages.list(&principal, id).await?;
    Ok(Json(ItemsResponse { items }))
}

#[tracing::instrument(name = "api.conversations.timeline", skip(state, principal))]
pub async fn timeline(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Timeline>, ApiError> {
    let id = parse_id(&id)?;
    let mode = ContextMode::from_query(query.mode.as_deref());
    let selected = query.thread.as_deref().and_then(|t| parse_id(t).ok());
    let awaiting = query.pending.as_deref().and_then(|p| parse_id(p).ok());

    let arena = state.services.messages.arena(&principal, id).await?;
    Ok(Json(Timeline::build(&arena, mode, selected, awaiting)))
}
