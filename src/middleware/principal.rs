use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{AppState, routes::api::ApiError};

/// Resolve the caller once and attach the [`Principal`](crate::auth::Principal)
/// as a request extension. Requests without a valid identity stop here with
/// `401 {"error": "UNAUTHENTICATED"}`.
pub async fn principal_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = state.identity.resolve(req.headers()).await?;

    tracing::debug!(user_id = %principal.id, is_admin = principal.is_admin, "Resolved principal");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
