use axum::{Extension, Json};
use serde::Serialize;

use crate::auth::Principal;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Principal,
}

/// The authenticated caller.
#[tracing::instrument(name = "api.auth.me", skip_all)]
pub async fn me(Extension(principal): Extension<Principal>) -> Json<MeResponse> {
    Json(MeResponse { user: principal })
}
