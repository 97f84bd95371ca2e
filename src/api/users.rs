use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};

use crate::error::AppError;
use crate::services::SyncOutcome;
use crate::state::AppState;

// GET /api/users/:uid
/// Pulls the profile from the identity store, then returns the local copy.
pub async fn sync_user(
    Extension(state): Extension<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "users")
        .record("action", "sync_user")
        .record("user_id", uid.as_str());

    match state.mirror.sync_one(&uid).await? {
        SyncOutcome::Upserted(user) => Ok(Json(user)),
        SyncOutcome::Removed | SyncOutcome::Retained => Err(AppError::not_found("User profile not found")),
    }
}
