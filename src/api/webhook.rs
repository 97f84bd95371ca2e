use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::middleware::{header_matches, WEBHOOK_SECRET_HEADER};
use crate::error::AppError;
use crate::identity::ProfileChange;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(untagged)]
pub enum ChangeBatch {
    Many { changes: Vec<ProfileChange> },
    One(ProfileChange),
}

// POST /webhook/profile-changes
/// Change feed from the identity store. Accepted changes are queued for
/// the sync worker.
pub async fn profile_changes(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(batch): Json<ChangeBatch>,
) -> Result<impl IntoResponse, AppError> {
    let Some(secret) = state.config.webhook_secret.as_deref() else {
        return Err(AppError::Unavailable("Profile change webhook"));
    };
    if !header_matches(&headers, WEBHOOK_SECRET_HEADER, secret) {
        warn!("Profile change webhook called with a bad secret");
        return Err(AppError::Unauthorized);
    }

    let changes = match batch {
        ChangeBatch::Many { changes } => changes,
        ChangeBatch::One(change) => vec![change],
    };
    let received = changes.len();

    for change in changes {
        if state.profile_changes.send(change).await.is_err() {
            return Err(AppError::Internal("profile sync worker is not running".into()));
        }
    }

    info!("Queued {} profile changes", received);
    tracing::Span::current().record("business_event", "Profile changes queued");
    Ok((StatusCode::ACCEPTED, Json(json!({ "queued": received }))))
}
