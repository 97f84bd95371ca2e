use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};

use crate::error::AppError;
use crate::identity::AuthUser;
use crate::services::contacts::{self, ContactResponse, LiveStatusUpdate};
use crate::state::AppState;

// PUT /api/contacts/:contactId/location
pub async fn update_location(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(contact_id): Path<String>,
    Json(payload): Json<LiveStatusUpdate>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "contacts")
        .record("action", "update_location");

    let updated = contacts::update_live_status(&state.db, &user.uid, &contact_id, payload).await?;
    Ok(Json(ContactResponse::from(updated)))
}
