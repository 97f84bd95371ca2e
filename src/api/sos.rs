use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::error::AppError;
use crate::identity::AuthUser;
use crate::services::{
    scheduled_sos::{self, ScheduleSos},
    sos::{self, AcknowledgeSos, SendSos},
};
use crate::state::AppState;

// POST /api/sos
pub async fn send_sos(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SendSos>,
) -> Result<impl IntoResponse, AppError> {
    dispatch(state, user, payload, false).await
}

// POST /api/sos/sendToAll
pub async fn send_sos_to_all(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SendSos>,
) -> Result<impl IntoResponse, AppError> {
    dispatch(state, user, payload, true).await
}

async fn dispatch(
    state: AppState,
    user: AuthUser,
    payload: SendSos,
    send_to_all: bool,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "sos")
        .record("action", "send_sos");

    let dispatched = sos::send(&state.db, &state.notifier, &user.uid, payload, send_to_all).await?;

    tracing::Span::current().record(
        "business_event",
        tracing::field::display(format!(
            "SOS sent to {} contacts",
            dispatched.notified_contacts.len()
        )),
    );
    Ok((StatusCode::OK, Json(dispatched)))
}

// POST /api/sos/acknowledge
pub async fn acknowledge_sos(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AcknowledgeSos>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "sos_recipients")
        .record("action", "acknowledge_sos");

    sos::acknowledge(&state.db, &state.notifier, &user.uid, payload).await?;

    tracing::Span::current().record("business_event", "SOS acknowledged");
    Ok(Json(json!({
        "message": "SOS acknowledged successfully and notification sent to the sender."
    })))
}

// GET /api/sos-details
pub async fn list_recent_sos(
    Extension(state): Extension<AppState>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "sos")
        .record("action", "list_recent_sos");
    Ok(Json(sos::list_recent(&state.db).await?))
}

// GET /api/sos-details/user/:userId
pub async fn list_user_sos(
    Extension(state): Extension<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "sos")
        .record("action", "list_user_sos");
    Ok(Json(sos::list_by_user(&state.db, &user_id).await?))
}

// DELETE /api/sos-details/user/:userId/sos/:sosId
pub async fn delete_user_sos(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, sos_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "sos")
        .record("action", "delete_user_sos")
        .record("sos_id", sos_id.as_str());

    sos::delete_by_user(&state.db, &user.uid, &user_id, &sos_id).await?;
    Ok(Json(json!({
        "message": format!("SOS request with ID {} deleted for user {}.", sos_id, user_id)
    })))
}

// POST /api/sos/schedule
pub async fn schedule_sos(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ScheduleSos>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "scheduled_sos")
        .record("action", "schedule_sos");
    Ok(Json(scheduled_sos::schedule(&state.db, &user.uid, payload).await?))
}

// GET /api/sos/schedule
pub async fn list_scheduled_sos(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "scheduled_sos")
        .record("action", "list_scheduled_sos");
    Ok(Json(scheduled_sos::list_for_user(&state.db, &user.uid).await?))
}
