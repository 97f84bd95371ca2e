use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::parse_id;
use crate::error::AppError;
use crate::identity::AuthUser;
use crate::services::circles::{self, CreateCircle};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCircleRequest {
    pub circle_code: Option<String>,
}

// POST /api/circles
pub async fn create_circle(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateCircle>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "circles")
        .record("action", "create_circle");

    let circle = circles::create(&state.db, &user.uid, payload).await?;

    tracing::Span::current()
        .record("circle_id", tracing::field::display(circle.id))
        .record("business_event", "Circle created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Circle created successfully", "circle": circle })),
    ))
}

// POST /api/circles/join
pub async fn join_circle(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<JoinCircleRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "circle_members")
        .record("action", "join_circle");

    let code = payload
        .circle_code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("circleCode is required."))?;
    let circle = circles::join(&state.db, &state.mirror, &code, &user.uid).await?;

    tracing::Span::current()
        .record("circle_id", tracing::field::display(circle.id))
        .record("business_event", "Circle joined");
    Ok(Json(json!({ "message": "User successfully joined the circle", "circle": circle })))
}

// GET /api/circles/created
pub async fn created_circles(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(circles::created_by(&state.db, &user.uid).await?))
}

// GET /api/circles/joined
pub async fn joined_circles(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(circles::joined_by(&state.db, &user.uid).await?))
}

// GET /api/circles/:circleId/contacts
pub async fn circle_contacts(
    Extension(state): Extension<AppState>,
    Path(circle_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let circle_id = parse_id(&circle_id, "Circle not found")?;
    tracing::Span::current().record("circle_id", tracing::field::display(circle_id));

    let contacts = circles::contacts_of(&state.db, circle_id).await?;
    Ok(Json(json!({ "contacts": contacts })))
}

// DELETE /api/circles/:circleId
pub async fn delete_circle(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(circle_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let circle_id = parse_id(&circle_id, "Circle not found")?;
    tracing::Span::current()
        .record("table", "circles")
        .record("action", "delete_circle")
        .record("circle_id", tracing::field::display(circle_id));

    circles::delete(&state.db, circle_id, &user.uid).await?;
    Ok(Json(json!({ "message": "Circle deleted and roles updated successfully" })))
}

// DELETE /api/circles/:circleId/contacts/:contactId
pub async fn remove_member(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((circle_id, contact_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let circle_id = parse_id(&circle_id, "Circle not found")?;
    tracing::Span::current()
        .record("table", "circle_members")
        .record("action", "remove_member")
        .record("circle_id", tracing::field::display(circle_id));

    circles::remove_member(&state.db, circle_id, &contact_id, &user.uid).await?;
    Ok(Json(json!({ "message": "Contact removed from circle successfully" })))
}

// GET /api/circles/member/:userId/profile
pub async fn member_profile(
    Extension(state): Extension<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(circles::member_profile(&state.db, &user_id).await?))
}
