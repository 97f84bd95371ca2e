use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::parse_id;
use crate::error::AppError;
use crate::services::reporting::{self, UpdateUser};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

// GET /api/admin/users
pub async fn list_users(Extension(state): Extension<AppState>) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "users")
        .record("action", "admin_list_users");
    let users = reporting::list_users(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": users })))
}

// PUT /api/admin/users/:userId
pub async fn update_user(
    Extension(state): Extension<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUser>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "users")
        .record("action", "admin_update_user");
    let user = reporting::update_user(&state.db, &user_id, payload).await?;
    Ok(Json(json!({ "success": true, "data": user })))
}

// DELETE /api/admin/users/:userId
pub async fn delete_user(
    Extension(state): Extension<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "users")
        .record("action", "admin_delete_user");
    reporting::delete_user(&state.db, &user_id).await?;
    Ok(Json(json!({ "success": true, "message": "User deleted successfully" })))
}

// GET /api/admin/sos?page=
pub async fn list_sos(
    Extension(state): Extension<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "sos")
        .record("action", "admin_list_sos");
    let page = reporting::sos_page(&state.db, query.page).await?;
    Ok(Json(json!({
        "success": true,
        "data": page.data,
        "pagination": page.pagination,
    })))
}

// GET /api/admin/sos/active
pub async fn active_sos(Extension(state): Extension<AppState>) -> Result<impl IntoResponse, AppError> {
    let active = reporting::active_sos(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": active })))
}

// GET /api/admin/sos/trends
pub async fn emergency_trends(Extension(state): Extension<AppState>) -> Result<impl IntoResponse, AppError> {
    let trends = reporting::emergency_trends(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": trends })))
}

// DELETE /api/admin/sos/:sosId
pub async fn delete_sos(
    Extension(state): Extension<AppState>,
    Path(sos_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let sos_id = parse_id(&sos_id, "SOS not found")?;
    tracing::Span::current()
        .record("table", "sos")
        .record("action", "admin_delete_sos")
        .record("sos_id", tracing::field::display(sos_id));
    reporting::delete_sos(&state.db, sos_id).await?;
    Ok(Json(json!({ "success": true, "message": "SOS deleted successfully" })))
}

// GET /api/admin/circles
pub async fn list_circles(Extension(state): Extension<AppState>) -> Result<impl IntoResponse, AppError> {
    let circles = reporting::list_circles(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": circles })))
}

// DELETE /api/admin/circles/:circleId
pub async fn delete_circle(
    Extension(state): Extension<AppState>,
    Path(circle_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let circle_id = parse_id(&circle_id, "Circle not found")?;
    tracing::Span::current()
        .record("table", "circles")
        .record("action", "admin_delete_circle")
        .record("circle_id", tracing::field::display(circle_id));
    reporting::delete_circle(&state.db, circle_id).await?;
    Ok(Json(json!({ "success": true, "message": "Circle deleted successfully" })))
}

// GET /api/admin/user-cards
pub async fn list_user_cards(Extension(state): Extension<AppState>) -> Result<impl IntoResponse, AppError> {
    let cards = reporting::list_user_cards(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": cards })))
}
