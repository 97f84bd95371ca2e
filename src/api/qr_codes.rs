use axum::{
    extract::{Extension, Path},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::AppError;
use crate::identity::AuthUser;
use crate::services::user_cards::{self, CardPayload, CardRequest};
use crate::state::AppState;

// POST /api/qr-codes
pub async fn upsert_card(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CardRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "user_cards")
        .record("action", "upsert_card");

    let saved = user_cards::upsert(&state.db, &state.config.public_base_url, &user.uid, payload).await?;
    let status = if saved.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(saved)))
}

// GET /api/qr-codes
pub async fn get_card(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let card = user_cards::fetch(&state.db, &user.uid).await?;
    Ok(Json(CardPayload::from(card)))
}

// DELETE /api/qr-codes
pub async fn delete_card(
    Extension(state): Extension<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current()
        .record("table", "user_cards")
        .record("action", "delete_card");

    user_cards::delete(&state.db, &user.uid).await?;
    Ok(Json(json!({ "message": "QR code deleted successfully" })))
}

// GET /api/getUserCardData/:uid (public, reached by scanning the code)
pub async fn public_card(
    Extension(state): Extension<AppState>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    let json = user_cards::wants_json(accept);

    let result = match user_cards::fetch(&state.db, &uid).await {
        Ok(card) if json => Ok(Json(CardPayload::from(card)).into_response()),
        Ok(card) => user_cards::render_card_page(&card).map(|page| Html(page).into_response()),
        Err(AppError::NotFound(_)) => Err(AppError::not_found("No data found for this user")),
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => response,
        Err(e) if json => e.into_response(),
        Err(e) => {
            let status = e.status();
            let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                tracing::error!("Failed to serve card for {}: {}", uid, e);
                "Failed to fetch user card data".to_string()
            } else {
                e.to_string()
            };
            (status, Html(format!("<h1>Error</h1><p>{}</p>", message))).into_response()
        }
    }
}
