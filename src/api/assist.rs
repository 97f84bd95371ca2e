use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::error::AppError;
use crate::services::assistance::{self, HelpRequest, WeatherQuery};
use crate::state::AppState;

// GET /api/weather-updates
pub async fn weather_updates(
    Extension(state): Extension<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<impl IntoResponse, AppError> {
    let weather = state
        .weather
        .as_deref()
        .ok_or(AppError::Unavailable("Weather service"))?;
    Ok(Json(
        assistance::weather_updates(weather, &state.notifier, query).await?,
    ))
}

// POST /api/get-help
pub async fn get_help(
    Extension(state): Extension<AppState>,
    Json(payload): Json<HelpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let gemini = state
        .gemini
        .as_deref()
        .ok_or(AppError::Unavailable("Emergency guidance"))?;
    let guidance = assistance::emergency_guidance(gemini, state.places.as_deref(), payload).await?;
    Ok(Json(json!({ "success": true, "data": guidance })))
}
