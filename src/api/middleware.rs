use axum::{
    extract::{Extension, Request},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Verifies the bearer token and attaches the `AuthUser` to the request.
pub async fn auth_middleware(
    Extension(state): Extension<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return AppError::Unauthorized.into_response();
    };

    match state.verifier.verify(bearer.token()).await {
        Ok(user) => {
            tracing::Span::current().record("user_id", user.uid.as_str());
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            warn!("Rejected bearer token: {}", e);
            AppError::Unauthorized.into_response()
        }
    }
}

/// Guards the admin dashboard routes with a shared token. With no token
/// configured the admin API is closed.
pub async fn admin_middleware(
    Extension(state): Extension<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.admin_token.as_deref() else {
        warn!("Admin request rejected: ADMIN_API_TOKEN is not configured");
        return AppError::Unauthorized.into_response();
    };

    if header_matches(request.headers(), ADMIN_TOKEN_HEADER, expected) {
        tracing::Span::current().record("user_id", "admin");
        next.run(request).await
    } else {
        AppError::Unauthorized.into_response()
    }
}

pub fn header_matches(headers: &HeaderMap, name: &str, expected: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !expected.is_empty() && v == expected)
}
