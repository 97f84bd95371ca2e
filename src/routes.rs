use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post, put},
    Extension, Router,
};
use axum_prometheus::PrometheusMetricLayer;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;

use crate::api::{self, middleware::ADMIN_TOKEN_HEADER};
use crate::state::AppState;

const BODY_LIMIT: usize = 10 * 1024 * 1024;

async fn root() -> &'static str {
    "Emergency alert service is running"
}

async fn health_check() -> &'static str {
    "OK"
}

/// The full HTTP surface without the Prometheus layer. The binary adds it
/// with [`with_metrics`]; tests drive this router directly.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        // SOS
        .route("/sos", post(api::sos::send_sos))
        .route("/sos/sendToAll", post(api::sos::send_sos_to_all))
        .route(
            "/sos/schedule",
            post(api::sos::schedule_sos).get(api::sos::list_scheduled_sos),
        )
        .route("/sos/acknowledge", post(api::sos::acknowledge_sos))
        .route("/sos-details", get(api::sos::list_recent_sos))
        .route("/sos-details/user/:userId", get(api::sos::list_user_sos))
        .route(
            "/sos-details/user/:userId/sos/:sosId",
            axum::routing::delete(api::sos::delete_user_sos),
        )
        // Circles
        .route("/circles", post(api::circles::create_circle))
        .route("/circles/join", post(api::circles::join_circle))
        .route("/circles/created", get(api::circles::created_circles))
        .route("/circles/joined", get(api::circles::joined_circles))
        .route(
            "/circles/member/:userId/profile",
            get(api::circles::member_profile),
        )
        .route(
            "/circles/:circleId",
            axum::routing::delete(api::circles::delete_circle),
        )
        .route("/circles/:circleId/contacts", get(api::circles::circle_contacts))
        .route(
            "/circles/:circleId/contacts/:contactId",
            axum::routing::delete(api::circles::remove_member),
        )
        // Contacts and profiles
        .route("/contacts/:contactId/location", put(api::contacts::update_location))
        .route("/users/:uid", get(api::users::sync_user))
        // Medical card
        .route(
            "/qr-codes",
            post(api::qr_codes::upsert_card)
                .get(api::qr_codes::get_card)
                .delete(api::qr_codes::delete_card),
        )
        .route_layer(from_fn(api::middleware::auth_middleware));

    let admin_routes = Router::new()
        .route("/users", get(api::admin::list_users))
        .route(
            "/users/:userId",
            put(api::admin::update_user).delete(api::admin::delete_user),
        )
        .route("/sos", get(api::admin::list_sos))
        .route("/sos/active", get(api::admin::active_sos))
        .route("/sos/trends", get(api::admin::emergency_trends))
        .route("/sos/:sosId", axum::routing::delete(api::admin::delete_sos))
        .route("/circles", get(api::admin::list_circles))
        .route(
            "/circles/:circleId",
            axum::routing::delete(api::admin::delete_circle),
        )
        .route("/user-cards", get(api::admin::list_user_cards))
        .route_layer(from_fn(api::middleware::admin_middleware));

    // Reached without a bearer token: QR scans and the assistance helpers
    let public_routes = Router::new()
        .route("/getUserCardData/:uid", get(api::qr_codes::public_card))
        .route("/weather-updates", get(api::assist::weather_updates))
        .route("/get-help", post(api::assist::get_help));

    let api_routes = protected_routes
        .merge(public_routes)
        .nest("/admin", admin_routes);

    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/webhook/profile-changes", post(api::webhook::profile_changes))
        .nest("/api", api_routes)
        .layer(Extension(state))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // "METHOD /route/:param" keeps span names low-cardinality
                    let span_name = match matched_path {
                        Some(path) => format!("{} {}", request.method(), path),
                        None => format!("{} {}", request.method(), request.uri().path()),
                    };

                    let user_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        user_ip = user_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // Filled in by middleware and handlers
                        table = tracing::field::Empty,
                        action = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        sos_id = tracing::field::Empty,
                        circle_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

/// Adds request metrics and the `/metrics` scrape endpoint.
pub fn with_metrics(
    router: Router,
    prometheus_layer: PrometheusMetricLayer<'static>,
    metric_handle: PrometheusHandle,
) -> Router {
    router
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(ADMIN_TOKEN_HEADER),
        ])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!("CORS_ORIGIN {:?} is not a valid header value; cross-origin requests are refused", origin);
            layer
        }
    }
}
