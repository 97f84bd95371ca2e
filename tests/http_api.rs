mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::TestApp;
use eas_server::identity::{ChangeKind, ProfileChange};
use eas_server::routes;
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "admin-secret";
const WEBHOOK_SECRET: &str = "hook-secret";

async fn harness() -> (TestApp, Router) {
    let app = TestApp::with_config(|config| {
        config.admin_token = Some(ADMIN_TOKEN.into());
        config.webhook_secret = Some(WEBHOOK_SECRET.into());
    })
    .await;
    let router = routes::app(app.state.clone());
    (app, router)
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn authed(method: &str, uri: &str, uid: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {uid}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn liveness_routes_are_open() {
    let (_app, router) = harness().await;
    for uri in ["/", "/health"] {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn protected_routes_need_a_valid_bearer() {
    let (_app, router) = harness().await;

    let (status, _) = call(&router, Request::get("/api/circles/created").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&router, authed("GET", "/api/circles/created", "invalid", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn circle_and_alert_flow_over_http() {
    let (app, router) = harness().await;
    app.register("alice", "Alice", Some("ExponentPushToken[alice]")).await;
    app.register("bob", "Bob", Some("ExponentPushToken[bob]")).await;

    let (status, body) = call(
        &router,
        authed("POST", "/api/circles", "alice", Some(json!({ "name": "Family", "memberUserIds": ["bob"] }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let circle_id = body["circle"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["circle"]["adminId"], "alice");

    let (status, body) = call(
        &router,
        authed("GET", &format!("/api/circles/{circle_id}/contacts"), "bob", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contacts"].as_array().unwrap().len(), 2);

    let (status, body) = call(
        &router,
        authed(
            "POST",
            "/api/sos",
            "alice",
            Some(json!({
                "message": "Help",
                "emergencyType": "Medical",
                "userLocation": { "address": "Main St 1" },
                "selectedCircleIds": [circle_id],
                "batteryStatus": 15
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sos_id = body["sosId"].as_str().unwrap().to_string();
    assert_eq!(body["notifiedContacts"][0]["contactId"], "bob");
    assert_eq!(app.push.sent_to("ExponentPushToken[bob]")[0].data["batteryStatus"], 15);

    let ack = json!({ "sosId": sos_id });
    let (status, _) = call(&router, authed("POST", "/api/sos/acknowledge", "bob", Some(ack.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&router, authed("POST", "/api/sos/acknowledge", "bob", Some(ack))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&router, authed("GET", "/api/sos-details", "bob", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["contacts"][0]["acknowledged"], true);

    let (status, _) = call(
        &router,
        authed("DELETE", &format!("/api/circles/{circle_id}"), "bob", None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&router, authed("DELETE", "/api/circles/not-a-uuid", "alice", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_recipients_answer_bad_request() {
    let (app, router) = harness().await;
    app.register("alice", "Alice", None).await;

    let (_, body) = call(&router, authed("POST", "/api/circles", "alice", Some(json!({ "name": "Solo" })))).await;
    let circle_id = body["circle"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &router,
        authed(
            "POST",
            "/api/sos",
            "alice",
            Some(json!({
                "message": "Help",
                "emergencyType": "Fire",
                "userLocation": { "latitude": 1.0, "longitude": 2.0 },
                "selectedCircleIds": [circle_id]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("No contacts found"));
}

#[tokio::test]
async fn contact_status_updates_are_self_only() {
    let (app, router) = harness().await;
    app.register("alice", "Alice", None).await;
    app.register("bob", "Bob", None).await;
    call(
        &router,
        authed("POST", "/api/circles", "alice", Some(json!({ "name": "Family", "memberUserIds": ["bob"] }))),
    )
    .await;

    let update = json!({ "latitude": 10.5, "longitude": 20.5, "batteryPercentage": 33 });
    let (status, _) = call(&router, authed("PUT", "/api/contacts/bob/location", "alice", Some(update.clone()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&router, authed("PUT", "/api/contacts/bob/location", "bob", Some(update))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["batteryPercentage"], 33);
}

#[tokio::test]
async fn qr_card_lifecycle_and_public_negotiation() {
    let (_app, router) = harness().await;
    let details = json!({
        "fullName": "Alice Example",
        "age": 34,
        "bloodGroup": "O+",
        "emergencyNumber1": "+15550101"
    });

    let (status, body) = call(&router, authed("POST", "/api/qr-codes", "alice", Some(details.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    let image = body["qrCodeImage"].clone();

    let (status, body) = call(&router, authed("POST", "/api/qr-codes", "alice", Some(details))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["qrCodeImage"], image);

    let (status, body) = call(
        &router,
        Request::get("/api/getUserCardData/alice")
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["qrCodeDetails"]["bloodGroup"], "O+");

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/getUserCardData/alice")
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&page).contains("Alice Example"));

    let (status, _) = call(&router, authed("DELETE", "/api/qr-codes", "alice", None)).await;
    assert_eq!(status, StatusCode::OK);

    let response = router
        .clone()
        .oneshot(Request::get("/api/getUserCardData/alice").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_routes_need_the_admin_token() {
    let (app, router) = harness().await;
    app.register("alice", "Alice", None).await;

    let (status, _) = call(&router, Request::get("/api/admin/users").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &router,
        Request::get("/api/admin/users")
            .header("x-admin-token", ADMIN_TOKEN)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["uid"], "alice");

    let (status, body) = call(
        &router,
        Request::get("/api/admin/sos/trends")
            .header("x-admin-token", ADMIN_TOKEN)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn webhook_queues_profile_changes() {
    let (mut app, router) = harness().await;
    let payload = json!({ "changes": [{ "uid": "alice", "kind": "modified" }] });

    let (status, _) = call(
        &router,
        Request::post("/webhook/profile-changes")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-webhook-secret", "wrong")
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &router,
        Request::post("/webhook/profile-changes")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-webhook-secret", WEBHOOK_SECRET)
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["queued"], 1);
    assert_eq!(
        app.changes.recv().await,
        Some(ProfileChange { uid: "alice".into(), kind: ChangeKind::Modified })
    );
}

#[tokio::test]
async fn assistance_routes_report_missing_configuration() {
    let (_app, router) = harness().await;
    let (status, body) = call(
        &router,
        Request::get("/api/weather-updates?lat=1&lon=2&expoPushToken=t")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Weather service is not configured");
}
