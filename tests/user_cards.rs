mod common;

use common::TestApp;
use eas_server::error::AppError;
use eas_server::services::user_cards::{self, CardRequest};

fn card(blood_group: &str) -> CardRequest {
    CardRequest {
        full_name: Some("Alice Example".into()),
        age: Some(34),
        blood_group: Some(blood_group.into()),
        medicines: vec!["Insulin".into()],
        emergency_number1: Some("+15550101".into()),
        insurance_details: Some("ACME-42".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn second_upsert_keeps_the_image() {
    let app = TestApp::new().await;
    let base = &app.state.config.public_base_url;

    let first = user_cards::upsert(&app.db, base, "alice", card("O+")).await.unwrap();
    assert!(first.created);
    assert!(first.qr_code_image.starts_with("data:image/svg+xml;base64,"));

    let second = user_cards::upsert(&app.db, base, "alice", card("AB-")).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.qr_code_image, first.qr_code_image);

    let stored = user_cards::fetch(&app.db, "alice").await.unwrap();
    assert_eq!(stored.blood_group, "AB-");
    assert_eq!(stored.qr_code_details["insuranceDetails"], "ACME-42");
    assert_eq!(stored.qr_code_details["emergencyNumbers"][0], "+15550101");
}

#[tokio::test]
async fn required_fields_are_enforced() {
    let app = TestApp::new().await;
    let base = &app.state.config.public_base_url;

    let mut missing = card("O+");
    missing.emergency_number1 = None;
    assert!(matches!(
        user_cards::upsert(&app.db, base, "alice", missing).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        user_cards::fetch(&app.db, "alice").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn public_page_escapes_values() {
    let app = TestApp::new().await;
    let base = &app.state.config.public_base_url;
    let mut request = card("O+");
    request.full_name = Some("<script>alert(1)</script>".into());
    user_cards::upsert(&app.db, base, "alice", request).await.unwrap();

    let stored = user_cards::fetch(&app.db, "alice").await.unwrap();
    let page = user_cards::render_card_page(&stored).unwrap();
    assert!(!page.contains("<script>alert(1)</script>"));
    assert!(page.contains("&lt;script&gt;"));
    assert!(page.contains("Insulin"));
}

#[tokio::test]
async fn delete_removes_the_card_once() {
    let app = TestApp::new().await;
    let base = &app.state.config.public_base_url;
    user_cards::upsert(&app.db, base, "alice", card("O+")).await.unwrap();

    user_cards::delete(&app.db, "alice").await.unwrap();
    assert!(matches!(
        user_cards::delete(&app.db, "alice").await,
        Err(AppError::NotFound(_))
    ));
}
