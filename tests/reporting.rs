mod common;

use common::TestApp;
use eas_server::entities::{circle_member, Circle, CircleMember, Contact, Sos, User};
use eas_server::error::AppError;
use eas_server::services::circles::{self, CreateCircle};
use eas_server::services::reporting::{self, TrendEntry, UpdateUser};
use eas_server::services::sos::{self, SendSos, UserLocation};
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

async fn family_of_two(app: &TestApp) -> Uuid {
    app.register("alice", "Alice", None).await;
    app.register("bob", "Bob", None).await;
    circles::create(
        &app.db,
        "alice",
        CreateCircle {
            name: Some("Family".into()),
            profile_image: None,
            member_user_ids: vec!["bob".into()],
        },
    )
    .await
    .unwrap()
    .id
}

async fn raise(app: &TestApp, circle_id: Uuid, emergency_type: &str) -> Uuid {
    let req = SendSos {
        message: Some("Help".into()),
        emergency_type: Some(emergency_type.into()),
        user_location: Some(UserLocation {
            address: Some("Main St 1".into()),
            latitude: None,
            longitude: None,
        }),
        selected_circle_ids: vec![circle_id.to_string()],
        ..Default::default()
    };
    sos::send(&app.db, app.notifier(), "alice", req, false)
        .await
        .unwrap()
        .sos_id
}

#[tokio::test]
async fn trends_over_stored_alerts() {
    let app = TestApp::new().await;
    assert!(reporting::emergency_trends(&app.db).await.unwrap().is_empty());

    let circle_id = family_of_two(&app).await;
    for kind in ["Fire", "Fire", "Medical"] {
        raise(&app, circle_id, kind).await;
    }

    assert_eq!(
        reporting::emergency_trends(&app.db).await.unwrap(),
        vec![
            TrendEntry { emergency_type: "Fire".into(), count: 2 },
            TrendEntry { emergency_type: "Medical".into(), count: 1 },
        ]
    );
}

#[tokio::test]
async fn sos_pages_hold_ten_alerts() {
    let app = TestApp::new().await;
    let circle_id = family_of_two(&app).await;
    for _ in 0..12 {
        raise(&app, circle_id, "Police").await;
    }

    let first = reporting::sos_page(&app.db, None).await.unwrap();
    assert_eq!(first.data.len(), 10);
    assert_eq!(first.pagination.total_records, 12);
    assert_eq!(first.pagination.current_page, 1);
    assert_eq!(first.pagination.total_pages, 2);

    let second = reporting::sos_page(&app.db, Some(2)).await.unwrap();
    assert_eq!(second.data.len(), 2);
    assert!(first.data[0].created_at >= second.data[0].created_at);

    assert_eq!(reporting::active_sos(&app.db).await.unwrap().len(), 12);
}

#[tokio::test]
async fn admin_deletions() {
    let app = TestApp::new().await;
    let circle_id = family_of_two(&app).await;
    let sos_id = raise(&app, circle_id, "Fire").await;

    reporting::delete_sos(&app.db, sos_id).await.unwrap();
    assert_eq!(Sos::find().count(&app.db).await.unwrap(), 0);
    assert!(matches!(
        reporting::delete_sos(&app.db, sos_id).await,
        Err(AppError::NotFound(_))
    ));

    reporting::delete_circle(&app.db, circle_id).await.unwrap();
    assert_eq!(CircleMember::find().count(&app.db).await.unwrap(), 0);
    assert_eq!(Contact::find().count(&app.db).await.unwrap(), 2);
    assert!(reporting::list_circles(&app.db).await.unwrap().is_empty());

    reporting::delete_user(&app.db, "bob").await.unwrap();
    assert!(User::find_by_id("bob".to_string()).one(&app.db).await.unwrap().is_none());
    assert!(matches!(
        reporting::delete_user(&app.db, "bob").await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(reporting::list_users(&app.db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_a_circle_admin_removes_their_circles() {
    let app = TestApp::new().await;
    let family = family_of_two(&app).await;
    let work = circles::create(
        &app.db,
        "bob",
        CreateCircle {
            name: Some("Work".into()),
            profile_image: None,
            member_user_ids: vec!["alice".into()],
        },
    )
    .await
    .unwrap()
    .id;

    reporting::delete_user(&app.db, "alice").await.unwrap();

    assert!(Circle::find_by_id(family).one(&app.db).await.unwrap().is_none());
    let remaining = reporting::list_circles(&app.db).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, work);
    assert_eq!(remaining[0].admin_id, "bob");
    assert_eq!(remaining[0].contacts.len(), 1);
    assert_eq!(remaining[0].contacts[0].user_id, "bob");
    assert_eq!(remaining[0].contacts[0].role, circle_member::ROLE_ADMIN);
    assert_eq!(CircleMember::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn admin_update_validates_status_and_refreshes_the_contact() {
    let app = TestApp::new().await;
    family_of_two(&app).await;

    let bad = reporting::update_user(
        &app.db,
        "bob",
        UpdateUser {
            status: Some("away".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(bad, Err(AppError::BadRequest(_))));

    let updated = reporting::update_user(
        &app.db,
        "bob",
        UpdateUser {
            name: Some("Robert".into()),
            status: Some("online".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.status, "online");

    let entry = Contact::find_by_id("bob".to_string()).one(&app.db).await.unwrap().unwrap();
    assert_eq!(entry.name.as_deref(), Some("Robert"));
    assert_eq!(entry.status, "online");
}
