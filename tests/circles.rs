mod common;

use common::TestApp;
use eas_server::entities::{circle_member, CircleMember, Contact};
use eas_server::error::AppError;
use eas_server::services::circles::{self, CreateCircle};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

fn family(members: &[&str]) -> CreateCircle {
    CreateCircle {
        name: Some("Family".into()),
        profile_image: None,
        member_user_ids: members.iter().map(|m| m.to_string()).collect(),
    }
}

#[tokio::test]
async fn creator_is_the_only_admin() {
    let app = TestApp::new().await;
    app.register("alice", "Alice", None).await;
    app.register("bob", "Bob", None).await;
    app.register("carol", "Carol", None).await;

    // Creator listed as a member and a duplicate are both ignored
    let circle = circles::create(&app.db, "alice", family(&["bob", "alice", "carol", "bob"]))
        .await
        .unwrap();

    assert_eq!(circle.admin_id, "alice");
    assert_eq!(circle.circle_code.len(), 6);
    let roles: Vec<(&str, &str)> = circle
        .contacts
        .iter()
        .map(|m| (m.user_id.as_str(), m.role.as_str()))
        .collect();
    assert_eq!(
        roles,
        vec![("alice", "admin"), ("bob", "member"), ("carol", "member")]
    );
    assert_eq!(Contact::find().count(&app.db).await.unwrap(), 3);
}

#[tokio::test]
async fn unknown_member_ids_are_dropped() {
    let app = TestApp::new().await;
    app.register("alice", "Alice", None).await;

    let circle = circles::create(&app.db, "alice", family(&["ghost"])).await.unwrap();
    assert_eq!(circle.contacts.len(), 1);
}

#[tokio::test]
async fn create_requires_a_name_and_a_known_creator() {
    let app = TestApp::new().await;
    app.register("alice", "Alice", None).await;

    let mut unnamed = family(&[]);
    unnamed.name = Some("   ".into());
    assert!(matches!(
        circles::create(&app.db, "alice", unnamed).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        circles::create(&app.db, "nobody", family(&[])).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn joining_by_code_adds_a_member_once() {
    let app = TestApp::new().await;
    app.register("alice", "Alice", None).await;
    app.source.put("bob", common::profile("Bob", None));

    let circle = circles::create(&app.db, "alice", family(&[])).await.unwrap();
    let code = circle.circle_code.to_lowercase();

    let joined = circles::join(&app.db, app.mirror(), &code, "bob").await.unwrap();
    assert_eq!(joined.contacts.len(), 2);
    assert_eq!(joined.contacts[1].user_id, "bob");
    assert_eq!(joined.contacts[1].role, "member");

    let again = circles::join(&app.db, app.mirror(), &code, "bob").await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    let missing = circles::join(&app.db, app.mirror(), "ZZZZZZ", "bob").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn deleting_a_circle_keeps_directory_entries() {
    let app = TestApp::new().await;
    app.register("alice", "Alice", None).await;
    app.register("bob", "Bob", None).await;
    let circle = circles::create(&app.db, "alice", family(&["bob"])).await.unwrap();

    let denied = circles::delete(&app.db, circle.id, "bob").await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    circles::delete(&app.db, circle.id, "alice").await.unwrap();

    let entries = CircleMember::find()
        .filter(circle_member::Column::CircleId.eq(circle.id))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(entries, 0);
    assert_eq!(Contact::find().count(&app.db).await.unwrap(), 2);

    let gone = circles::delete(&app.db, circle.id, "alice").await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn member_removal_rules() {
    let app = TestApp::new().await;
    app.register("alice", "Alice", None).await;
    app.register("bob", "Bob", None).await;
    app.register("carol", "Carol", None).await;
    let circle = circles::create(&app.db, "alice", family(&["bob", "carol"])).await.unwrap();

    // Another member cannot remove bob
    let denied = circles::remove_member(&app.db, circle.id, "bob", "carol").await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    // The admin entry stays
    let admin = circles::remove_member(&app.db, circle.id, "alice", "alice").await;
    assert!(matches!(admin, Err(AppError::BadRequest(_))));

    // A member may leave
    circles::remove_member(&app.db, circle.id, "carol", "carol").await.unwrap();
    // The admin may remove a member
    circles::remove_member(&app.db, circle.id, "bob", "alice").await.unwrap();

    let left = circles::remove_member(&app.db, circle.id, "bob", "alice").await;
    assert!(matches!(left, Err(AppError::NotFound(_))));

    let contacts = circles::contacts_of(&app.db, circle.id).await.unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].role, "admin");
}

#[tokio::test]
async fn contacts_carry_the_role_of_this_circle() {
    let app = TestApp::new().await;
    app.register("alice", "Alice", None).await;
    app.register("bob", "Bob", None).await;
    let first = circles::create(&app.db, "alice", family(&["bob"])).await.unwrap();
    let second = circles::create(&app.db, "bob", family(&["alice"])).await.unwrap();

    let in_first = circles::contacts_of(&app.db, first.id).await.unwrap();
    let bob = in_first.iter().find(|c| c.user_id == "bob").unwrap();
    assert_eq!(bob.role, "member");

    let in_second = circles::contacts_of(&app.db, second.id).await.unwrap();
    let bob = in_second.iter().find(|c| c.user_id == "bob").unwrap();
    assert_eq!(bob.role, "admin");
    assert_eq!(bob.location.latitude, Some(40.0));
}

#[tokio::test]
async fn created_and_joined_listings() {
    let app = TestApp::new().await;
    app.register("alice", "Alice", None).await;
    app.register("bob", "Bob", None).await;
    circles::create(&app.db, "alice", family(&["bob"])).await.unwrap();

    assert_eq!(circles::created_by(&app.db, "alice").await.unwrap().len(), 1);
    assert!(circles::created_by(&app.db, "bob").await.unwrap().is_empty());

    let joined = circles::joined_by(&app.db, "bob").await.unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].contacts.len(), 2);

    let profile = circles::member_profile(&app.db, "bob").await.unwrap();
    assert_eq!(profile.name.as_deref(), Some("Bob"));
    assert!(matches!(
        circles::member_profile(&app.db, "ghost").await,
        Err(AppError::NotFound(_))
    ));
}
