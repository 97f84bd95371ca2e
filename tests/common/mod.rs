#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use eas_server::config::Config;
use eas_server::entities::user;
use eas_server::identity::{
    AuthError, AuthUser, ExternalProfile, ProfileChange, ProfileSource, SourceError, TokenVerifier,
};
use eas_server::migrator::Migrator;
use eas_server::notifications::{NotificationGateway, PushError, PushMessage, PushProvider, PushTicket};
use eas_server::services::ProfileMirror;
use eas_server::state::AppState;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;

/// In-memory SQLite with every migration applied. One connection, so the
/// whole test sees the same database.
pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

/// Profile documents held in memory. Uids in `failing` answer with a
/// transport-style error.
#[derive(Default)]
pub struct FakeProfileSource {
    profiles: Mutex<HashMap<String, ExternalProfile>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeProfileSource {
    pub fn put(&self, uid: &str, profile: ExternalProfile) {
        self.profiles.lock().unwrap().insert(uid.to_string(), profile);
    }

    pub fn remove(&self, uid: &str) {
        self.profiles.lock().unwrap().remove(uid);
    }

    pub fn fail(&self, uid: &str) {
        self.failing.lock().unwrap().insert(uid.to_string());
    }
}

#[async_trait]
impl ProfileSource for FakeProfileSource {
    async fn fetch(&self, uid: &str) -> Result<Option<ExternalProfile>, SourceError> {
        if self.failing.lock().unwrap().contains(uid) {
            return Err(SourceError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self.profiles.lock().unwrap().get(uid).cloned())
    }

    async fn list_uids(&self) -> Result<Vec<String>, SourceError> {
        let mut uids: Vec<String> = self.profiles.lock().unwrap().keys().cloned().collect();
        uids.extend(self.failing.lock().unwrap().iter().cloned());
        uids.sort();
        uids.dedup();
        Ok(uids)
    }
}

/// Accepts every message and remembers it.
#[derive(Default)]
pub struct RecordingPush {
    sent: Mutex<Vec<PushMessage>>,
}

impl RecordingPush {
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, token: &str) -> Vec<PushMessage> {
        self.sent().into_iter().filter(|m| m.to == token).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl PushProvider for RecordingPush {
    async fn send_chunk(&self, chunk: &[PushMessage]) -> Result<Vec<PushTicket>, PushError> {
        self.sent.lock().unwrap().extend(chunk.iter().cloned());
        Ok(chunk.iter().map(|_| PushTicket::Ok { id: None }).collect())
    }
}

/// The bearer token is the uid. "invalid" is rejected.
pub struct FakeVerifier;

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        if token.is_empty() || token == "invalid" {
            return Err(AuthError::Rejected);
        }
        Ok(AuthUser {
            uid: token.to_string(),
            email: None,
            name: None,
        })
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub state: AppState,
    pub push: Arc<RecordingPush>,
    pub source: Arc<FakeProfileSource>,
    pub changes: mpsc::Receiver<ProfileChange>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let db = test_db().await;
        let mut config = Config::for_database("sqlite::memory:");
        adjust(&mut config);

        let push = Arc::new(RecordingPush::default());
        let source = Arc::new(FakeProfileSource::default());
        let (state, changes) = AppState::new(
            db.clone(),
            config,
            push.clone(),
            Arc::new(FakeVerifier),
            source.clone(),
        );
        Self {
            db,
            state,
            push,
            source,
            changes,
        }
    }

    pub fn notifier(&self) -> &NotificationGateway {
        &self.state.notifier
    }

    pub fn mirror(&self) -> &ProfileMirror {
        &self.state.mirror
    }

    /// Registers the profile externally and mirrors it locally.
    pub async fn register(&self, uid: &str, name: &str, token: Option<&str>) -> user::Model {
        self.source.put(uid, profile(name, token));
        seed_user(&self.db, uid, name, token).await
    }
}

pub fn profile(name: &str, token: Option<&str>) -> ExternalProfile {
    ExternalProfile {
        full_name: Some(name.to_string()),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        phone_number: Some("+15550100".to_string()),
        profile_image: None,
        latitude: Some(40.0),
        longitude: Some(-74.0),
        battery_level: Some(80.0),
        expo_push_token: token.map(str::to_string),
    }
}

pub async fn seed_user(db: &DatabaseConnection, uid: &str, name: &str, token: Option<&str>) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        uid: Set(uid.to_string()),
        name: Set(Some(name.to_string())),
        email: Set(Some(format!("{}@example.com", name.to_lowercase()))),
        phone_number: Set(Some("+15550100".to_string())),
        profile_image: Set(None),
        latitude: Set(Some(40.0)),
        longitude: Set(Some(-74.0)),
        battery_level: Set(Some(80)),
        expo_push_token: Set(token.map(str::to_string)),
        status: Set(user::STATUS_OFFLINE.to_string()),
        last_synced_at: Set(now),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed user")
}
