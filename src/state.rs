use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::Config;
use crate::error::AppError;
use crate::gemini::GeminiClient;
use crate::identity::{
    AccessTokenProvider, DisabledProfileSource, DisabledVerifier, FirebaseTokenVerifier,
    FirestoreProfileSource, ProfileChange, ProfileSource, TokenVerifier,
};
use crate::notifications::{ExpoPushClient, NotificationGateway, PushProvider};
use crate::places::PlacesClient;
use crate::services::ProfileMirror;
use crate::weather::WeatherClient;

const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(15);
const CHANGE_FEED_CAPACITY: usize = 256;

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub notifier: NotificationGateway,
    pub verifier: Arc<dyn TokenVerifier>,
    pub mirror: Arc<ProfileMirror>,
    pub profile_changes: mpsc::Sender<ProfileChange>,
    pub weather: Option<Arc<WeatherClient>>,
    pub gemini: Option<Arc<GeminiClient>>,
    pub places: Option<Arc<PlacesClient>>,
}

impl AppState {
    /// State over the given boundary collaborators, with the optional
    /// upstream clients off. Returns the change-feed receiver for the worker.
    pub fn new(
        db: DatabaseConnection,
        config: Config,
        push: Arc<dyn PushProvider>,
        verifier: Arc<dyn TokenVerifier>,
        source: Arc<dyn ProfileSource>,
    ) -> (Self, mpsc::Receiver<ProfileChange>) {
        let (tx, rx) = mpsc::channel(CHANGE_FEED_CAPACITY);
        let state = Self {
            mirror: Arc::new(ProfileMirror::new(db.clone(), source)),
            db,
            config: Arc::new(config),
            notifier: NotificationGateway::new(push),
            verifier,
            profile_changes: tx,
            weather: None,
            gemini: None,
            places: None,
        };
        (state, rx)
    }

    /// Production wiring from configuration.
    pub fn from_config(
        db: DatabaseConnection,
        config: Config,
    ) -> Result<(Self, mpsc::Receiver<ProfileChange>), AppError> {
        let http = Client::builder()
            .timeout(OUTBOUND_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        let push: Arc<dyn PushProvider> = Arc::new(ExpoPushClient::new(
            http.clone(),
            config.expo_push_url.clone(),
            config.expo_access_token.clone(),
        ));

        let verifier: Arc<dyn TokenVerifier> = match &config.firebase_api_key {
            Some(key) => Arc::new(FirebaseTokenVerifier::new(http.clone(), key.clone())),
            None => {
                warn!("FIREBASE_API_KEY not set; every bearer token will be rejected");
                Arc::new(DisabledVerifier)
            }
        };

        let source: Arc<dyn ProfileSource> = match &config.firebase_project_id {
            Some(project) => Arc::new(FirestoreProfileSource::new(
                http.clone(),
                project,
                AccessTokenProvider::new(http.clone(), config.firestore_access_token.clone()),
            )?),
            None => {
                warn!("FIREBASE_PROJECT_ID not set; profile sync and lookups are disabled");
                Arc::new(DisabledProfileSource)
            }
        };

        let weather = config
            .weather_api_key
            .clone()
            .map(|key| Arc::new(WeatherClient::new(http.clone(), key)));
        let gemini = config
            .gemini_api_key
            .clone()
            .map(|key| Arc::new(GeminiClient::new(http.clone(), key, config.gemini_model.clone())));
        let places = config
            .maps_api_key
            .clone()
            .map(|key| Arc::new(PlacesClient::new(http.clone(), key)));

        let (mut state, rx) = Self::new(db, config, push, verifier, source);
        state.weather = weather;
        state.gemini = gemini;
        state.places = places;
        Ok((state, rx))
    }
}
