use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub run_migrations: bool,
    pub cors_origin: String,
    /// Base URL encoded into medical card QR codes.
    pub public_base_url: String,
    pub firebase_project_id: Option<String>,
    pub firebase_api_key: Option<String>,
    pub firestore_access_token: Option<String>,
    pub expo_push_url: String,
    pub expo_access_token: Option<String>,
    pub weather_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub maps_api_key: Option<String>,
    pub admin_token: Option<String>,
    pub webhook_secret: Option<String>,
    pub profile_sync_interval: Duration,
}

impl Config {
    /// Reads the process environment. `.env` is loaded by the binary first.
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            port: try_load("PORT", "8080")?,
            database_url,
            run_migrations: try_load("RUN_MIGRATIONS", "true")?,
            cors_origin: load_or("CORS_ORIGIN", "http://localhost:3001"),
            public_base_url: load_or("PUBLIC_BASE_URL", "http://localhost:8080"),
            firebase_project_id: optional("FIREBASE_PROJECT_ID"),
            firebase_api_key: optional("FIREBASE_API_KEY"),
            firestore_access_token: optional("FIRESTORE_ACCESS_TOKEN"),
            expo_push_url: load_or("EXPO_PUSH_URL", "https://exp.host/--/api/v2/push/send"),
            expo_access_token: optional("EXPO_ACCESS_TOKEN"),
            weather_api_key: optional("WEATHER_API_KEY"),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: load_or("GEMINI_MODEL", "gemini-1.5-flash"),
            maps_api_key: optional("MAPS_API_KEY"),
            admin_token: optional("ADMIN_API_TOKEN"),
            webhook_secret: optional("WEBHOOK_SECRET"),
            profile_sync_interval: Duration::from_secs(try_load(
                "PROFILE_SYNC_INTERVAL_SECS",
                "30",
            )?),
        })
    }

    /// Defaults for tests and local tooling; every optional collaborator is off.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            port: 8080,
            database_url: database_url.into(),
            run_migrations: true,
            cors_origin: "http://localhost:3001".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            firebase_project_id: None,
            firebase_api_key: None,
            firestore_access_token: None,
            expo_push_url: "https://exp.host/--/api/v2/push/send".to_string(),
            expo_access_token: None,
            weather_api_key: None,
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            maps_api_key: None,
            admin_token: None,
            webhook_secret: None,
            profile_sync_interval: Duration::from_secs(30),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            warn!("{key} not set; dependent features are disabled");
            None
        }
    }
}

fn load_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, String>
where
    T::Err: Display,
{
    load_or(key, default)
        .parse()
        .map_err(|e| format!("Invalid {key} value: {e}"))
}
