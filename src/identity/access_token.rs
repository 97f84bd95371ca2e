use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::SourceError;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

// Refresh this long before the metadata server's expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// OAuth access token for Google APIs: a fixed token from the environment,
/// or the runtime service account via the metadata server.
pub struct AccessTokenProvider {
    client: Client,
    fixed: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenProvider {
    pub fn new(client: Client, fixed: Option<String>) -> Self {
        Self {
            client,
            fixed,
            cached: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> Result<String, SourceError> {
        if let Some(token) = &self.fixed {
            return Ok(token.clone());
        }

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let res = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| SourceError::Token(e.to_string()))?;
        if !res.status().is_success() {
            return Err(SourceError::Token(format!(
                "metadata server answered {}",
                res.status()
            )));
        }
        let fresh: MetadataToken = res
            .json()
            .await
            .map_err(|e| SourceError::Token(e.to_string()))?;

        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: fresh.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }
}
