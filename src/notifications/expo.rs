use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::warn;

use super::gateway::{PushError, PushMessage, PushProvider, PushTicket};

#[derive(Deserialize)]
struct ExpoResponse {
    data: Vec<PushTicket>,
}

/// Expo push service client.
#[derive(Clone)]
pub struct ExpoPushClient {
    client: Client,
    url: String,
    access_token: Option<String>,
}

impl ExpoPushClient {
    pub fn new(client: Client, url: impl Into<String>, access_token: Option<String>) -> Self {
        if access_token.is_none() {
            warn!("EXPO_ACCESS_TOKEN not set; sending unauthenticated push requests");
        }
        Self {
            client,
            url: url.into(),
            access_token,
        }
    }
}

#[async_trait]
impl PushProvider for ExpoPushClient {
    async fn send_chunk(&self, chunk: &[PushMessage]) -> Result<Vec<PushTicket>, PushError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(header::ACCEPT, "application/json")
            .json(chunk);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let res = request.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ExpoResponse = res.json().await?;
        Ok(parsed.data)
    }
}
