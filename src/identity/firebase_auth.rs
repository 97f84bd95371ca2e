use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::{AuthError, AuthUser, TokenVerifier};

const LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

/// Verifies Firebase ID tokens against the Identity Toolkit lookup endpoint.
pub struct FirebaseTokenVerifier {
    client: Client,
    api_key: String,
}

impl FirebaseTokenVerifier {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let res = self
            .client
            .post(LOOKUP_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": token }))
            .send()
            .await?;

        match res.status() {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AuthError::Rejected)
            }
            other => {
                warn!("Identity lookup answered {}", other);
                return Err(AuthError::Rejected);
            }
        }

        let body: LookupResponse = res.json().await?;
        let user = body.users.into_iter().next().ok_or(AuthError::Rejected)?;
        Ok(AuthUser {
            uid: user.local_id,
            email: user.email,
            name: user.display_name,
        })
    }
}
