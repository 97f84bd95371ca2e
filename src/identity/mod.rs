//! Boundary to the external identity provider: profile documents, their
//! change feed, and bearer-token verification.

pub mod access_token;
pub mod firebase_auth;
pub mod firestore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use access_token::AccessTokenProvider;
pub use firebase_auth::FirebaseTokenVerifier;
pub use firestore::FirestoreProfileSource;

/// Profile document as stored by the mobile app in the `users` collection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProfile {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub profile_image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub battery_level: Option<f64>,
    pub expo_push_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProfileChange {
    pub uid: String,
    pub kind: ChangeKind,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("profile source transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("profile source answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed profile document: {0}")]
    Malformed(String),

    #[error("access token unavailable: {0}")]
    Token(String),

    #[error("profile source is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait ProfileSource: Send + Sync + 'static {
    /// `Ok(None)` when the identity has no profile document.
    async fn fetch(&self, uid: &str) -> Result<Option<ExternalProfile>, SourceError>;

    async fn list_uids(&self) -> Result<Vec<String>, SourceError>;
}

/// Identity attached to authenticated requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("token rejected")]
    Rejected,

    #[error("token verification transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token verification is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Stand-in used when no Firebase project is configured: every token is rejected.
pub struct DisabledVerifier;

#[async_trait]
impl TokenVerifier for DisabledVerifier {
    async fn verify(&self, _token: &str) -> Result<AuthUser, AuthError> {
        Err(AuthError::NotConfigured)
    }
}

/// Stand-in used when no Firebase project is configured. Every call fails,
/// so a missing source is never mistaken for a deleted profile.
pub struct DisabledProfileSource;

#[async_trait]
impl ProfileSource for DisabledProfileSource {
    async fn fetch(&self, _uid: &str) -> Result<Option<ExternalProfile>, SourceError> {
        Err(SourceError::NotConfigured)
    }

    async fn list_uids(&self) -> Result<Vec<String>, SourceError> {
        Err(SourceError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_events_use_lowercase_kinds() {
        let change: ProfileChange =
            serde_json::from_str(r#"{"uid":"u1","kind":"removed"}"#).unwrap();
        assert_eq!(
            change,
            ProfileChange {
                uid: "u1".into(),
                kind: ChangeKind::Removed
            }
        );
    }

    #[tokio::test]
    async fn disabled_source_refuses_to_answer() {
        assert!(matches!(
            DisabledProfileSource.fetch("u1").await,
            Err(SourceError::NotConfigured)
        ));
        assert!(matches!(
            DisabledProfileSource.list_uids().await,
            Err(SourceError::NotConfigured)
        ));
    }
}
