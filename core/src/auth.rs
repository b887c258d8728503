//! Federated authentication: the identity-broker seam and the shared slot
//! holding the temporary credentials the write clients consult.
//!
//! The client never implements an auth protocol of its own. An interactive
//! login against the third-party identity provider yields an access token;
//! the broker exchanges that token for short-lived write-scoped
//! credentials. Whether a given write is allowed is decided entirely by the
//! remote services' credential policy; the admin flag in
//! [`crate::state::AppState`] is a presentation hint, not a gate.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::article::Timestamp;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Identity provider rejected the token: {0}")]
    Rejected(String),

    #[error("Response parsing error: {0}")]
    Parsing(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Access token obtained from the identity provider's interactive login.
#[derive(Debug, Clone)]
pub struct WebIdentityToken(SecretString);

impl WebIdentityToken {
    pub fn new(token: impl Into<String>) -> Self {
        WebIdentityToken(token.into().into())
    }

    /// Exposes the raw token for the credential exchange request body.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Short-lived write-scoped credentials returned by the broker.
#[derive(Debug, Clone)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: SecretString,
    /// Expiry in milliseconds since the epoch, when the broker reports one.
    pub expiration: Option<Timestamp>,
}

#[async_trait]
pub trait IdentityBroker: Send + Sync {
    /// Exchanges an identity-provider token for temporary credentials
    /// scoped by the configured role.
    async fn exchange(&self, token: &WebIdentityToken)
    -> Result<TemporaryCredentials, AuthError>;
}

/// Shared slot the write clients read credentials from on every request.
/// Filled on a successful login, cleared on logout or a failed exchange.
#[derive(Debug, Clone, Default)]
pub struct CredentialsCell {
    inner: Arc<RwLock<Option<TemporaryCredentials>>>,
}

impl CredentialsCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, credentials: TemporaryCredentials) {
        *self.inner.write().await = Some(credentials);
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    pub async fn get(&self) -> Option<TemporaryCredentials> {
        self.inner.read().await.clone()
    }

    pub async fn is_present(&self) -> bool {
        self.inner.read().await.is_some()
    }
}

/// Broker that accepts any token and returns fixed credentials. Backs the
/// test suite and the CLI's in-memory mode.
#[derive(Debug, Clone)]
pub struct StaticBroker {
    credentials: TemporaryCredentials,
}

impl StaticBroker {
    pub fn new(credentials: TemporaryCredentials) -> Self {
        StaticBroker { credentials }
    }
}

impl Default for StaticBroker {
    fn default() -> Self {
        StaticBroker::new(TemporaryCredentials {
            access_key_id: "local".to_string(),
            secret_access_key: "local-secret".to_string().into(),
            session_token: "local-session".to_string().into(),
            expiration: None,
        })
    }
}

#[async_trait]
impl IdentityBroker for StaticBroker {
    async fn exchange(
        &self,
        _token: &WebIdentityToken,
    ) -> Result<TemporaryCredentials, AuthError> {
        Ok(self.credentials.clone())
    }
}
