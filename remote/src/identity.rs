//! Token-exchange client for the federation endpoint: trades an identity
//! provider's login token for short-lived write-scoped credentials.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use inkpost_core::article::Timestamp;
use inkpost_core::auth::{
    AuthError, CredentialsCell, IdentityBroker, TemporaryCredentials, WebIdentityToken,
};

use super::error::{RemoteError, map_response_error};
use super::shared::{ServiceClient, ServiceConfig};

/// Configuration for the identity client.
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub(crate) service: ServiceConfig,
    /// Role the exchanged credentials assume.
    pub(crate) role_arn: String,
    /// Identity provider the tokens come from (e.g. "graph.facebook.com").
    pub(crate) provider_id: String,
}

impl IdentityConfig {
    pub fn new(
        base_url: &str,
        role_arn: impl Into<String>,
        provider_id: impl Into<String>,
    ) -> Result<Self, RemoteError> {
        let role_arn = role_arn.into();
        let provider_id = provider_id.into();
        if role_arn.is_empty() || provider_id.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Role ARN and provider id cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            service: ServiceConfig::new(base_url)?,
            role_arn,
            provider_id,
        })
    }
}

/// Identity broker backed by the federation endpoint. The exchange request
/// itself is always unsigned.
#[derive(Clone, Debug)]
pub struct IdentityClient {
    shared: ServiceClient,
    role_arn: String,
    provider_id: String,
}

impl IdentityClient {
    pub fn new(config: IdentityConfig) -> Result<Self, RemoteError> {
        let shared = ServiceClient::new(config.service, CredentialsCell::new())?;
        debug!(base_url = %shared.base_url(), role = %config.role_arn, "Identity client initialized.");
        Ok(Self {
            shared,
            role_arn: config.role_arn,
            provider_id: config.provider_id,
        })
    }

    async fn exchange_inner(
        &self,
        token: &WebIdentityToken,
    ) -> Result<TemporaryCredentials, RemoteError> {
        let url = self.shared.url("")?;
        let request = ExchangeRequest {
            role_arn: &self.role_arn,
            provider_id: &self.provider_id,
            web_identity_token: token.expose(),
        };

        let response = self
            .shared
            .http_client()
            .post(url)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(map_response_error(response).await);
        }

        let body_text = response.text().await?;
        let parsed: ExchangeResponse =
            serde_json::from_str(&body_text).map_err(|source| RemoteError::ResponseParsing {
                context: "token exchange response".to_string(),
                source,
            })?;
        Ok(parsed.credentials.into())
    }
}

#[async_trait]
impl IdentityBroker for IdentityClient {
    #[instrument(skip(self, token), fields(provider = %self.provider_id))]
    async fn exchange(&self, token: &WebIdentityToken) -> Result<TemporaryCredentials, AuthError> {
        self.exchange_inner(token).await.map_err(AuthError::from)
    }
}

// ============== Wire Structures ==============

// No Debug derive: the serialized form carries the raw identity token.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExchangeRequest<'a> {
    role_arn: &'a str,
    provider_id: &'a str,
    web_identity_token: &'a str,
}

#[derive(Deserialize, Debug)]
struct ExchangeResponse {
    #[serde(rename = "Credentials")]
    credentials: WireCredentials,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct WireCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    /// Expiry in epoch milliseconds, absent when the endpoint omits it.
    #[serde(default)]
    expiration: Option<i64>,
}

impl From<WireCredentials> for TemporaryCredentials {
    fn from(wire: WireCredentials) -> Self {
        TemporaryCredentials {
            access_key_id: wire.access_key_id,
            secret_access_key: wire.secret_access_key.into(),
            session_token: wire.session_token.into(),
            expiration: wire.expiration.map(Timestamp::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exchange_request_matches_wire_shape() {
        let request = ExchangeRequest {
            role_arn: "arn:aws:iam::123:role/blog-admin",
            provider_id: "graph.facebook.com",
            web_identity_token: "tok",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "RoleArn": "arn:aws:iam::123:role/blog-admin",
                "ProviderId": "graph.facebook.com",
                "WebIdentityToken": "tok"
            })
        );
    }

    #[test]
    fn exchange_response_parses_with_and_without_expiry() {
        let body = json!({
            "Credentials": {
                "AccessKeyId": "AKID",
                "SecretAccessKey": "secret",
                "SessionToken": "session",
                "Expiration": 1700000000000i64
            }
        });
        let parsed: ExchangeResponse = serde_json::from_value(body).unwrap();
        let credentials = TemporaryCredentials::from(parsed.credentials);
        assert_eq!(credentials.access_key_id, "AKID");
        assert_eq!(
            credentials.expiration.map(Timestamp::as_millis),
            Some(1_700_000_000_000)
        );

        let body = json!({
            "Credentials": {
                "AccessKeyId": "AKID",
                "SecretAccessKey": "secret",
                "SessionToken": "session"
            }
        });
        let parsed: ExchangeResponse = serde_json::from_value(body).unwrap();
        let credentials = TemporaryCredentials::from(parsed.credentials);
        assert!(credentials.expiration.is_none());
    }

    #[test]
    fn empty_role_or_provider_is_rejected() {
        assert!(matches!(
            IdentityConfig::new("https://identity.example.com", "", "graph.facebook.com"),
            Err(RemoteError::InvalidConfiguration(_))
        ));
    }
}
