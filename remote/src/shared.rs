use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use tracing::{debug, trace};
use url::Url;

use inkpost_core::auth::CredentialsCell;

use super::error::RemoteError;

/// Header naming the table operation a request targets.
pub const TARGET_HEADER: &str = "x-inkpost-target";

/// Headers carrying the temporary credentials on write requests.
pub const ACCESS_KEY_HEADER: &str = "x-inkpost-access-key";
pub const SESSION_TOKEN_HEADER: &str = "x-inkpost-security-token";

/// Configuration shared by the remote service clients.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub(crate) base_url: Url,
    /// Timeout for HTTP requests. Defaults to 30 seconds.
    pub(crate) timeout: std::time::Duration,
}

impl ServiceConfig {
    /// Creates a configuration pointing at a service endpoint.
    ///
    /// # Errors
    /// Returns `RemoteError::InvalidConfiguration` if the URL does not parse
    /// or cannot serve as a base for path joins.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            RemoteError::InvalidConfiguration(format!("Invalid base URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidConfiguration(
                "Base URL cannot be a 'cannot-be-a-base' URL.".to_string(),
            ));
        }
        // A trailing slash makes Url::join treat the last segment as a
        // directory rather than replacing it.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Ok(Self {
            base_url,
            timeout: std::time::Duration::from_secs(30),
        })
    }

    /// Allows setting a custom request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Shared component holding the HTTP client, endpoint configuration, and
/// the credentials cell the login flow fills.
#[derive(Clone, Debug)]
pub(crate) struct ServiceClient {
    config: ServiceConfig,
    http_client: Client,
    credentials: CredentialsCell,
}

impl ServiceClient {
    /// Builds a client over `config`. An empty [`CredentialsCell`] yields a
    /// client whose requests go out unsigned.
    pub(crate) fn new(
        config: ServiceConfig,
        credentials: CredentialsCell,
    ) -> Result<Self, RemoteError> {
        debug!(base_url = %config.base_url, timeout = ?config.timeout, "Building service HTTP client.");
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                RemoteError::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            config,
            http_client,
            credentials,
        })
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    /// Resolves `relative_path` against the configured endpoint.
    pub(crate) fn url(&self, relative_path: &str) -> Result<Url, RemoteError> {
        let url = self.config.base_url.join(relative_path).map_err(|e| {
            RemoteError::InvalidConfiguration(format!(
                "Invalid request path '{}': {}",
                relative_path, e
            ))
        })?;
        trace!(built_url = %url, "Built service URL");
        Ok(url)
    }

    /// Attaches the credential headers when the shared cell holds
    /// credentials; otherwise returns the builder untouched.
    pub(crate) async fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.credentials.get().await {
            Some(credentials) => builder
                .header(ACCESS_KEY_HEADER, &credentials.access_key_id)
                .header(
                    SESSION_TOKEN_HEADER,
                    credentials.session_token.expose_secret(),
                ),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_normalizes_base_url_for_joining() {
        let config = ServiceConfig::new("https://table.example.com/prod").unwrap();
        assert_eq!(config.base_url.as_str(), "https://table.example.com/prod/");

        let config = ServiceConfig::new("https://table.example.com/prod/").unwrap();
        assert_eq!(config.base_url.as_str(), "https://table.example.com/prod/");
    }

    #[test]
    fn config_rejects_unjoinable_urls() {
        assert!(matches!(
            ServiceConfig::new("not a url"),
            Err(RemoteError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ServiceConfig::new("data:text/plain,hello"),
            Err(RemoteError::InvalidConfiguration(_))
        ));
    }
}
