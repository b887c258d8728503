//! HTTP client for the public-read asset bucket.

use async_trait::async_trait;
use mime::Mime;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use inkpost_core::auth::CredentialsCell;
use inkpost_core::store::{AssetStore, StoreError};

use super::error::{RemoteError, map_response_error};
use super::shared::{ServiceClient, ServiceConfig};

/// Canned-ACL header marking an upload world-readable.
const ACL_HEADER: &str = "x-amz-acl";
const ACL_PUBLIC_READ: &str = "public-read";

/// Configuration for the bucket client.
#[derive(Clone, Debug)]
pub struct BucketConfig {
    pub(crate) service: ServiceConfig,
    /// Base under which uploaded objects are publicly served. Often the
    /// same host as the upload endpoint, but a CDN front is common.
    pub(crate) public_base: String,
}

impl BucketConfig {
    pub fn new(base_url: &str, public_base: impl Into<String>) -> Result<Self, RemoteError> {
        let mut public_base = public_base.into();
        while public_base.ends_with('/') {
            public_base.pop();
        }
        if public_base.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Public base URL cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            service: ServiceConfig::new(base_url)?,
            public_base,
        })
    }
}

/// Asset bucket client. Objects are PUT under their key with a public-read
/// ACL; the upload carries the shared credentials when a login has filled
/// the cell.
#[derive(Clone, Debug)]
pub struct BucketClient {
    shared: ServiceClient,
    public_base: String,
}

impl BucketClient {
    pub fn new(config: BucketConfig, credentials: CredentialsCell) -> Result<Self, RemoteError> {
        let shared = ServiceClient::new(config.service, credentials)?;
        debug!(base_url = %shared.base_url(), public_base = %config.public_base, "Bucket client initialized.");
        Ok(Self {
            shared,
            public_base: config.public_base,
        })
    }

    async fn put_inner(
        &self,
        key: &str,
        content_type: &Mime,
        bytes: Vec<u8>,
    ) -> Result<(), RemoteError> {
        let url = self.shared.url(key)?;
        debug!(key, bytes = bytes.len(), "Uploading object");

        let builder = self
            .shared
            .http_client()
            .put(url)
            .header(CONTENT_TYPE, content_type.as_ref())
            .header(ACL_HEADER, ACL_PUBLIC_READ)
            .body(bytes);
        let response = self.shared.authorize(builder).await.send().await?;

        if !response.status().is_success() {
            return Err(map_response_error(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for BucketClient {
    #[instrument(skip(self, bytes))]
    async fn put_object(
        &self,
        key: &str,
        content_type: &Mime,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.put_inner(key, content_type, bytes)
            .await
            .map_err(StoreError::from)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}
