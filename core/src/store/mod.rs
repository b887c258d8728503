//! Store seams: the remote article table and asset bucket behind async
//! traits, so the client logic is independent of the concrete services.
//!
//! The article table is a key-value store with composite identity
//! `(ARTICLE_PARTITION, publish_date)`; the slug stored on each record is a
//! derived display attribute, never the key. Queries are paginated range
//! scans over the partition, newest first. The asset bucket accepts opaque
//! binary uploads with public-read visibility and serves them under a
//! public URL.
//!
//! In-process implementations live in [`memory`] and back the test suite
//! and the CLI's dry-run mode; HTTP implementations live in the
//! `inkpost_remote` crate.

pub use self::memory::{MemoryArticleStore, MemoryAssetStore};

mod memory;

use async_trait::async_trait;
use mime::Mime;
use thiserror::Error;
use uuid::Uuid;

use crate::article::{Article, Timestamp};

/// Partition value under which every article row lives.
pub const ARTICLE_PARTITION: &str = "article";

/// Page size used by full list loads.
pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Store API error: status={status}, message={message}")]
    Api { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Response parsing error: {0}")]
    Parsing(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Opaque continuation token for paginated article queries. The contents
/// are meaningful only to the store that issued the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(raw: impl Into<String>) -> Self {
        PageToken(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Range query over the article partition.
#[derive(Debug, Clone)]
pub struct ArticleQuery {
    pub limit: usize,
    pub newest_first: bool,
    pub min_publish_date: Timestamp,
    /// Continuation token from the previous page, exclusive.
    pub start: Option<PageToken>,
}

impl Default for ArticleQuery {
    /// The query a full list load issues: newest first, page size 20,
    /// publish date at least zero.
    fn default() -> Self {
        ArticleQuery {
            limit: PAGE_SIZE,
            newest_first: true,
            min_publish_date: Timestamp::from_millis(0),
            start: None,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct ArticlePage {
    pub items: Vec<Article>,
    /// Token for the next page, absent on the final page.
    pub next: Option<PageToken>,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn query(&self, query: &ArticleQuery) -> Result<ArticlePage, StoreError>;

    /// Full-record replace keyed by `(ARTICLE_PARTITION, publish_date)`.
    async fn put(&self, article: &Article) -> Result<(), StoreError>;

    /// Point delete. Deleting a key that does not exist is not an error.
    async fn delete(&self, publish_date: Timestamp) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Uploads an object with public-read visibility under `key`.
    async fn put_object(
        &self,
        key: &str,
        content_type: &Mime,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError>;

    /// Public URL under which an uploaded key is served.
    fn public_url(&self, key: &str) -> String;
}

/// A file selected for upload: name, declared content type, raw bytes.
#[derive(Debug, Clone)]
pub struct AssetUpload {
    pub file_name: String,
    pub content_type: Mime,
    pub bytes: Vec<u8>,
}

/// Builds the object key for an uploaded file: the configured prefix, a
/// random v4 UUID, and the original file extension verbatim (case
/// preserved, so `photo.PNG` yields a key ending in `.PNG`).
pub fn asset_key(prefix: &str, file_name: &str) -> String {
    let extension = file_name
        .rfind('.')
        .map(|dot| &file_name[dot..])
        .unwrap_or("");
    format!("{prefix}{}{extension}", Uuid::new_v4())
}
