use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use mime::Mime;
use tokio::sync::RwLock;
use tracing::debug;

use crate::article::{Article, Timestamp};

use super::{ArticlePage, ArticleQuery, ArticleStore, AssetStore, PageToken, StoreError};

/// In-process article store with the same ordering and pagination semantics
/// as the remote table. Backs the test suite and the CLI's dry-run mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryArticleStore {
    rows: Arc<RwLock<BTreeMap<i64, Article>>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    pub async fn get(&self, publish_date: Timestamp) -> Option<Article> {
        self.rows.read().await.get(&publish_date.as_millis()).cloned()
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn query(&self, query: &ArticleQuery) -> Result<ArticlePage, StoreError> {
        let rows = self.rows.read().await;

        // Continuation tokens carry the previous page's last key.
        let start = match &query.start {
            Some(token) => Some(token.as_str().parse::<i64>().map_err(|e| {
                StoreError::InvalidRequest(format!("Malformed page token: {e}"))
            })?),
            None => None,
        };

        let mut matched: Vec<&Article> = rows
            .range(query.min_publish_date.as_millis()..)
            .map(|(_, article)| article)
            .collect();
        if query.newest_first {
            matched.reverse();
        }
        if let Some(start) = start {
            // The start key is exclusive.
            matched.retain(|article| {
                let key = article.publish_date.as_millis();
                if query.newest_first { key < start } else { key > start }
            });
        }

        let items: Vec<Article> = matched
            .iter()
            .take(query.limit)
            .map(|article| (*article).clone())
            .collect();
        let next = if matched.len() > query.limit {
            items
                .last()
                .map(|article| PageToken::new(article.publish_date.as_millis().to_string()))
        } else {
            None
        };

        Ok(ArticlePage { items, next })
    }

    async fn put(&self, article: &Article) -> Result<(), StoreError> {
        self.rows
            .write()
            .await
            .insert(article.publish_date.as_millis(), article.clone());
        Ok(())
    }

    async fn delete(&self, publish_date: Timestamp) -> Result<(), StoreError> {
        // Removing a missing key is a no-op, like the remote table.
        self.rows.write().await.remove(&publish_date.as_millis());
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: Mime,
    bytes: Vec<u8>,
}

/// In-process asset store. Objects land in a map; public URLs are built
/// from the configured base.
#[derive(Debug, Clone)]
pub struct MemoryAssetStore {
    public_base: String,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MemoryAssetStore {
    pub fn new(public_base: impl Into<String>) -> Self {
        let mut public_base = public_base.into();
        while public_base.ends_with('/') {
            public_base.pop();
        }
        MemoryAssetStore {
            public_base,
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn object(&self, key: &str) -> Option<(Mime, Vec<u8>)> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|stored| (stored.content_type.clone(), stored.bytes.clone()))
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn put_object(
        &self,
        key: &str,
        content_type: &Mime,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        debug!(key, bytes = bytes.len(), "Storing object in memory");
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.clone(),
                bytes,
            },
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(millis: i64) -> Article {
        Article::new(format!("Post {millis}"), "body", Timestamp::from_millis(millis))
    }

    #[tokio::test]
    async fn query_returns_newest_first() {
        let store = MemoryArticleStore::new();
        for millis in [10, 30, 20] {
            store.put(&article(millis)).await.unwrap();
        }

        let page = store.query(&ArticleQuery::default()).await.unwrap();
        let dates: Vec<i64> = page.items.iter().map(|a| a.publish_date.as_millis()).collect();
        assert_eq!(dates, vec![30, 20, 10]);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn query_paginates_with_exclusive_start_key() {
        let store = MemoryArticleStore::new();
        for millis in 0..25 {
            store.put(&article(millis)).await.unwrap();
        }

        let first = store.query(&ArticleQuery::default()).await.unwrap();
        assert_eq!(first.items.len(), 20);
        assert_eq!(first.items[0].publish_date.as_millis(), 24);
        let token = first.next.expect("a second page exists");

        let second = store
            .query(&ArticleQuery {
                start: Some(token),
                ..ArticleQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(second.items.len(), 5);
        assert_eq!(second.items[0].publish_date.as_millis(), 4);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn query_respects_min_publish_date() {
        let store = MemoryArticleStore::new();
        for millis in [5, 15, 25] {
            store.put(&article(millis)).await.unwrap();
        }

        let page = store
            .query(&ArticleQuery {
                min_publish_date: Timestamp::from_millis(10),
                ..ArticleQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn put_replaces_row_with_same_publish_date() {
        let store = MemoryArticleStore::new();
        store.put(&article(10)).await.unwrap();
        store
            .put(&Article::new("Renamed", "other", Timestamp::from_millis(10)))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        let row = store.get(Timestamp::from_millis(10)).await.unwrap();
        assert_eq!(row.title, "Renamed");
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_ok() {
        let store = MemoryArticleStore::new();
        store.delete(Timestamp::from_millis(999)).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_page_token_is_rejected() {
        let store = MemoryArticleStore::new();
        let result = store
            .query(&ArticleQuery {
                start: Some(PageToken::new("not-a-number")),
                ..ArticleQuery::default()
            })
            .await;
        assert!(matches!(result, Err(StoreError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn asset_store_round_trips_objects() {
        let store = MemoryAssetStore::new("https://assets.example.com/");
        store
            .put_object("uploads/pic.png", &mime::IMAGE_PNG, vec![1, 2, 3])
            .await
            .unwrap();

        let (content_type, bytes) = store.object("uploads/pic.png").await.unwrap();
        assert_eq!(content_type, mime::IMAGE_PNG);
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(
            store.public_url("uploads/pic.png"),
            "https://assets.example.com/uploads/pic.png"
        );
    }
}
