//! The blog client: wires the stores, the broker, the reducer and the view
//! into the load/publish/delete/upload flows.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::article::{Article, Slug, Timestamp};
use crate::auth::{AuthError, CredentialsCell, IdentityBroker, WebIdentityToken};
use crate::markdown::image_reference;
use crate::render::{ArticleListView, ArticleTemplate, RenderedArticle};
use crate::session::{Draft, SessionError};
use crate::state::{Action, AppState, reduce};
use crate::store::{
    ArticleQuery, ArticleStore, AssetStore, AssetUpload, StoreError, asset_key,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("No cached article for slug '{0}'")]
    UnknownSlug(Slug),
}

/// A fire-and-forget write being tracked until the remote acknowledgment.
///
/// While the handle's entry sits in the pending registry, a full reload
/// re-applies the optimistic article on top of whatever the store returned,
/// so the reload cannot clobber a not-yet-acknowledged edit. Callers may
/// await the acknowledgment or abandon the write.
#[derive(Debug)]
pub struct PendingPublish {
    slug: Slug,
    handle: JoinHandle<Result<(), StoreError>>,
    registry: PendingRegistry,
}

impl PendingPublish {
    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    /// Waits for the remote write to settle.
    pub async fn acknowledged(self) -> Result<(), ClientError> {
        match self.handle.await {
            Ok(result) => result.map_err(ClientError::from),
            Err(join_error) => Err(ClientError::Store(StoreError::Network(Box::new(
                join_error,
            )))),
        }
    }

    /// Abandons the in-flight write without waiting for it. The registry
    /// entry goes with it, so later reloads show the store's row instead
    /// of the abandoned edit.
    pub async fn cancel(self) {
        self.handle.abort();
        self.registry.lock().await.remove(&self.slug);
    }
}

type PendingRegistry = Arc<Mutex<HashMap<Slug, Article>>>;

/// Client for a markdown blog stored directly in cloud storage.
///
/// Reads go through the anonymous `reader` handle; writes go through the
/// `writer`, whose requests carry whatever the shared [`CredentialsCell`]
/// holds. All state transitions are reducer applications over
/// [`AppState`]; the [`ArticleListView`] tracks what a rendered list would
/// show, including in-place patches of existing slugs.
pub struct BlogClient {
    reader: Arc<dyn ArticleStore>,
    writer: Arc<dyn ArticleStore>,
    assets: Arc<dyn AssetStore>,
    broker: Arc<dyn IdentityBroker>,
    credentials: CredentialsCell,
    template: ArticleTemplate,
    asset_prefix: String,
    state: AppState,
    view: ArticleListView,
    pending: PendingRegistry,
}

impl BlogClient {
    pub fn new(
        reader: Arc<dyn ArticleStore>,
        writer: Arc<dyn ArticleStore>,
        assets: Arc<dyn AssetStore>,
        broker: Arc<dyn IdentityBroker>,
        credentials: CredentialsCell,
        asset_prefix: impl Into<String>,
    ) -> Self {
        BlogClient {
            reader,
            writer,
            assets,
            broker,
            credentials,
            template: ArticleTemplate::default(),
            asset_prefix: asset_prefix.into(),
            state: AppState::default(),
            view: ArticleListView::new(),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn with_template(mut self, template: ArticleTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> &ArticleListView {
        &self.view
    }

    /// Presentation hint: whether admin controls should be shown. Never an
    /// authorization decision.
    pub fn is_admin(&self) -> bool {
        self.state.admin
    }

    /// Renders the current view to an HTML fragment string.
    pub fn render_html(&self) -> String {
        self.view.to_html(&self.template)
    }

    /// Clears the cache and view, pages through the article table newest
    /// first, buffering every page, and renders only once the final page
    /// has been consumed. A failed page surfaces as an error and leaves
    /// the cache cleared, so a partial load is never rendered.
    #[instrument(skip(self))]
    pub async fn load_articles(&mut self) -> Result<(), ClientError> {
        self.dispatch(Action::ArticlesLoaded(Vec::new()));
        self.view.clear();

        let mut buffered = Vec::new();
        let mut query = ArticleQuery::default();
        loop {
            let page = self.reader.query(&query).await?;
            debug!(
                items = page.items.len(),
                has_next = page.next.is_some(),
                "Consumed article page"
            );
            buffered.extend(page.items);
            match page.next {
                Some(token) => query.start = Some(token),
                None => break,
            }
        }
        self.dispatch(Action::ArticlesLoaded(buffered));

        // Unacknowledged optimistic publishes overlay the fresh load.
        let pending: Vec<Article> = self.pending.lock().await.values().cloned().collect();
        for article in pending {
            self.dispatch(Action::ArticleCached(article));
        }

        self.view.rebuild(&self.state.articles);
        Ok(())
    }

    /// Opens the editor on `draft`. A blank draft is a "new post"; a
    /// pre-populated one is an "edit".
    pub fn open_editor(&mut self, draft: Draft) -> Result<(), ClientError> {
        if self.state.session.is_editing() {
            return Err(SessionError::AlreadyEditing.into());
        }
        self.dispatch(Action::EditorOpened(draft));
        Ok(())
    }

    /// Opens the editor on a blank draft.
    pub fn new_post(&mut self) -> Result<(), ClientError> {
        self.open_editor(Draft::blank())
    }

    /// Opens the editor pre-populated from the cached article at `slug`.
    pub fn edit(&mut self, slug: &Slug) -> Result<(), ClientError> {
        if self.state.session.is_editing() {
            return Err(SessionError::AlreadyEditing.into());
        }
        let draft = self
            .state
            .articles
            .get(slug)
            .map(Draft::from)
            .ok_or_else(|| ClientError::UnknownSlug(slug.clone()))?;
        self.dispatch(Action::EditorOpened(draft));
        Ok(())
    }

    /// Closes the editor without publishing.
    pub fn cancel_edit(&mut self) -> Result<(), ClientError> {
        if !self.state.session.is_editing() {
            return Err(SessionError::NotEditing.into());
        }
        self.dispatch(Action::EditorClosed);
        Ok(())
    }

    /// Publishes the draft held by the open editor.
    ///
    /// The slug comes from the title and the date defaults to now. The
    /// cache is updated and the editor closed before the remote write
    /// settles. A slug the view already shows is patched in place with a
    /// fire-and-forget write, returned as a [`PendingPublish`]; a new slug
    /// awaits the write and then runs a full reload, returning `None`.
    #[instrument(skip(self))]
    pub async fn publish(&mut self) -> Result<Option<PendingPublish>, ClientError> {
        let draft = match self.state.session.draft() {
            Some(draft) => draft.clone(),
            None => return Err(SessionError::NotEditing.into()),
        };

        let publish_date = draft.publish_date.unwrap_or_else(Timestamp::now);
        let article = Article::new(draft.title, draft.body, publish_date);
        let slug = article.slug.clone();
        debug!(slug = %slug, publish_date = %publish_date, "Publishing article");

        self.dispatch(Action::ArticleCached(article.clone()));
        self.dispatch(Action::EditorClosed);

        if self.view.contains(&slug) {
            let rendered = RenderedArticle::from(&article);
            self.view.patch(&slug, &rendered.title, &rendered.body_html);

            self.pending.lock().await.insert(slug.clone(), article.clone());
            let writer = Arc::clone(&self.writer);
            let pending = Arc::clone(&self.pending);
            let task_slug = slug.clone();
            let handle = tokio::spawn(async move {
                let result = writer.put(&article).await;
                if let Err(error) = &result {
                    warn!(slug = %task_slug, error = %error, "Article write failed");
                }
                pending.lock().await.remove(&task_slug);
                result
            });
            Ok(Some(PendingPublish {
                slug,
                handle,
                registry: Arc::clone(&self.pending),
            }))
        } else {
            self.writer.put(&article).await?;
            self.load_articles().await?;
            Ok(None)
        }
    }

    /// Deletes by publish date, then always reloads, even when the delete
    /// failed or the key never existed. A delete error is surfaced after
    /// the reload (and takes precedence when the reload fails too). There
    /// is no optimistic local removal.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, publish_date: Timestamp) -> Result<(), ClientError> {
        let outcome = self.writer.delete(publish_date).await;
        if let Err(error) = &outcome {
            warn!(publish_date = %publish_date, error = %error, "Article delete failed");
        }
        let reload = self.load_articles().await;
        match outcome {
            Ok(()) => reload,
            Err(delete_error) => {
                if let Err(reload_error) = reload {
                    warn!(error = %reload_error, "Reload after failed delete also failed");
                }
                Err(delete_error.into())
            }
        }
    }

    /// Uploads a file public-read and appends a markdown image reference
    /// to the open draft's body. On failure the body is left untouched.
    #[instrument(skip(self, upload), fields(file = %upload.file_name))]
    pub async fn upload_asset(&mut self, upload: AssetUpload) -> Result<String, ClientError> {
        if !self.state.session.is_editing() {
            return Err(SessionError::NotEditing.into());
        }

        let key = asset_key(&self.asset_prefix, &upload.file_name);
        self.assets
            .put_object(&key, &upload.content_type, upload.bytes)
            .await?;

        let url = self.assets.public_url(&key);
        self.dispatch(Action::BodyAppended(image_reference(&url)));
        debug!(key = %key, "Asset uploaded");
        Ok(url)
    }

    /// Exchanges the identity-provider token for temporary write-scoped
    /// credentials. Success fills the shared credentials cell and shows
    /// the admin controls; failure clears both.
    #[instrument(skip(self, token))]
    pub async fn login(&mut self, token: &WebIdentityToken) -> Result<(), ClientError> {
        match self.broker.exchange(token).await {
            Ok(credentials) => {
                self.credentials.set(credentials).await;
                self.dispatch(Action::LoginSucceeded);
                debug!("Logged into application as administrator");
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "Error logging into application");
                self.credentials.clear().await;
                self.dispatch(Action::LoggedOut);
                Err(error.into())
            }
        }
    }

    /// Drops the credentials and hides the admin controls.
    pub async fn logout(&mut self) {
        self.credentials.clear().await;
        self.dispatch(Action::LoggedOut);
    }

    fn dispatch(&mut self, action: Action) {
        self.state = reduce(std::mem::take(&mut self.state), action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticBroker;
    use crate::store::{
        ArticlePage, MemoryArticleStore, MemoryAssetStore,
    };
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn client_over(articles: MemoryArticleStore) -> BlogClient {
        let store = Arc::new(articles);
        BlogClient::new(
            store.clone(),
            store,
            Arc::new(MemoryAssetStore::new("https://assets.example.com")),
            Arc::new(StaticBroker::default()),
            CredentialsCell::new(),
            "assets/",
        )
    }

    /// Store whose queries and deletes always fail, for the surfaced-error
    /// paths.
    struct BrokenStore;

    #[async_trait]
    impl ArticleStore for BrokenStore {
        async fn query(&self, _query: &ArticleQuery) -> Result<ArticlePage, StoreError> {
            Err(StoreError::Api {
                status: 500,
                message: "query boom".to_string(),
            })
        }

        async fn put(&self, _article: &Article) -> Result<(), StoreError> {
            Ok(())
        }

        async fn delete(&self, _publish_date: Timestamp) -> Result<(), StoreError> {
            Err(StoreError::Api {
                status: 500,
                message: "delete boom".to_string(),
            })
        }
    }

    /// Store whose writes block until released, to hold a publish in
    /// flight across a reload.
    struct StallingStore {
        inner: MemoryArticleStore,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ArticleStore for StallingStore {
        async fn query(&self, query: &ArticleQuery) -> Result<ArticlePage, StoreError> {
            self.inner.query(query).await
        }

        async fn put(&self, article: &Article) -> Result<(), StoreError> {
            self.gate.notified().await;
            self.inner.put(article).await
        }

        async fn delete(&self, publish_date: Timestamp) -> Result<(), StoreError> {
            self.inner.delete(publish_date).await
        }
    }

    #[tokio::test]
    async fn failed_load_surfaces_and_leaves_nothing_rendered() {
        let mut client = BlogClient::new(
            Arc::new(BrokenStore),
            Arc::new(BrokenStore),
            Arc::new(MemoryAssetStore::new("https://assets.example.com")),
            Arc::new(StaticBroker::default()),
            CredentialsCell::new(),
            "assets/",
        );

        let result = client.load_articles().await;
        assert!(matches!(
            result,
            Err(ClientError::Store(StoreError::Api { status: 500, .. }))
        ));
        assert!(client.state().articles.is_empty());
        assert!(client.view().is_empty());
        assert_eq!(client.render_html(), "");
    }

    #[tokio::test]
    async fn publish_without_an_open_editor_is_a_session_error() {
        let mut client = client_over(MemoryArticleStore::new());
        let result = client.publish().await;
        assert!(matches!(
            result,
            Err(ClientError::Session(SessionError::NotEditing))
        ));
    }

    #[tokio::test]
    async fn opening_the_editor_twice_is_rejected() {
        let mut client = client_over(MemoryArticleStore::new());
        client.new_post().unwrap();
        assert!(matches!(
            client.new_post(),
            Err(ClientError::Session(SessionError::AlreadyEditing))
        ));
        client.cancel_edit().unwrap();
        assert!(matches!(
            client.cancel_edit(),
            Err(ClientError::Session(SessionError::NotEditing))
        ));
    }

    #[tokio::test]
    async fn edit_of_an_uncached_slug_is_rejected() {
        let mut client = client_over(MemoryArticleStore::new());
        let result = client.edit(&Slug::from_title("ghost"));
        assert!(matches!(result, Err(ClientError::UnknownSlug(_))));
    }

    #[tokio::test]
    async fn upload_without_an_open_editor_leaves_the_store_untouched() {
        let assets = MemoryAssetStore::new("https://assets.example.com");
        let store = Arc::new(MemoryArticleStore::new());
        let mut client = BlogClient::new(
            store.clone(),
            store,
            Arc::new(assets.clone()),
            Arc::new(StaticBroker::default()),
            CredentialsCell::new(),
            "assets/",
        );

        let result = client
            .upload_asset(AssetUpload {
                file_name: "pic.png".to_string(),
                content_type: mime::IMAGE_PNG,
                bytes: vec![0],
            })
            .await;
        assert!(matches!(
            result,
            Err(ClientError::Session(SessionError::NotEditing))
        ));
        assert_eq!(assets.len().await, 0);
    }

    #[tokio::test]
    async fn login_fills_the_shared_credentials_cell() {
        let credentials = CredentialsCell::new();
        let store = Arc::new(MemoryArticleStore::new());
        let mut client = BlogClient::new(
            store.clone(),
            store,
            Arc::new(MemoryAssetStore::new("https://assets.example.com")),
            Arc::new(StaticBroker::default()),
            credentials.clone(),
            "assets/",
        );

        client
            .login(&WebIdentityToken::new("token"))
            .await
            .unwrap();
        assert!(client.is_admin());
        assert!(credentials.is_present().await);

        client.logout().await;
        assert!(!client.is_admin());
        assert!(!credentials.is_present().await);
    }

    #[tokio::test]
    async fn reload_does_not_clobber_an_unacknowledged_patch() {
        let inner = MemoryArticleStore::new();
        let seeded = Article::new("Hello", "old body", Timestamp::from_millis(1_000));
        inner.put(&seeded).await.unwrap();

        let gate = Arc::new(Notify::new());
        let writer = StallingStore {
            inner: inner.clone(),
            gate: gate.clone(),
        };
        let mut client = BlogClient::new(
            Arc::new(inner.clone()),
            Arc::new(writer),
            Arc::new(MemoryAssetStore::new("https://assets.example.com")),
            Arc::new(StaticBroker::default()),
            CredentialsCell::new(),
            "assets/",
        );

        client.load_articles().await.unwrap();
        client
            .open_editor(Draft {
                title: "Hello".to_string(),
                publish_date: Some(Timestamp::from_millis(1_000)),
                body: "new body".to_string(),
            })
            .unwrap();
        let pending = client
            .publish()
            .await
            .unwrap()
            .expect("existing slug should be a tracked in-place patch");

        // The write is still stalled; a reload sees the old row but must
        // keep showing the optimistic edit.
        client.load_articles().await.unwrap();
        let slug = Slug::from_title("Hello");
        assert_eq!(client.state().articles.get(&slug).unwrap().body, "new body");

        gate.notify_one();
        pending.acknowledged().await.unwrap();
        assert_eq!(
            inner.get(Timestamp::from_millis(1_000)).await.unwrap().body,
            "new body"
        );
    }

    #[tokio::test]
    async fn cancelled_publish_never_reaches_the_store() {
        let inner = MemoryArticleStore::new();
        let seeded = Article::new("Hello", "old body", Timestamp::from_millis(1_000));
        inner.put(&seeded).await.unwrap();

        let gate = Arc::new(Notify::new());
        let writer = StallingStore {
            inner: inner.clone(),
            gate: gate.clone(),
        };
        let mut client = BlogClient::new(
            Arc::new(inner.clone()),
            Arc::new(writer),
            Arc::new(MemoryAssetStore::new("https://assets.example.com")),
            Arc::new(StaticBroker::default()),
            CredentialsCell::new(),
            "assets/",
        );

        client.load_articles().await.unwrap();
        client
            .open_editor(Draft {
                title: "Hello".to_string(),
                publish_date: Some(Timestamp::from_millis(1_000)),
                body: "abandoned edit".to_string(),
            })
            .unwrap();
        let pending = client.publish().await.unwrap().unwrap();
        pending.cancel().await;
        gate.notify_one();

        // Give the aborted task a chance to run if it was going to.
        tokio::task::yield_now().await;
        assert_eq!(
            inner.get(Timestamp::from_millis(1_000)).await.unwrap().body,
            "old body"
        );

        // The registry entry went with the cancellation, so reloads show
        // the store's row instead of re-overlaying the abandoned edit.
        let slug = Slug::from_title("Hello");
        client.load_articles().await.unwrap();
        client.load_articles().await.unwrap();
        assert_eq!(client.state().articles.get(&slug).unwrap().body, "old body");
    }

    #[tokio::test]
    async fn failed_delete_error_survives_a_failed_reload() {
        let mut client = BlogClient::new(
            Arc::new(BrokenStore),
            Arc::new(BrokenStore),
            Arc::new(MemoryAssetStore::new("https://assets.example.com")),
            Arc::new(StaticBroker::default()),
            CredentialsCell::new(),
            "assets/",
        );

        let result = client.delete(Timestamp::from_millis(1)).await;
        assert!(matches!(
            result,
            Err(ClientError::Store(StoreError::Api { status: 500, message })) if message == "delete boom"
        ));
    }
}
