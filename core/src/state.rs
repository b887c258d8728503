//! Application state and the reducer that owns every transition.
//!
//! The original shape of this client kept the cache, the editor visibility
//! and the admin flag as free-floating mutable globals touched from
//! completion callbacks. Here the whole of it lives in one [`AppState`]
//! value and every update goes through [`reduce`], so the ordering of
//! independent completions is something a test can replay deterministically.

use crate::article::Article;
use crate::cache::ArticleCache;
use crate::session::{Draft, EditorSession};

/// Whole-application state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub articles: ArticleCache,
    pub session: EditorSession,
    /// Presentation hint only: whether admin controls should be shown.
    /// Write authorization is enforced by the remote credential policy,
    /// never by this flag.
    pub admin: bool,
}

/// State transitions, one per completed interaction or remote completion.
#[derive(Debug, Clone)]
pub enum Action {
    /// A full list load finished; replaces the cache wholesale.
    ArticlesLoaded(Vec<Article>),
    /// Optimistic insert ahead of the remote acknowledgment.
    ArticleCached(Article),
    EditorOpened(Draft),
    /// Closes the editor regardless of any in-flight write's outcome.
    EditorClosed,
    /// Markdown appended to the open draft after an asset upload.
    BodyAppended(String),
    LoginSucceeded,
    LoggedOut,
}

/// Pure reducer. Invalid transitions (opening the editor twice, appending
/// to a closed editor) leave the state unchanged rather than panicking;
/// callers that care check the session first and surface a session error.
pub fn reduce(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::ArticlesLoaded(articles) => {
            state.articles.clear();
            for article in articles {
                state.articles.insert(article);
            }
        }
        Action::ArticleCached(article) => {
            state.articles.insert(article);
        }
        Action::EditorOpened(draft) => {
            if !state.session.is_editing() {
                state.session = EditorSession::Editing(draft);
            }
        }
        Action::EditorClosed => {
            state.session = EditorSession::List;
        }
        Action::BodyAppended(text) => {
            if let EditorSession::Editing(draft) = &mut state.session {
                draft.body.push_str(&text);
            }
        }
        Action::LoginSucceeded => {
            state.admin = true;
        }
        Action::LoggedOut => {
            state.admin = false;
        }
    }
    state
}
