use thiserror::Error;

use crate::article::{Article, Timestamp};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("An edit session is already open")]
    AlreadyEditing,

    #[error("No edit session is open")]
    NotEditing,
}

/// Working copy of an article held by the editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub title: String,
    /// Left empty for new posts and defaulted to "now" at publish time.
    pub publish_date: Option<Timestamp>,
    pub body: String,
}

impl Draft {
    /// The empty draft a "new post" session starts from.
    pub fn blank() -> Self {
        Self::default()
    }
}

impl From<&Article> for Draft {
    fn from(article: &Article) -> Self {
        Draft {
            title: article.title.clone(),
            publish_date: Some(article.publish_date),
            body: article.body.clone(),
        }
    }
}

/// Editor session states: `List` initially, `Editing` while the editor
/// holds a draft. At most one edit session is open at a time; transitions
/// are applied by the [`crate::state`] reducer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditorSession {
    #[default]
    List,
    Editing(Draft),
}

impl EditorSession {
    pub fn is_editing(&self) -> bool {
        matches!(self, EditorSession::Editing(_))
    }

    pub fn draft(&self) -> Option<&Draft> {
        match self {
            EditorSession::Editing(draft) => Some(draft),
            EditorSession::List => None,
        }
    }
}
