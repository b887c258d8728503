use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// URL/DOM-safe identifier derived from an article title.
///
/// A slug is a display and cache key, not the storage identity. Two titles
/// that normalize identically produce the same slug and shadow each other
/// in the cache; the storage key is always the publish date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derives a slug from a title: lowercase, with every character outside
    /// ASCII `a-z0-9` replaced by a hyphen.
    ///
    /// Replacement is per character, not per run: `"Hello, World!"` becomes
    /// `"hello--world-"`. The derivation is idempotent on its own output.
    pub fn from_title(title: &str) -> Self {
        let slug = title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        Slug(slug)
    }

    /// Wraps an already-derived slug read back from storage.
    pub fn from_raw(slug: impl Into<String>) -> Self {
        Slug(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Milliseconds since the Unix epoch. Used both as the article sort key and
/// as the display date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Current wall-clock time. Clocks before the epoch clamp to zero.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Timestamp(millis)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The sole entity: a blog article. The body is raw markdown in every
/// stored and cached form; HTML exists only at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub slug: Slug,
    pub publish_date: Timestamp,
    pub title: String,
    pub body: String,
}

impl Article {
    /// Builds an article, deriving the slug from the title.
    pub fn new(title: impl Into<String>, body: impl Into<String>, publish_date: Timestamp) -> Self {
        let title = title.into();
        Article {
            slug: Slug::from_title(&title),
            publish_date,
            title,
            body: body.into(),
        }
    }
}
