use indexmap::IndexMap;

use crate::article::{Article, Slug};

/// Insertion-ordered slug → article map, rebuilt wholesale on every full
/// list load; there is no incremental sync. Iteration order is the order
/// the store returned the articles in (newest first), and re-inserting an
/// existing slug replaces the record while keeping its position.
#[derive(Debug, Clone, Default)]
pub struct ArticleCache {
    entries: IndexMap<Slug, Article>,
}

impl ArticleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn insert(&mut self, article: Article) {
        self.entries.insert(article.slug.clone(), article);
    }

    pub fn get(&self, slug: &Slug) -> Option<&Article> {
        self.entries.get(slug)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.entries.values()
    }

    pub fn slugs(&self) -> impl Iterator<Item = &Slug> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::Timestamp;

    fn article(title: &str, millis: i64) -> Article {
        Article::new(title, "body", Timestamp::from_millis(millis))
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut cache = ArticleCache::new();
        cache.insert(article("Charlie", 3));
        cache.insert(article("Alpha", 1));
        cache.insert(article("Bravo", 2));

        let titles: Vec<&str> = cache.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Charlie", "Alpha", "Bravo"]);
    }

    #[test]
    fn reinserting_a_slug_replaces_but_keeps_position() {
        let mut cache = ArticleCache::new();
        cache.insert(article("One", 1));
        cache.insert(article("Two", 2));
        cache.insert(Article::new("One", "updated", Timestamp::from_millis(1)));

        assert_eq!(cache.len(), 2);
        let first = cache.iter().next().unwrap();
        assert_eq!(first.title, "One");
        assert_eq!(first.body, "updated");
    }

    #[test]
    fn clear_discards_everything() {
        let mut cache = ArticleCache::new();
        cache.insert(article("One", 1));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&Slug::from_title("One")).is_none());
    }
}
