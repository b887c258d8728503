//! Typed rendering of cached articles to HTML fragments.
//!
//! Substitution is never a blind text replace: the metadata placeholders
//! take escaped text and the body placeholder takes HTML that has already
//! passed through the sanitizing markdown converter, so markup smuggled
//! into a title cannot reach the output verbatim.

use crate::article::{Article, Slug, Timestamp};
use crate::cache::ArticleCache;
use crate::markdown::to_sanitized_html;

/// Escapes text for interpolation into an HTML fragment.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// An article reduced to display form: metadata as text, body as sanitized
/// HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArticle {
    pub slug: Slug,
    pub title: String,
    pub publish_date: Timestamp,
    pub body_html: String,
}

impl From<&Article> for RenderedArticle {
    fn from(article: &Article) -> Self {
        RenderedArticle {
            slug: article.slug.clone(),
            title: article.title.clone(),
            publish_date: article.publish_date,
            body_html: to_sanitized_html(&article.body),
        }
    }
}

/// Default fragment markup. Each rendered article is a container whose `id`
/// is the slug, with `.title`, `.publishDate` and `.body` elements and the
/// edit/delete controls.
pub const DEFAULT_TEMPLATE: &str = "<article id=\"{{slug}}\">\n  \
<h2 class=\"title\">{{title}}</h2>\n  \
<time class=\"publishDate\">{{publishDate}}</time>\n  \
<div class=\"body\">{{body}}</div>\n  \
<a class=\"edit-button\" href=\"#edit/{{slug}}\">edit</a>\n  \
<a class=\"delete-button\" href=\"#delete/{{slug}}\">delete</a>\n\
</article>\n";

/// Fragment template with `{{slug}}`, `{{title}}`, `{{publishDate}}` and
/// `{{body}}` placeholders.
#[derive(Debug, Clone)]
pub struct ArticleTemplate {
    template: String,
}

impl Default for ArticleTemplate {
    fn default() -> Self {
        ArticleTemplate::new(DEFAULT_TEMPLATE)
    }
}

impl ArticleTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        ArticleTemplate {
            template: template.into(),
        }
    }

    /// Renders one article. Slug, title and date are escaped; the body is
    /// inserted as-is, since it is already sanitized converter output.
    /// Unknown placeholders pass through untouched, and placeholder-like
    /// text inside substituted values is never re-expanded.
    pub fn render(&self, article: &RenderedArticle) -> String {
        let mut out = String::with_capacity(self.template.len() + article.body_html.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    match &after[..end] {
                        "slug" => out.push_str(&escape_html(article.slug.as_str())),
                        "title" => out.push_str(&escape_html(&article.title)),
                        "publishDate" => {
                            out.push_str(&escape_html(&article.publish_date.to_string()))
                        }
                        "body" => out.push_str(&article.body_html),
                        other => {
                            out.push_str("{{");
                            out.push_str(other);
                            out.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    out.push_str("{{");
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// One rendered article in the list. Node identity is stable across
/// in-place patches, which is what distinguishes a patch from a rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleNode {
    id: u64,
    pub slug: Slug,
    pub rendered: RenderedArticle,
}

impl ArticleNode {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Ordered list of article nodes keyed by slug: the client-side stand-in
/// for the rendered article list.
#[derive(Debug, Clone, Default)]
pub struct ArticleListView {
    nodes: Vec<ArticleNode>,
    next_id: u64,
}

impl ArticleListView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Discards every node and renders the cache afresh in its iteration
    /// order. All nodes get new identities.
    pub fn rebuild(&mut self, cache: &ArticleCache) {
        self.nodes.clear();
        for article in cache.iter() {
            self.push_node(RenderedArticle::from(article));
        }
    }

    /// Appends an already-rendered article at the end of the list.
    pub fn append(&mut self, rendered: RenderedArticle) {
        self.push_node(rendered);
    }

    /// Patches the title and body of the node at `slug` in place; identity
    /// and position are preserved. Returns `false` when no node matches.
    pub fn patch(&mut self, slug: &Slug, title: &str, body_html: &str) -> bool {
        match self.nodes.iter_mut().find(|node| &node.slug == slug) {
            Some(node) => {
                node.rendered.title = title.to_string();
                node.rendered.body_html = body_html.to_string();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, slug: &Slug) -> bool {
        self.nodes.iter().any(|node| &node.slug == slug)
    }

    pub fn node(&self, slug: &Slug) -> Option<&ArticleNode> {
        self.nodes.iter().find(|node| &node.slug == slug)
    }

    pub fn nodes(&self) -> &[ArticleNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Concatenates every node's fragment in list order.
    pub fn to_html(&self, template: &ArticleTemplate) -> String {
        self.nodes
            .iter()
            .map(|node| template.render(&node.rendered))
            .collect()
    }

    fn push_node(&mut self, rendered: RenderedArticle) {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.push(ArticleNode {
            id,
            slug: rendered.slug.clone(),
            rendered,
        });
    }
}
