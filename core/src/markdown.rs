use pulldown_cmark::{Event, Options, Parser, html};

/// Converts markdown source to HTML with raw HTML stripped.
///
/// The stored form of an article body is always raw markdown; HTML exists
/// only at display time. Raw HTML embedded in the source, script and style
/// tags included, is dropped rather than passed through, so the output
/// contains only markup produced by the converter itself.
pub fn to_sanitized_html(source: &str) -> String {
    let events = parser(source).filter(|event| !matches!(event, Event::Html(_) | Event::InlineHtml(_)));
    let mut out = String::new();
    html::push_html(&mut out, events);
    out
}

/// Markdown image reference appended to the editor body after an upload.
pub fn image_reference(url: &str) -> String {
    format!("\n\n![]({url})\n\n")
}

fn parser(source: &str) -> Parser<'_> {
    let options: Options = [Options::ENABLE_GFM, Options::ENABLE_STRIKETHROUGH]
        .into_iter()
        .collect();

    Parser::new_ext(source, options)
}
