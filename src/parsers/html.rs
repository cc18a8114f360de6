use scraper::{Html, Selector};
use std::sync::LazyLock;

static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name]").unwrap());
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

/// Extracts `(name, content)` pairs for every `<meta name=...>` tag.
///
/// Tags with an empty name are skipped; a missing `content` attribute is
/// reported as an empty string.
pub fn meta_tags(html: &str) -> Vec<(String, String)> {
    let doc = Html::parse_document(html);

    let tags = doc
        .select(&META_SELECTOR)
        .filter_map(|e| {
            let name = e.value().attr("name")?.trim();
            if name.is_empty() {
                return None;
            }
            let content = e.value().attr("content").unwrap_or_default();
            Some((name.to_string(), content.to_string()))
        })
        .collect::<Vec<_>>();

    ::log::trace!("HTML parser found {} named meta tags", tags.len());
    tags
}

/// Returns the document `<title>` text with whitespace collapsed
pub fn title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&TITLE_SELECTOR)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() { None } else { Some(title) }
}
