use crate::parsers::SitemapDocument;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Parses a sitemap (`<urlset>`) or sitemap index (`<sitemapindex>`) document.
///
/// Only `<loc>` elements that are direct children of `<url>` or `<sitemap>`
/// are collected, so extension elements such as `<image:loc>` are ignored.
/// Returns an error message for malformed XML or an unknown root element.
pub fn parse(xml: &str) -> Result<SitemapDocument, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<String> = None;
    let mut stack: Vec<String> = Vec::new();
    let mut locations = Vec::new();
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if root.is_none() {
                    root = Some(name.clone());
                }
                if name == "loc" {
                    current.clear();
                }
                stack.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_entry_loc(&stack) {
                    let text = e.unescape().map_err(|err| err.to_string())?;
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if in_entry_loc(&stack) {
                    current.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if in_entry_loc(&stack) {
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locations.push(loc.to_string());
                    }
                    current.clear();
                }
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "invalid XML at position {}: {}",
                    reader.error_position(),
                    e
                ));
            }
            _ => {}
        }
    }

    match root.as_deref() {
        Some("urlset") => Ok(SitemapDocument::UrlSet(locations)),
        Some("sitemapindex") => Ok(SitemapDocument::Index(locations)),
        Some(other) => Err(format!("unexpected root element <{}>", other)),
        None => Err("document has no root element".to_string()),
    }
}

/// True when the innermost open element is a `<loc>` directly inside an entry
fn in_entry_loc(stack: &[String]) -> bool {
    match stack {
        [.., parent, last] => last == "loc" && (parent == "url" || parent == "sitemap"),
        _ => false,
    }
}

/// Collects the `Sitemap:` directives from a robots.txt body
pub fn robots_sitemaps(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let line = line.split('#').next().unwrap_or_default().trim();
            let (key, value) = line.split_once(':')?;
            if key.trim().eq_ignore_ascii_case("sitemap") {
                let value = value.trim();
                (!value.is_empty()).then(|| value.to_string())
            } else {
                None
            }
        })
        .collect()
}
