use std::path::PathBuf;
use url::Url;

/// Filename used when a page has no usable title
pub const DEFAULT_FILENAME: &str = "untitled";

/// Maximum length (in characters) of a safe-mode filename
const MAX_FILENAME_CHARS: usize = 200;

/// Filesystems cap names at 255 bytes; keep room for the `.pdf` extension
const MAX_FILENAME_BYTES: usize = 251;

/// Characters that are rejected by at least one common filesystem
const UNSAFE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

fn is_unsafe(c: char) -> bool {
    UNSAFE_CHARS.contains(&c) || c.is_control()
}

/// Replace unsafe characters in a single path component
fn sanitize_component(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| if is_unsafe(c) { '_' } else { c })
        .collect();

    match cleaned.as_str() {
        "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Derive the relative output directory for a page URL.
///
/// The host (plus a non-default port) becomes the first component and each
/// non-empty path segment becomes a nested directory, so `/blog/post-1`
/// on `example.com` maps to `example.com/blog/post-1`.
pub fn to_file_path(url: &Url) -> PathBuf {
    let mut path = PathBuf::new();

    let host = url.host_str().unwrap_or("unknown-host");
    let host = match url.port() {
        Some(port) => format!("{}_{}", host, port),
        None => host.to_string(),
    };
    path.push(sanitize_component(&host));

    if let Some(segments) = url.path_segments() {
        for segment in segments.filter(|s| !s.is_empty()) {
            path.push(sanitize_component(segment));
        }
    }

    path
}

/// Convert a page title into a PDF filename stem.
///
/// With `safe` set, unsafe characters are stripped, whitespace runs collapse
/// to a single space and leading/trailing dots and spaces are trimmed.
/// Otherwise the title is used as-is. Blank titles become [`DEFAULT_FILENAME`].
pub fn to_filename(title: Option<&str>, safe: bool) -> String {
    let title = match title {
        Some(t) if !t.trim().is_empty() => t,
        _ => return DEFAULT_FILENAME.to_string(),
    };

    if !safe {
        return title.to_string();
    }

    let stripped: String = title.chars().filter(|c| !is_unsafe(*c)).collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c == ' ');

    if trimmed.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }

    // Limit filename length, cutting on a char boundary
    let mut stem = String::new();
    for c in trimmed.chars().take(MAX_FILENAME_CHARS) {
        if stem.len() + c.len_utf8() > MAX_FILENAME_BYTES {
            break;
        }
        stem.push(c);
    }

    stem.trim_end_matches(|c: char| c == '.' || c == ' ')
        .to_string()
}

/// Turn a filename stem into a single path component.
///
/// Raw titles may contain path separators; they become `_` so the PDF
/// always lands in the directory derived from its URL.
pub fn confine_filename(stem: &str) -> String {
    let confined = stem.replace(['/', '\\'], "_");
    if confined.trim().is_empty() {
        return DEFAULT_FILENAME.to_string();
    }
    confined
}
