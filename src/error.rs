use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a website or converting its pages.
///
/// `Configuration` and `Launch` are fatal and stop the run before any page
/// is touched. `SitemapFetch` drops a single sitemap. The remaining variants
/// only ever affect the URL being converted.
#[derive(Debug, Error)]
pub enum Error {
    /// The run cannot start with the given settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A sitemap document could not be fetched or parsed.
    #[error("failed to fetch sitemap '{url}': {reason}")]
    SitemapFetch { url: String, reason: String },

    /// No WebDriver session could be opened.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("failed to navigate to '{url}': {reason}")]
    Navigation { url: String, reason: String },

    #[error("failed to render '{url}': {reason}")]
    Render { url: String, reason: String },

    #[error("filesystem error at '{}': {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// True for errors that abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::Launch(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
