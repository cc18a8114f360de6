//! Render every page listed in a website's sitemaps to PDF.
//!
//! [`run`] wires the pieces together: the [`website::Website`] model reads the
//! sitemaps, [`pipeline`] converts their pages through a
//! [`render::RenderBackend`], and [`results`] collects the outcome of every URL.

// Re-export modules
pub mod config;
pub mod error;
pub mod parsers;
pub mod pipeline;
pub mod pool;
pub mod render;
pub mod results;
pub mod sitemap;
pub mod template;
pub mod utils;
pub mod website;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use results::{Report, Status};

use render::webdriver::WebDriverBackend;
use sitemap::HttpFetcher;
use std::path::Path;
use website::Website;

/// Build the website, launch the browser and convert every page.
///
/// Fails only for fatal problems (bad configuration, unreachable site, no
/// browser). Per-page failures are part of the returned [`Report`].
pub async fn run(config: Config) -> Result<Report> {
    let fetcher = HttpFetcher::new();
    let website = Website::build(config, &fetcher).await?;

    if website.sitemaps().is_empty() {
        ::log::warn!("No sitemaps found for {}, nothing to convert", website.root_url());
        return Ok(results::ResultTracker::new().print_results().await);
    }

    let backend = WebDriverBackend::launch(&website.config().browser()).await?;
    let report = pipeline::convert(&website, &backend).await;

    if let Some(path) = &website.config().report_path {
        if let Err(e) = write_report(&report, path).await {
            ::log::error!("{}", e);
        }
    }

    Ok(report)
}

/// Save a report as pretty-printed JSON
pub async fn write_report(report: &Report, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| Error::Configuration(format!("cannot serialize report: {}", e)))?;

    tokio::fs::write(path, json)
        .await
        .map_err(|source| Error::Filesystem {
            path: path.to_path_buf(),
            source,
        })?;

    ::log::info!("Wrote report to {}", path.display());
    Ok(())
}
