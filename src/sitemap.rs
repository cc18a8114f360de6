use crate::error::{Error, Result};
use crate::parsers::{self, SitemapDocument};
use std::collections::HashSet;
use std::future::Future;
use url::Url;

/// How many levels of nested sitemap indexes are followed
pub const MAX_INDEX_DEPTH: usize = 3;

/// A failed fetch of a remote document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{url}: {reason}")]
pub struct FetchError {
    pub url: String,
    pub reason: String,
}

/// Source of remote text documents (sitemaps, robots.txt, the site root)
pub trait Fetch {
    fn fetch(&self, url: &Url) -> impl Future<Output = std::result::Result<String, FetchError>>;
}

/// [`Fetch`] implementation over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<String, FetchError> {
        let fail = |reason: String| FetchError {
            url: url.to_string(),
            reason,
        };

        ::log::debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?
            .error_for_status()
            .map_err(|e| fail(e.to_string()))?;

        response.text().await.map_err(|e| fail(e.to_string()))
    }
}

/// One sitemap location and the page URLs it lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sitemap {
    root_url: Url,
    urls: Vec<Url>,
}

impl Sitemap {
    pub fn new(root_url: Url, urls: Vec<Url>) -> Self {
        Self { root_url, urls }
    }

    /// Fetch and parse the sitemap at `root_url`.
    ///
    /// Sitemap indexes are followed up to [`MAX_INDEX_DEPTH`] levels and their
    /// children's URLs are appended in document order. A child that fails is
    /// skipped with a warning; only a failure of `root_url` itself is an error.
    pub async fn build<F: Fetch>(root_url: Url, fetcher: &F) -> Result<Self> {
        ::log::info!("Reading sitemap {}", root_url);

        let document = fetch_document(&root_url, fetcher).await?;
        let mut visited = HashSet::from([root_url.to_string()]);
        let mut urls = Vec::new();

        // Depth-first over nested indexes, keeping document order
        let mut pending = vec![(root_url.clone(), document, 0usize)];
        while let Some((location, document, depth)) = pending.pop() {
            match document {
                SitemapDocument::UrlSet(locs) => {
                    urls.extend(resolve_all(&location, &locs));
                }
                SitemapDocument::Index(locs) if depth >= MAX_INDEX_DEPTH => {
                    ::log::warn!(
                        "Sitemap index {} is nested too deeply, skipping {} entries",
                        location,
                        locs.len()
                    );
                }
                SitemapDocument::Index(locs) => {
                    let mut children = Vec::new();
                    for child in resolve_all(&location, &locs) {
                        if !visited.insert(child.to_string()) {
                            ::log::debug!("Skipping already visited sitemap {}", child);
                            continue;
                        }
                        match fetch_document(&child, fetcher).await {
                            Ok(doc) => children.push((child, doc, depth + 1)),
                            Err(e) => ::log::warn!("{}", e),
                        }
                    }
                    // Reverse so the first child is popped first
                    pending.extend(children.into_iter().rev());
                }
            }
        }

        if urls.is_empty() {
            ::log::warn!("Sitemap {} lists no pages", root_url);
        } else {
            ::log::info!("Sitemap {} lists {} pages", root_url, urls.len());
        }

        Ok(Self { root_url, urls })
    }

    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

async fn fetch_document<F: Fetch>(url: &Url, fetcher: &F) -> Result<SitemapDocument> {
    let body = fetcher.fetch(url).await.map_err(|e| Error::SitemapFetch {
        url: url.to_string(),
        reason: e.reason,
    })?;

    parsers::sitemap::parse(&body).map_err(|reason| Error::SitemapFetch {
        url: url.to_string(),
        reason,
    })
}

/// Resolve `<loc>` values against the document they came from
fn resolve_all(base: &Url, locs: &[String]) -> Vec<Url> {
    locs.iter()
        .filter_map(|loc| match base.join(loc) {
            Ok(url) => Some(url),
            Err(e) => {
                ::log::warn!("Skipping invalid location '{}' in {}: {}", loc, base, e);
                None
            }
        })
        .collect()
}
