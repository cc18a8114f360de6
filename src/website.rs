use crate::config::Config;
use crate::error::{Error, Result};
use crate::parsers;
use crate::sitemap::{Fetch, Sitemap};
use crate::template::PdfTemplate;
use url::Url;

/// Location tried when neither the configuration nor robots.txt names a sitemap
pub const DEFAULT_SITEMAP_PATH: &str = "/sitemap.xml";

/// Everything needed to convert one website, resolved before any page is rendered
#[derive(Debug, Clone)]
pub struct Website {
    root_url: Url,
    config: Config,
    template: PdfTemplate,
    sitemaps: Vec<Sitemap>,
}

impl Website {
    /// Validate the configuration, confirm the site answers, load the
    /// header/footer templates and read every sitemap.
    ///
    /// Sitemaps that cannot be fetched are left out with a warning.
    pub async fn build<F: Fetch>(config: Config, fetcher: &F) -> Result<Self> {
        config.validate()?;
        let root_url = Url::parse(&config.url)
            .map_err(|e| Error::Configuration(format!("invalid url '{}': {}", config.url, e)))?;

        fetcher.fetch(&root_url).await.map_err(|e| {
            Error::Configuration(format!("website {} is unreachable: {}", root_url, e.reason))
        })?;
        ::log::info!("Website {} is reachable", root_url);

        let template = PdfTemplate::load(&config.template_dir)?;

        let mut sitemaps = Vec::new();
        for location in sitemap_locations(&root_url, &config, fetcher).await? {
            match Sitemap::build(location, fetcher).await {
                Ok(sitemap) => sitemaps.push(sitemap),
                Err(e) => ::log::warn!("{}", e),
            }
        }

        Ok(Self {
            root_url,
            config,
            template,
            sitemaps,
        })
    }

    /// Assemble a website from parts that are already resolved
    pub fn from_parts(
        root_url: Url,
        config: Config,
        template: PdfTemplate,
        sitemaps: Vec<Sitemap>,
    ) -> Self {
        Self {
            root_url,
            config,
            template,
            sitemaps,
        }
    }

    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn template(&self) -> &PdfTemplate {
        &self.template
    }

    pub fn sitemaps(&self) -> &[Sitemap] {
        &self.sitemaps
    }

    /// Total number of page URLs across all sitemaps
    pub fn page_count(&self) -> usize {
        self.sitemaps.iter().map(|s| s.urls().len()).sum()
    }
}

/// Configured sitemap locations, or the ones robots.txt announces, or the
/// conventional `/sitemap.xml`
async fn sitemap_locations<F: Fetch>(
    root_url: &Url,
    config: &Config,
    fetcher: &F,
) -> Result<Vec<Url>> {
    if !config.sitemaps.is_empty() {
        return config
            .sitemaps
            .iter()
            .map(|location| {
                root_url.join(location).map_err(|e| {
                    Error::Configuration(format!("invalid sitemap '{}': {}", location, e))
                })
            })
            .collect();
    }

    let robots_url = root_url
        .join("/robots.txt")
        .map_err(|e| Error::Configuration(e.to_string()))?;
    match fetcher.fetch(&robots_url).await {
        Ok(robots) => {
            let found: Vec<Url> = parsers::sitemap::robots_sitemaps(&robots)
                .iter()
                .filter_map(|location| root_url.join(location).ok())
                .collect();
            if !found.is_empty() {
                ::log::info!("Found {} sitemaps in {}", found.len(), robots_url);
                return Ok(found);
            }
        }
        Err(e) => ::log::debug!("No robots.txt: {}", e),
    }

    let fallback = root_url
        .join(DEFAULT_SITEMAP_PATH)
        .map_err(|e| Error::Configuration(e.to_string()))?;
    Ok(vec![fallback])
}
