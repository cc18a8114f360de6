pub mod html;
pub mod sitemap;


/// Kind of document a sitemap location points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A `<urlset>` listing page locations
    UrlSet(Vec<String>),
    /// A `<sitemapindex>` listing further sitemap locations
    Index(Vec<String>),
}
