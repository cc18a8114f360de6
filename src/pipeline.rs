use crate::config::Margins;
use crate::error::{Error, Result};
use crate::pool::{self, PoolSummary};
use crate::render::{PageHandle, PdfOptions, RenderBackend};
use crate::results::{Report, ResultTracker, Status};
use crate::sitemap::Sitemap;
use crate::template::PageMetadata;
use crate::utils::{confine_filename, to_file_path, to_filename};
use crate::website::Website;
use std::path::PathBuf;
use std::time::Instant;
use url::Url;

/// Sitemaps are converted one at a time so browser load stays bounded by
/// the per-sitemap page limit.
pub const SITEMAP_CONCURRENCY: usize = 1;

/// Convert every page of `website` and print the summary.
///
/// The summary is printed once both pool levels have drained.
pub async fn convert<B: RenderBackend>(website: &Website, backend: &B) -> Report {
    let tracker = ResultTracker::new();
    Pipeline::new(website, backend, &tracker).run().await;
    tracker.print_results().await
}

/// Two-level conversion: sitemaps in sequence, pages of a sitemap in parallel
pub struct Pipeline<'a, B> {
    website: &'a Website,
    backend: &'a B,
    tracker: &'a ResultTracker,
    margins: Margins,
}

impl<'a, B: RenderBackend> Pipeline<'a, B> {
    pub fn new(website: &'a Website, backend: &'a B, tracker: &'a ResultTracker) -> Self {
        Self {
            website,
            backend,
            tracker,
            margins: website.config().resolved_margins(),
        }
    }

    /// Convert all sitemaps. Per-page failures end up in the tracker.
    pub async fn run(&self) -> PoolSummary {
        let sitemaps = self.website.sitemaps();
        ::log::info!(
            "Converting {} pages from {} sitemaps",
            self.website.page_count(),
            sitemaps.len()
        );

        pool::run_bounded(sitemaps, SITEMAP_CONCURRENCY, |sitemap| {
            self.convert_sitemap(sitemap)
        })
        .await
    }

    async fn convert_sitemap(&self, sitemap: &Sitemap) -> Result<()> {
        if sitemap.is_empty() {
            ::log::warn!("Skipping sitemap {} with no pages", sitemap.root_url());
            return Ok(());
        }

        let concurrency = self.website.config().page_concurrency();
        ::log::info!(
            "Converting sitemap {} ({} pages, {} at a time)",
            sitemap.root_url(),
            sitemap.urls().len(),
            concurrency
        );

        let summary =
            pool::run_bounded(sitemap.urls(), concurrency, |url| self.convert_url(url)).await;

        ::log::info!(
            "Finished sitemap {}: {} printed, {} errored",
            sitemap.root_url(),
            summary.succeeded,
            summary.failed
        );
        Ok(())
    }

    /// Convert one URL and record exactly one outcome for it
    async fn convert_url(&self, url: &Url) -> Result<()> {
        let started = Instant::now();
        let mut file_path = self.website.config().output_dir.join(to_file_path(url));

        let result = match self.backend.new_page().await {
            Ok(mut page) => {
                let result = self.render(&mut page, url, &mut file_path).await;
                // The page is released whatever happened above
                if let Err(e) = page.close().await {
                    ::log::warn!("Failed to release page for {}: {}", url, e);
                }
                result
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => {
                ::log::info!(
                    "Printed {} to {} in {:.2} seconds",
                    url,
                    file_path.display(),
                    started.elapsed().as_secs_f64()
                );
                self.tracker
                    .store_result(url, &file_path, Status::Printed, None)
                    .await;
            }
            Err(e) => {
                ::log::error!("Failed to convert {}: {}", url, e);
                self.tracker
                    .store_result(url, &file_path, Status::Errored, Some(e.to_string()))
                    .await;
            }
        }

        result
    }

    /// Load, inspect and print one page. `file_path` is kept pointing at the
    /// most specific output location known so far.
    async fn render(&self, page: &mut B::Page, url: &Url, file_path: &mut PathBuf) -> Result<()> {
        page.navigate(url).await?;

        let title = page.title().await?;
        let meta_tags = page.meta_tags().await?;
        let date = chrono::Local::now().format("%Y-%m-%d").to_string();
        let metadata = page_metadata(url, &title, &date, meta_tags);

        let (header_template, footer_template) = self.website.template().render(&metadata);

        let config = self.website.config();
        let directory = file_path.clone();
        let filename = confine_filename(&to_filename(Some(&title), config.safe_title));
        *file_path = directory.join(format!("{}.pdf", filename));
        if file_path.parent() != Some(directory.as_path()) {
            return Err(Error::Render {
                url: url.to_string(),
                reason: format!(
                    "title {:?} does not name a file in {}",
                    title,
                    directory.display()
                ),
            });
        }

        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|source| Error::Filesystem {
                path: directory.clone(),
                source,
            })?;

        let options = PdfOptions {
            format: config.format,
            display_header_footer: config.display_header_footer,
            header_template,
            footer_template,
            margins: self.margins.clone(),
            print_background: config.print_background,
        };

        page.print_to_pdf(file_path.as_path(), &options).await
    }
}

/// Build the template metadata for one page.
///
/// `title`, `url` and `date` are always present; named meta tags fill in
/// the rest without overriding those three.
pub fn page_metadata(
    url: &Url,
    title: &str,
    date: &str,
    meta_tags: Vec<(String, String)>,
) -> PageMetadata {
    let mut metadata: PageMetadata = meta_tags.into_iter().collect();
    metadata.insert("title".to_string(), title.to_string());
    metadata.insert("url".to_string(), url.to_string());
    metadata.insert("date".to_string(), date.to_string());
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::render::mock::MockBackend;
    use crate::template::PdfTemplate;
    use std::path::Path;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn sitemap(name: &str, paths: &[&str]) -> Sitemap {
        let base = url("https://example.com/");
        Sitemap::new(
            base.join(name).unwrap(),
            paths.iter().map(|p| base.join(p).unwrap()).collect(),
        )
    }

    fn website(output: &Path, concurrency: usize, sitemaps: Vec<Sitemap>) -> Website {
        let mut config = Config::new("https://example.com/");
        config.output_dir = output.to_path_buf();
        config.concurrency = concurrency;
        Website::from_parts(
            url("https://example.com/"),
            config,
            PdfTemplate::default(),
            sitemaps,
        )
    }

    #[tokio::test]
    async fn test_bounded_pages_per_sitemap() {
        let dir = tempfile::tempdir().unwrap();
        let site = website(
            dir.path(),
            2,
            vec![sitemap("s.xml", &["/1", "/2", "/3", "/4", "/5"])],
        );
        let backend = MockBackend::new();

        let report = convert(&site, &backend).await;

        assert_eq!(report.attempted, 5);
        assert_eq!(report.printed, 5);
        assert!(report.errored.is_empty());
        assert!(backend.peak_open() <= 2);
        assert_eq!(backend.peak_open(), 2);
        assert_eq!(backend.currently_open(), 0);
        assert_eq!(backend.closed(), 5);
    }

    #[tokio::test]
    async fn test_render_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let site = website(dir.path(), 3, vec![sitemap("s.xml", &["/a", "/b", "/c", "/d"])]);
        let backend = MockBackend::new().failing_render("https://example.com/b");

        let tracker = ResultTracker::new();
        Pipeline::new(&site, &backend, &tracker).run().await;
        let report = tracker.report().await;

        assert_eq!(report.attempted, 4);
        assert_eq!(report.printed, 3);
        assert_eq!(report.errored.len(), 1);
        assert_eq!(report.errored[0].url, url("https://example.com/b"));
        assert_eq!(
            report.errored[0].file_path,
            dir.path().join("example.com/b/untitled.pdf")
        );
        // Every page was released, including the failed one
        assert_eq!(backend.closed(), 4);
    }

    #[tokio::test]
    async fn test_navigation_failure_keeps_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        let site = website(dir.path(), 2, vec![sitemap("s.xml", &["/docs/x", "/docs/y"])]);
        let backend = MockBackend::new().failing_navigation("https://example.com/docs/x");

        let tracker = ResultTracker::new();
        Pipeline::new(&site, &backend, &tracker).run().await;
        let report = tracker.report().await;

        assert_eq!(report.printed, 1);
        let failed = &report.errored[0];
        assert_eq!(failed.file_path, dir.path().join("example.com/docs/x"));
        assert!(failed.error.as_deref().unwrap().contains("navigate"));
        assert!(!dir.path().join("example.com/docs/x").exists());
        assert_eq!(backend.closed(), 2);
    }

    #[tokio::test]
    async fn test_sitemaps_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let site = website(
            dir.path(),
            4,
            vec![
                sitemap("a.xml", &["/a1", "/a2", "/a3"]),
                sitemap("b.xml", &["/b1", "/b2", "/b3"]),
            ],
        );
        let backend = MockBackend::new();

        let report = convert(&site, &backend).await;
        assert_eq!(report.attempted, 6);

        let events = backend.events();
        let last_a_end = events
            .iter()
            .rposition(|e| e.starts_with("end https://example.com/a"))
            .unwrap();
        let first_b_start = events
            .iter()
            .position(|e| e.starts_with("start https://example.com/b"))
            .unwrap();
        assert!(last_a_end < first_b_start, "events overlapped: {:?}", events);
    }

    #[tokio::test]
    async fn test_empty_sitemap_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let site = website(
            dir.path(),
            2,
            vec![sitemap("empty.xml", &[]), sitemap("s.xml", &["/only"])],
        );
        let backend = MockBackend::new();

        let report = convert(&site, &backend).await;
        assert_eq!(report.attempted, 1);
        assert_eq!(report.printed, 1);
        assert!(report.errored.is_empty());
    }

    #[tokio::test]
    async fn test_no_sitemaps() {
        let dir = tempfile::tempdir().unwrap();
        let site = website(dir.path(), 2, vec![]);
        let backend = MockBackend::new();

        let report = convert(&site, &backend).await;
        assert_eq!(report.attempted, 0);
        assert!(!report.nothing_printed());
        assert_eq!(backend.closed(), 0);
        assert!(backend.events().is_empty());
    }

    #[tokio::test]
    async fn test_page_open_failure_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let site = website(dir.path(), 2, vec![sitemap("s.xml", &["/x", "/y"])]);
        let backend = MockBackend::new().failing_open();

        let report = convert(&site, &backend).await;
        assert_eq!(report.attempted, 2);
        assert_eq!(report.errored.len(), 2);
        assert!(report.nothing_printed());
    }

    #[tokio::test]
    async fn test_output_path_and_templates() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new("https://example.com/");
        config.output_dir = dir.path().to_path_buf();
        config.display_header_footer = true;
        config.safe_title = true;

        let site = Website::from_parts(
            url("https://example.com/"),
            config,
            PdfTemplate::new(
                "<span>{{title}} by {{author}}</span>",
                "{{url}} {{missing}}<span class=\"pageNumber\"></span>",
            ),
            vec![sitemap("s.xml", &["/blog/post-1"])],
        );
        let backend = MockBackend::new()
            .with_title("https://example.com/blog/post-1", "My Post: Part 1")
            .with_meta("author", "Ada");

        let report = convert(&site, &backend).await;
        assert_eq!(report.printed, 1);

        let expected = dir.path().join("example.com/blog/post-1/My Post Part 1.pdf");
        assert!(expected.exists());

        let printed = backend.printed();
        let (path, options) = &printed[0];
        assert_eq!(path, &expected);
        assert_eq!(options.header_template, "<span>My Post: Part 1 by Ada</span>");
        assert_eq!(
            options.footer_template,
            "https://example.com/blog/post-1 <span class=\"pageNumber\"></span>"
        );
        assert!(options.display_header_footer);
        assert_eq!(options.margins.top, "50px");
        assert_eq!(options.margins.bottom, "50px");
        assert_eq!(options.margins.left, "0px");
    }

    #[tokio::test]
    async fn test_existing_output_is_not_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("example.com/keep.txt");
        std::fs::create_dir_all(keep.parent().unwrap()).unwrap();
        std::fs::write(&keep, "old").unwrap();

        let site = website(dir.path(), 1, vec![sitemap("s.xml", &["/"])]);
        let report = convert(&site, &MockBackend::new()).await;

        assert_eq!(report.printed, 1);
        assert!(keep.exists());
        assert!(dir.path().join("example.com/untitled.pdf").exists());
    }

    #[tokio::test]
    async fn test_raw_titles_stay_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let absolute = format!("{}/escaped", dir.path().display());

        let site = website(&output, 1, vec![sitemap("s.xml", &["/a", "/b", "/c"])]);
        let backend = MockBackend::new()
            .with_title("https://example.com/a", &absolute)
            .with_title("https://example.com/b", "../../escaped")
            .with_title("https://example.com/c", "A/B Testing");

        let report = convert(&site, &backend).await;
        assert_eq!(report.printed, 3);
        assert!(report.errored.is_empty());

        assert!(!dir.path().join("escaped.pdf").exists());
        assert!(!output.join("escaped.pdf").exists());
        for (path, _) in backend.printed() {
            assert!(path.starts_with(output.join("example.com")));
            assert!(path.exists());
        }
        assert!(output.join("example.com/b/.._.._escaped.pdf").exists());
        assert!(output.join("example.com/c/A_B Testing.pdf").exists());
    }

    #[test]
    fn test_page_metadata_reserved_keys() {
        let metadata = page_metadata(
            &url("https://example.com/a"),
            "Real title",
            "2024-05-01",
            vec![
                ("title".to_string(), "Meta title".to_string()),
                ("description".to_string(), "first".to_string()),
                ("description".to_string(), "second".to_string()),
            ],
        );

        assert_eq!(metadata["title"], "Real title");
        assert_eq!(metadata["url"], "https://example.com/a");
        assert_eq!(metadata["date"], "2024-05-01");
        assert_eq!(metadata["description"], "second");
    }
}
