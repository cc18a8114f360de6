//! Rendering backend: the browser that loads pages and prints them to PDF.
//!
//! The pipeline only sees the [`RenderBackend`] and [`PageHandle`] traits.
//! [`webdriver::WebDriverBackend`] drives a real browser through a WebDriver
//! server; tests use an in-memory mock.

pub mod webdriver;

#[cfg(test)]
pub mod mock;

use crate::config::{Margins, PaperFormat};
use crate::error::Result;
use std::future::Future;
use std::path::Path;
use url::Url;

/// Print settings for one PDF
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub format: PaperFormat,
    pub display_header_footer: bool,
    pub header_template: String,
    pub footer_template: String,
    pub margins: Margins,
    pub print_background: bool,
}

/// Source of isolated page contexts.
///
/// Implementations must allow several pages to be open at once; the
/// pipeline bounds how many.
pub trait RenderBackend {
    type Page: PageHandle;

    /// Open a fresh page context
    fn new_page(&self) -> impl Future<Output = Result<Self::Page>>;
}

/// A single page context, used for exactly one URL
pub trait PageHandle {
    /// Load `url` and wait until the network is idle
    fn navigate(&mut self, url: &Url) -> impl Future<Output = Result<()>>;

    /// Document title of the loaded page
    fn title(&mut self) -> impl Future<Output = Result<String>>;

    /// `(name, content)` of every named `<meta>` tag
    fn meta_tags(&mut self) -> impl Future<Output = Result<Vec<(String, String)>>>;

    /// Print the loaded page to a PDF file at `path`
    fn print_to_pdf(&mut self, path: &Path, options: &PdfOptions)
    -> impl Future<Output = Result<()>>;

    /// Release the page context
    fn close(self) -> impl Future<Output = Result<()>>;
}
