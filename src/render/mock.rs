//! In-memory rendering backend for tests.

use crate::error::{Error, Result};
use crate::render::{PageHandle, PdfOptions, RenderBackend};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

#[derive(Debug, Default)]
struct MockState {
    open: AtomicUsize,
    peak: AtomicUsize,
    closed: AtomicUsize,
    events: Mutex<Vec<String>>,
    printed: Mutex<Vec<(PathBuf, PdfOptions)>>,
}

/// Backend that "renders" pages by writing a tiny placeholder file
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
    titles: HashMap<String, String>,
    meta: Vec<(String, String)>,
    fail_navigation: HashSet<String>,
    fail_render: HashSet<String>,
    fail_open: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, url: &str, title: &str) -> Self {
        self.titles.insert(url.to_string(), title.to_string());
        self
    }

    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.meta.push((name.to_string(), content.to_string()));
        self
    }

    pub fn failing_navigation(mut self, url: &str) -> Self {
        self.fail_navigation.insert(url.to_string());
        self
    }

    pub fn failing_render(mut self, url: &str) -> Self {
        self.fail_render.insert(url.to_string());
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Most pages ever open at the same time
    pub fn peak_open(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn currently_open(&self) -> usize {
        self.state.open.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// `"start <url>"` / `"end <url>"` entries in the order they happened
    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().unwrap().clone()
    }

    pub fn printed(&self) -> Vec<(PathBuf, PdfOptions)> {
        self.state.printed.lock().unwrap().clone()
    }
}

impl RenderBackend for MockBackend {
    type Page = MockPage;

    async fn new_page(&self) -> Result<MockPage> {
        tokio::task::yield_now().await;
        if self.fail_open {
            return Err(Error::Launch("mock refuses to open pages".into()));
        }

        let open = self.state.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(open, Ordering::SeqCst);

        Ok(MockPage {
            backend: self.clone(),
            url: None,
        })
    }
}

pub struct MockPage {
    backend: MockBackend,
    url: Option<Url>,
}

impl MockPage {
    fn url_str(&self) -> String {
        self.url.as_ref().map(Url::to_string).unwrap_or_default()
    }

    fn log(&self, event: &str) {
        let entry = format!("{} {}", event, self.url_str());
        self.backend.state.events.lock().unwrap().push(entry);
    }
}

impl PageHandle for MockPage {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.url = Some(url.clone());
        self.log("start");
        tokio::task::yield_now().await;

        if self.backend.fail_navigation.contains(url.as_str()) {
            return Err(Error::Navigation {
                url: url.to_string(),
                reason: "mock navigation failure".into(),
            });
        }
        Ok(())
    }

    async fn title(&mut self) -> Result<String> {
        tokio::task::yield_now().await;
        Ok(self
            .backend
            .titles
            .get(&self.url_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn meta_tags(&mut self) -> Result<Vec<(String, String)>> {
        Ok(self.backend.meta.clone())
    }

    async fn print_to_pdf(&mut self, path: &Path, options: &PdfOptions) -> Result<()> {
        tokio::task::yield_now().await;

        let url = self.url_str();
        if self.backend.fail_render.contains(&url) {
            return Err(Error::Render {
                url,
                reason: "mock render failure".into(),
            });
        }

        tokio::fs::write(path, b"%PDF-mock")
            .await
            .map_err(|source| Error::Filesystem {
                path: path.to_path_buf(),
                source,
            })?;

        self.backend
            .state
            .printed
            .lock()
            .unwrap()
            .push((path.to_path_buf(), options.clone()));
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.log("end");
        self.backend.state.open.fetch_sub(1, Ordering::SeqCst);
        self.backend.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
