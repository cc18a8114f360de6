use crate::config::BrowserConfig;
use crate::error::{Error, Result};
use crate::parsers::html;
use crate::render::{PageHandle, PdfOptions, RenderBackend};
use fantoccini::wd::{Capabilities, PrintConfiguration, PrintMargins, PrintSize};
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Common local WebDriver endpoints tried when the configured one is down
const FALLBACK_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// Page load timeout sent to the driver; large enough to never fire in practice
const PAGE_LOAD_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

/// The resource count must stay unchanged for this long to count as idle
const IDLE_WINDOW: Duration = Duration::from_millis(500);

const IDLE_PROBE: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

const INJECT_HEADER_FOOTER: &str = r#"
const [header, footer, top, bottom] = arguments;
function place(markup, edge, height) {
    if (!markup) { return; }
    const el = document.createElement('div');
    el.innerHTML = markup;
    el.style.cssText = 'position:fixed;left:0;right:0;overflow:hidden;z-index:2147483647;'
        + edge + ':0;height:' + height + ';';
    document.body.appendChild(el);
}
place(header, 'top', top);
place(footer, 'bottom', bottom);
"#;

/// Rendering backend that opens one WebDriver session per page
#[derive(Debug, Clone)]
pub struct WebDriverBackend {
    webdriver_url: String,
    capabilities: Capabilities,
}

impl WebDriverBackend {
    /// Connects to the WebDriver server once to prove the browser starts with
    /// the requested flags, then remembers the endpoint that answered.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let capabilities = capabilities(&config.args);

        let mut candidates = vec![config.webdriver_url.as_str()];
        candidates.extend(
            FALLBACK_URLS
                .iter()
                .copied()
                .filter(|url| *url != config.webdriver_url),
        );

        for url in candidates {
            match connect(url, &capabilities).await {
                Ok(client) => {
                    ::log::info!("Connected to WebDriver at {}", url);
                    if let Err(e) = client.close().await {
                        ::log::warn!("Failed to close probe session: {}", e);
                    }
                    return Ok(Self {
                        webdriver_url: url.to_string(),
                        capabilities,
                    });
                }
                Err(e) if url == config.webdriver_url => {
                    ::log::error!("Failed to connect to WebDriver at {}: {}", url, e);
                }
                Err(_) => {
                    // Don't log error for fallbacks to avoid log spam
                    ::log::debug!("No WebDriver at fallback {}", url);
                }
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(Error::Launch(format!(
            "no WebDriver server reachable at {} or the fallback addresses",
            config.webdriver_url
        )))
    }
}

impl RenderBackend for WebDriverBackend {
    type Page = WebDriverPage;

    async fn new_page(&self) -> Result<WebDriverPage> {
        let client = connect(&self.webdriver_url, &self.capabilities)
            .await
            .map_err(|e| Error::Launch(format!("cannot open session: {}", e)))?;
        ::log::trace!("Opened WebDriver session");

        Ok(WebDriverPage {
            client,
            url: String::new(),
        })
    }
}

/// One WebDriver session used for a single page
pub struct WebDriverPage {
    client: Client,
    url: String,
}

impl WebDriverPage {
    fn navigation_error(&self, reason: impl ToString) -> Error {
        Error::Navigation {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }

    fn render_error(&self, reason: impl ToString) -> Error {
        Error::Render {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }

    /// Polls until the document has loaded and no new resources were
    /// requested during the last [`IDLE_WINDOW`]. There is no upper bound.
    async fn wait_for_network_idle(&self) -> Result<()> {
        let mut last_count = None;

        loop {
            let state = self
                .client
                .execute(IDLE_PROBE, vec![])
                .await
                .map_err(|e| self.navigation_error(e))?;

            let complete = state.get(0).and_then(Value::as_str) == Some("complete");
            let count = state.get(1).and_then(Value::as_u64);

            if complete && count.is_some() && count == last_count {
                ::log::trace!("Network idle for {}", self.url);
                return Ok(());
            }

            last_count = count;
            tokio::time::sleep(IDLE_WINDOW).await;
        }
    }

    async fn source(&self) -> Result<String> {
        self.client
            .source()
            .await
            .map_err(|e| self.navigation_error(e))
    }
}

impl PageHandle for WebDriverPage {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.url = url.to_string();

        self.client
            .goto(url.as_str())
            .await
            .map_err(|e| self.navigation_error(e))?;

        self.wait_for_network_idle().await
    }

    async fn title(&mut self) -> Result<String> {
        let title = self
            .client
            .title()
            .await
            .map_err(|e| self.navigation_error(e))?;

        if !title.trim().is_empty() {
            return Ok(title);
        }

        // Some drivers report an empty title for documents with a late <title>
        let source = self.source().await?;
        Ok(html::title(&source).unwrap_or_default())
    }

    async fn meta_tags(&mut self) -> Result<Vec<(String, String)>> {
        let source = self.source().await?;
        Ok(html::meta_tags(&source))
    }

    async fn print_to_pdf(&mut self, path: &Path, options: &PdfOptions) -> Result<()> {
        if options.display_header_footer {
            self.client
                .execute(
                    INJECT_HEADER_FOOTER,
                    vec![
                        json!(options.header_template),
                        json!(options.footer_template),
                        json!(options.margins.top),
                        json!(options.margins.bottom),
                    ],
                )
                .await
                .map_err(|e| self.render_error(e))?;
        }

        let margins = options
            .margins
            .to_cm()
            .map_err(|e| self.render_error(e))?;
        let (width, height) = options.format.size_cm();

        let print = PrintConfiguration::builder()
            .size(PrintSize { width, height })
            .margins(PrintMargins {
                top: margins.top,
                bottom: margins.bottom,
                left: margins.left,
                right: margins.right,
            })
            .background(options.print_background)
            .build()
            .map_err(|e| self.render_error(format!("{:?}", e)))?;

        let pdf = self
            .client
            .print(print)
            .await
            .map_err(|e| self.render_error(e))?;

        tokio::fs::write(path, &pdf)
            .await
            .map_err(|source| Error::Filesystem {
                path: path.to_path_buf(),
                source,
            })?;

        ::log::debug!("Wrote {} bytes to {}", pdf.len(), path.display());
        Ok(())
    }

    async fn close(self) -> Result<()> {
        let url = self.url;
        self.client.close().await.map_err(|e| Error::Render {
            url,
            reason: format!("failed to close session: {}", e),
        })
    }
}

async fn connect(
    webdriver_url: &str,
    capabilities: &Capabilities,
) -> std::result::Result<Client, fantoccini::error::NewSessionError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(capabilities.clone());
    builder.connect(webdriver_url).await
}

/// Session capabilities carrying the browser flags for Chrome and Firefox
/// drivers and an effectively unbounded page load timeout
fn capabilities(args: &[String]) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
    caps.insert(
        "timeouts".to_string(),
        json!({ "pageLoad": PAGE_LOAD_TIMEOUT_MS, "script": null }),
    );
    caps
}
