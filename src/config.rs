use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Margin used above and below the page body when header/footer are shown
pub const HEADER_FOOTER_MARGIN: &str = "50px";

/// Margin used everywhere else
pub const ZERO_MARGIN: &str = "0px";

/// Configuration for converting one website
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root URL of the website
    pub url: String,

    /// Sitemap locations; discovered from robots.txt when empty
    #[serde(default)]
    pub sitemaps: Vec<String>,

    /// Directory PDFs are written into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory holding header.html and footer.html
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Number of pages rendered concurrently within a sitemap
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Explicit margins; unset sides use the header/footer dependent default
    #[serde(default)]
    pub margins: MarginOverrides,

    /// Whether the header and footer templates are printed
    #[serde(default)]
    pub display_header_footer: bool,

    /// Strip filesystem-unsafe characters from titles used as filenames
    #[serde(default)]
    pub safe_title: bool,

    /// Paper size of the generated PDFs
    #[serde(default)]
    pub format: PaperFormat,

    /// Print background graphics
    #[serde(default = "default_print_background")]
    pub print_background: bool,

    /// Extra command-line flags passed to the browser
    #[serde(default)]
    pub browser_args: Vec<String>,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Optional path for a JSON copy of the final report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

/// Per-side margin overrides, each a CSS length such as `"20px"` or `"1cm"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
}

/// Fully resolved page margins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub top: String,
    pub bottom: String,
    pub left: String,
    pub right: String,
}

impl Margins {
    /// Fill in unset sides.
    ///
    /// With header/footer display on, top and bottom default to 50px so the
    /// templates have room; every other unset side is 0px.
    pub fn resolve(overrides: &MarginOverrides, display_header_footer: bool) -> Self {
        let vertical = if display_header_footer {
            HEADER_FOOTER_MARGIN
        } else {
            ZERO_MARGIN
        };
        let pick = |value: &Option<String>, fallback: &str| {
            value.clone().unwrap_or_else(|| fallback.to_string())
        };

        Self {
            top: pick(&overrides.top, vertical),
            bottom: pick(&overrides.bottom, vertical),
            left: pick(&overrides.left, ZERO_MARGIN),
            right: pick(&overrides.right, ZERO_MARGIN),
        }
    }
}

/// Margins in centimetres, in top/bottom/left/right order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginsCm {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Margins {
    /// Convert every side to centimetres
    pub fn to_cm(&self) -> Result<MarginsCm> {
        let side = |name: &str, value: &str| {
            css_length_to_cm(value).ok_or_else(|| {
                Error::Configuration(format!("invalid {} margin '{}'", name, value))
            })
        };

        Ok(MarginsCm {
            top: side("top", &self.top)?,
            bottom: side("bottom", &self.bottom)?,
            left: side("left", &self.left)?,
            right: side("right", &self.right)?,
        })
    }
}

/// Parse a CSS length (`px`, `in`, `cm`, `mm`, `pt`, `pc`, or a bare number
/// of pixels) into centimetres
pub fn css_length_to_cm(value: &str) -> Option<f64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.parse().ok()?;

    let cm = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "px" => number * 2.54 / 96.0,
        "in" => number * 2.54,
        "cm" => number,
        "mm" => number / 10.0,
        "pt" => number * 2.54 / 72.0,
        "pc" => number * 2.54 / 6.0,
        _ => return None,
    };
    Some(cm)
}

/// Supported paper sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperFormat {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PaperFormat {
    /// Page width and height in centimetres
    pub fn size_cm(self) -> (f64, f64) {
        match self {
            PaperFormat::A3 => (29.7, 42.0),
            PaperFormat::A4 => (21.0, 29.7),
            PaperFormat::A5 => (14.8, 21.0),
            PaperFormat::Letter => (21.59, 27.94),
            PaperFormat::Legal => (21.59, 35.56),
            PaperFormat::Tabloid => (27.94, 43.18),
        }
    }
}

/// Settings needed to open browser sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub args: Vec<String>,
}

/// Default value for output_dir
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Default value for template_dir
fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

/// Default value for concurrency
fn default_concurrency() -> usize {
    10
}

fn default_print_background() -> bool {
    true
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

impl Config {
    /// Create a new configuration with default values
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            sitemaps: Vec::new(),
            output_dir: default_output_dir(),
            template_dir: default_template_dir(),
            concurrency: default_concurrency(),
            margins: MarginOverrides::default(),
            display_header_footer: false,
            safe_title: false,
            format: PaperFormat::default(),
            print_background: default_print_background(),
            browser_args: Vec::new(),
            webdriver_url: default_webdriver_url(),
            report_path: None,
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|e| {
                Error::Configuration(format!("cannot read {}: {}", path.display(), e))
            })?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("invalid configuration: {}", e)))
    }

    /// Override the WebDriver URL with the `WEBDRIVER_URL` environment variable if set
    pub fn apply_env(&mut self) {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
    }

    /// Margins with defaults applied
    pub fn resolved_margins(&self) -> Margins {
        Margins::resolve(&self.margins, self.display_header_footer)
    }

    /// Concurrency clamped to at least one page
    pub fn page_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Check the settings that can be validated without network access
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.url)
            .map_err(|e| Error::Configuration(format!("invalid url '{}': {}", self.url, e)))?;
        self.resolved_margins().to_cm()?;
        Ok(())
    }

    pub fn browser(&self) -> BrowserConfig {
        BrowserConfig {
            webdriver_url: self.webdriver_url.clone(),
            args: self.browser_args.clone(),
        }
    }
}
