use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

/// Metadata extracted from a rendered page, keyed by name
pub type PageMetadata = BTreeMap<String, String>;

/// File names looked up inside the template directory
pub const HEADER_FILE: &str = "header.html";
pub const FOOTER_FILE: &str = "footer.html";

/// Tokens left for the browser to fill in at print time
const PASSTHROUGH_TOKENS: [&str; 2] = ["pageNumber", "totalPages"];

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.:-]+)\s*\}\}").unwrap());

/// Replace every `{{key}}` token in `template` with its metadata value.
///
/// Keys missing from `metadata` become empty strings. Page-number tokens
/// are kept verbatim.
pub fn interpolate(template: &str, metadata: &PageMetadata) -> String {
    TOKEN
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            if PASSTHROUGH_TOKENS.contains(&key) {
                return caps[0].to_string();
            }
            metadata.get(key).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Header and footer markup applied to every PDF
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfTemplate {
    pub header: String,
    pub footer: String,
}

impl PdfTemplate {
    pub fn new(header: impl Into<String>, footer: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            footer: footer.into(),
        }
    }

    /// Load `header.html` and `footer.html` from `dir`.
    ///
    /// A missing file, or a missing directory, yields an empty template.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            header: read_optional(&dir.join(HEADER_FILE))?,
            footer: read_optional(&dir.join(FOOTER_FILE))?,
        })
    }

    /// Interpolate both templates with one page's metadata
    pub fn render(&self, metadata: &PageMetadata) -> (String, String) {
        (
            interpolate(&self.header, metadata),
            interpolate(&self.footer, metadata),
        )
    }
}

fn read_optional(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            ::log::debug!("Loaded template {}", path.display());
            Ok(contents)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            ::log::debug!("No template at {}, using empty", path.display());
            Ok(String::new())
        }
        Err(e) => Err(Error::Configuration(format!(
            "cannot read template {}: {}",
            path.display(),
            e
        ))),
    }
}
