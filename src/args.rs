use clap::{Parser, ValueEnum};
use sitemap2pdf::Config;
use sitemap2pdf::config::PaperFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sitemap2pdf")]
#[command(about = "Render every page listed in a website's sitemaps to PDF")]
#[command(version)]
pub struct Args {
    /// Root URL of the website (may also come from --config)
    pub url: Option<String>,

    /// JSON configuration file; command-line options override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Sitemap location, absolute or relative to the website URL (repeatable)
    #[arg(short, long = "sitemap")]
    pub sitemaps: Vec<String>,

    /// Directory PDFs are written into
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory containing header.html and footer.html
    #[arg(short, long)]
    pub templates: Option<PathBuf>,

    /// Number of pages rendered concurrently
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub margin_top: Option<String>,

    #[arg(long)]
    pub margin_bottom: Option<String>,

    #[arg(long)]
    pub margin_left: Option<String>,

    #[arg(long)]
    pub margin_right: Option<String>,

    /// Print the header and footer templates on every page
    #[arg(long)]
    pub display_header_footer: bool,

    /// Strip filesystem-unsafe characters from page titles used as filenames
    #[arg(long)]
    pub safe_title: bool,

    /// Paper size
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Flag passed to the browser (repeatable)
    #[arg(long = "browser-arg", allow_hyphen_values = true)]
    pub browser_args: Vec<String>,

    /// WebDriver server URL
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Write the final report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl From<FormatArg> for PaperFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::A3 => PaperFormat::A3,
            FormatArg::A4 => PaperFormat::A4,
            FormatArg::A5 => PaperFormat::A5,
            FormatArg::Letter => PaperFormat::Letter,
            FormatArg::Legal => PaperFormat::Legal,
            FormatArg::Tabloid => PaperFormat::Tabloid,
        }
    }
}

impl Args {
    /// Merge the configuration file (if any) with command-line overrides
    pub fn into_config(self) -> sitemap2pdf::Result<Config> {
        let mut config = match (&self.config, &self.url) {
            (Some(path), _) => Config::from_file(path)?,
            (None, Some(url)) => Config::new(url),
            (None, None) => {
                return Err(sitemap2pdf::Error::Configuration(
                    "a website URL or --config file is required".to_string(),
                ));
            }
        };

        if let Some(url) = self.url {
            config.url = url;
        }
        if !self.sitemaps.is_empty() {
            config.sitemaps = self.sitemaps;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(templates) = self.templates {
            config.template_dir = templates;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.margin_top.is_some() {
            config.margins.top = self.margin_top;
        }
        if self.margin_bottom.is_some() {
            config.margins.bottom = self.margin_bottom;
        }
        if self.margin_left.is_some() {
            config.margins.left = self.margin_left;
        }
        if self.margin_right.is_some() {
            config.margins.right = self.margin_right;
        }
        config.display_header_footer |= self.display_header_footer;
        config.safe_title |= self.safe_title;
        if let Some(format) = self.format {
            config.format = format.into();
        }
        if !self.browser_args.is_empty() {
            config.browser_args = self.browser_args;
        }

        // Environment beats the file, explicit flags beat both
        config.apply_env();
        if let Some(webdriver_url) = self.webdriver_url {
            config.webdriver_url = webdriver_url;
        }
        if self.report.is_some() {
            config.report_path = self.report;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "sitemap2pdf",
            "https://example.com",
            "--sitemap",
            "/a.xml",
            "-s",
            "/b.xml",
            "-c",
            "4",
            "--margin-top",
            "1cm",
            "--display-header-footer",
            "--safe-title",
            "--format",
            "letter",
            "--browser-arg",
            "--headless",
            "--webdriver-url",
            "http://localhost:9515",
        ]);
        let config = args.into_config().unwrap();

        assert_eq!(config.url, "https://example.com");
        assert_eq!(config.sitemaps, vec!["/a.xml", "/b.xml"]);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.resolved_margins().top, "1cm");
        assert_eq!(config.resolved_margins().bottom, "50px");
        assert!(config.display_header_footer);
        assert!(config.safe_title);
        assert_eq!(config.format, PaperFormat::Letter);
        assert_eq!(config.browser_args, vec!["--headless"]);
        assert_eq!(config.webdriver_url, "http://localhost:9515");
    }

    #[test]
    fn test_url_or_config_required() {
        let args = Args::parse_from(["sitemap2pdf"]);
        assert!(args.into_config().is_err());
    }
}
