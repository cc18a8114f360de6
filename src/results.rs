use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use url::Url;

/// Final state of one converted URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Printed,
    Errored,
}

/// Represents the result of converting one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// URL of the page
    pub url: Url,

    /// PDF path, or the deepest path known when the conversion failed
    pub file_path: PathBuf,

    pub status: Status,

    /// Failure description for errored pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub attempted: usize,
    pub printed: usize,
    pub errored: Vec<ConversionOutcome>,
}

impl Report {
    /// True when pages were attempted but none produced a PDF
    pub fn nothing_printed(&self) -> bool {
        self.attempted > 0 && self.printed == 0
    }
}

/// Append-only log of outcomes shared by every in-flight conversion
#[derive(Debug, Default)]
pub struct ResultTracker {
    outcomes: Mutex<Vec<ConversionOutcome>>,
}

impl ResultTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one URL
    pub async fn store_result(
        &self,
        url: &Url,
        file_path: &Path,
        status: Status,
        error: Option<String>,
    ) {
        let outcome = ConversionOutcome {
            url: url.clone(),
            file_path: file_path.to_path_buf(),
            status,
            error,
        };

        let mut outcomes = self.outcomes.lock().await;
        outcomes.push(outcome);
        ::log::trace!("Recorded outcome {} for {}", outcomes.len(), url);
    }

    pub async fn report(&self) -> Report {
        let outcomes = self.outcomes.lock().await;
        let printed = outcomes
            .iter()
            .filter(|o| o.status == Status::Printed)
            .count();
        let errored = outcomes
            .iter()
            .filter(|o| o.status == Status::Errored)
            .cloned()
            .collect();

        Report {
            attempted: outcomes.len(),
            printed,
            errored,
        }
    }

    /// Print the run summary to stdout and return it
    pub async fn print_results(&self) -> Report {
        let report = self.report().await;

        ::log::info!(
            "Conversion finished - {} attempted, {} printed, {} errored",
            report.attempted,
            report.printed,
            report.errored.len()
        );

        println!();
        println!("Pages attempted: {}", report.attempted);
        println!("PDFs printed:    {}", report.printed);
        println!("Errors:          {}", report.errored.len());

        if !report.errored.is_empty() {
            println!();
            println!("Failed pages:");
            for outcome in &report.errored {
                match &outcome.error {
                    Some(reason) => println!("  {} ({})", outcome.url, reason),
                    None => println!("  {}", outcome.url),
                }
            }
        }

        report
    }
}
