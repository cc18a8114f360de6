use clap::Parser;
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!("Starting conversion for: {}", config.url);
    println!("Note: rendering requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using the default http://localhost:4444"
    );

    let start_time = std::time::Instant::now();
    let report = match sitemap2pdf::run(config).await {
        Ok(report) => report,
        Err(e) if e.is_fatal() => {
            ::log::error!("Aborting before any page was converted: {}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            ::log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!(
        "Run complete - {} pages in {:.2} seconds",
        report.attempted,
        start_time.elapsed().as_secs_f64()
    );

    if report.nothing_printed() {
        ::log::error!("No PDF could be produced");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
