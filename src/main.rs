//! Stress Harness CLI
//!
//! Runs every stress test script and exits non-zero if any of them fail.

use clap::Parser;

use stress_harness::{Cli, JavaRunner, StressHarness, EXIT_FAILURE};

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("stress-harness: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let runner = JavaRunner::new()
        .with_runtime(&config.runtime)
        .with_entry_point(&config.entry_point);
    let harness = StressHarness::new(config, runner);

    let report = match harness.run().await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("stress-harness: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = report.render(&mut stdout) {
        eprintln!("stress-harness: failed to write report: {}", e);
        std::process::exit(EXIT_FAILURE);
    }

    std::process::exit(report.exit_code());
}
