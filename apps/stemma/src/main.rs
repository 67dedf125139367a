//! # Stemma - Family Tree Keeper
//!
//! The main binary for the Stemma family-tree engine.
//!
//! ## Usage
//!
//! ```bash
//! stemma init
//! stemma add-member "Arthur Weasley" --gender MALE --born 1950-02-06
//! stemma add-member "Molly Weasley" --source <ARTHUR_ID> --relationship spouse
//! stemma render --poi <ARTHUR_ID> --expand children
//! stemma merge --input other-family.json
//! ```

use clap::Parser;
use stemma::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Initialize tracing: STEMMA_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STEMMA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "stemma=debug,stemma_core=debug"
    } else if cli.quiet {
        "stemma=warn,stemma_core=warn"
    } else {
        "stemma=info,stemma_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
