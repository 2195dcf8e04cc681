//! # Strata - Ownership Diagram Editor
//!
//! The main binary for Strata.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  apps/strata (THE BINARY)                │
//! │                                                          │
//! │  ┌─────────────┐   ┌─────────────┐   ┌───────────────┐   │
//! │  │    CLI      │   │   Session   │   │   Autosave    │   │
//! │  │   (clap)    │   │   (stdin)   │   │    (tokio)    │   │
//! │  └──────┬──────┘   └──────┬──────┘   └───────┬───────┘   │
//! │         └─────────────────┼──────────────────┘           │
//! │                           ▼                              │
//! │                   ┌───────────────┐                      │
//! │                   │  strata-core  │                      │
//! │                   │ (THE EDITOR)  │                      │
//! │                   └───────────────┘                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! strata new --name "Acme structure"
//! strata add-node <doc> --kind corporation --label "Acme Inc"
//! strata connect <doc> "Acme Inc" "#2" --ownership 100
//! strata layout <doc> --direction LR
//! strata session <doc>
//! ```

use clap::Parser;
use strata::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // STRATA_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STRATA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "strata=info,strata_core=warn".into());

    // Logs on stderr; stdout carries command output.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
