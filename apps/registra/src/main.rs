//! # Registra - Academic State Server
//!
//! The main binary for the Registra registration and academic-state
//! engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for serving, seed validation and status
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               apps/registra (THE BINARY)             │
//! │                                                      │
//! │   ┌─────────────┐           ┌─────────────┐          │
//! │   │   CLI       │           │   HTTP API  │          │
//! │   │  (clap)     │           │   (axum)    │          │
//! │   └──────┬──────┘           └──────┬──────┘          │
//! │          │                         │                 │
//! │          └────────────┬────────────┘                 │
//! │                       ▼                              │
//! │             ┌──────────────────┐                     │
//! │             │  registra-core   │                     │
//! │             │   (THE LOGIC)    │                     │
//! │             └──────────────────┘                     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! registra serve --host 0.0.0.0 --port 8080 --seed seed.json
//!
//! # CLI operations
//! registra status --seed seed.json
//! registra seed --file seed.json
//! ```

use clap::Parser;
use registra::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — REGISTRA_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("REGISTRA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "registra=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Registra startup banner.
fn print_banner() {
    println!(
        r#"
  ██████╗ ███████╗ ██████╗ ██╗███████╗████████╗██████╗  █████╗
  ██╔══██╗██╔════╝██╔════╝ ██║██╔════╝╚══██╔══╝██╔══██╗██╔══██╗
  ██████╔╝█████╗  ██║  ███╗██║███████╗   ██║   ██████╔╝███████║
  ██╔══██╗██╔══╝  ██║   ██║██║╚════██║   ██║   ██╔══██╗██╔══██║
  ██║  ██║███████╗╚██████╔╝██║███████║   ██║   ██║  ██║██║  ██║
  ╚═╝  ╚═╝╚══════╝ ╚═════╝ ╚═╝╚══════╝   ╚═╝   ╚═╝  ╚═╝╚═╝  ╚═╝

  Academic State Server v{}

  Deterministic • Role-Gated • Auditable
"#,
        env!("CARGO_PKG_VERSION")
    );
}
