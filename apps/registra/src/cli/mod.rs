//! # Registra CLI Module
//!
//! This module implements the CLI interface for Registra.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `status` - Show registry stats for a seed file
//! - `seed` - Validate a seed file, or write a template seed

mod commands;

use clap::{Parser, Subcommand};
use registra_core::RegistryError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Registra - Academic State Server
///
/// A deterministic registration and academic-state engine: subject
/// registration, timetables, attendance and role-gated grading.
#[derive(Parser, Debug)]
#[command(name = "registra")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Optional TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Optional JSON seed file of users and subjects
        #[arg(short, long)]
        seed: Option<PathBuf>,
    },

    /// Show registry stats for a seed file
    Status {
        /// JSON seed file to load
        #[arg(short, long)]
        seed: PathBuf,
    },

    /// Validate a seed file, or write a template seed
    Seed {
        /// Seed file to validate
        #[arg(short, long, conflicts_with = "init")]
        file: Option<PathBuf>,

        /// Write a template seed to this path instead of validating
        #[arg(short, long)]
        init: Option<PathBuf>,

        /// Overwrite an existing file when initializing
        #[arg(long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), RegistryError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            config,
            seed,
        }) => cmd_serve(host, port, config.as_deref(), seed.as_deref()).await,
        Some(Commands::Status { seed }) => cmd_status(&seed, json_mode),
        Some(Commands::Seed { file, init, force }) => cmd_seed(file.as_deref(), init.as_deref(), force),
        None => {
            // No subcommand - print help-style hint
            println!("No command given. Try `registra serve` or `registra --help`.");
            Ok(())
        }
    }
}
