//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::ServerConfig;
use crate::seed::{SeedFile, build_registry, read_seed_file};
use registra_core::{Registry, RegistryError, Semester};
use std::path::Path;

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
///
/// Precedence for host/port: CLI flag, then config file, then default.
pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
    seed_path: Option<&Path>,
) -> Result<(), RegistryError> {
    let config = match config_path {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let host = host.unwrap_or(config.host);
    let port = port.unwrap_or(config.port);

    let registry = match seed_path {
        Some(path) => {
            let registry = build_registry(&read_seed_file(path)?)?;
            tracing::info!(
                seed = %path.display(),
                users = registry.counts().users,
                subjects = registry.counts().subjects,
                "Loaded seed file"
            );
            registry
        }
        None => Registry::new(Semester(config.semester)),
    };

    println!("Registra Academic State Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", host);
    println!("  Port:       {}", port);
    println!("  Semester:   {}", registry.semester().0);
    println!("  Subjects:   {}", registry.counts().subjects);
    println!("  Users:      {}", registry.counts().users);
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, registry).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show the registry stats a seed file would produce.
pub fn cmd_status(seed_path: &Path, json_mode: bool) -> Result<(), RegistryError> {
    let registry = build_registry(&read_seed_file(seed_path)?)?;
    let counts = registry.counts();

    if json_mode {
        let payload = serde_json::json!({
            "semester": registry.semester().0,
            "users": counts.users,
            "subjects": counts.subjects,
            "enrollments": counts.enrollments,
            "grades": counts.grades,
            "window_open": counts.window_open,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload)
                .map_err(|e| RegistryError::Serialization(e.to_string()))?
        );
    } else {
        println!("Registry Status ({})", seed_path.display());
        println!("  Semester:    {}", registry.semester().0);
        println!("  Users:       {}", counts.users);
        println!("  Subjects:    {}", counts.subjects);
        println!("  Enrollments: {}", counts.enrollments);
        println!("  Grades:      {}", counts.grades);
        println!(
            "  Window:      {}",
            if counts.window_open { "open" } else { "closed" }
        );
    }
    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// Validate a seed file, or write a template seed.
pub fn cmd_seed(
    file: Option<&Path>,
    init: Option<&Path>,
    force: bool,
) -> Result<(), RegistryError> {
    match (file, init) {
        (_, Some(output)) => {
            if output.exists() && !force {
                return Err(RegistryError::Io(format!(
                    "'{}' already exists (use --force to overwrite)",
                    output.display()
                )));
            }
            let template = SeedFile::template();
            let encoded = serde_json::to_string_pretty(&template)
                .map_err(|e| RegistryError::Serialization(e.to_string()))?;
            std::fs::write(output, encoded)
                .map_err(|e| RegistryError::Io(format!("Cannot write seed: {}", e)))?;
            println!("Wrote template seed to {}", output.display());
            Ok(())
        }
        (Some(path), None) => {
            // A seed is valid iff it builds a registry under the full
            // domain rules.
            let registry = build_registry(&read_seed_file(path)?)?;
            let counts = registry.counts();
            println!(
                "Seed OK: {} users, {} subjects, semester {}",
                counts.users,
                counts.subjects,
                registry.semester().0
            );
            Ok(())
        }
        (None, None) => Err(RegistryError::InvalidInput(
            "seed: pass --file to validate or --init to write a template".to_string(),
        )),
    }
}

// =============================================================================
// TESTS
// =============================================================================
