//! # registra
//!
//! The Registra application library: HTTP API, CLI, configuration and
//! seed loading. All academic-state logic lives in `registra-core`;
//! this crate only supplies transport, wiring and operator tooling.

pub mod api;
pub mod cli;
pub mod config;
pub mod seed;
