//! PV sponsorship core library
//!
//! Shared functionality for the service binaries:
//! - Configuration loading with file and environment layering
//! - `SQLite` pool creation and timestamps
//! - Tracing subscriber setup
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
