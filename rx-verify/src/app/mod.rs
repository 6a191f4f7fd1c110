//! Application Layer
//!
//! User-facing CLI and configuration management.

pub mod cli;
pub mod config;

pub use cli::{Cli, OutputFormat};
pub use config::Config;
