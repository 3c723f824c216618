//! Ajiaco command-line tool.

pub mod commands;
pub mod config;
pub mod error;

pub use config::{AppConfig, Args, Command};
pub use error::CliError;
