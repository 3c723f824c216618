//! CLI configuration.

use clap::{ArgAction, Parser, Subcommand};

/// Default storage address.
pub const DEFAULT_STORAGE: &str = "sled://./ajiaco_data";

/// Environment variable overriding the storage address.
pub const STORAGE_ENV: &str = "AJIACO_STORAGE";

/// Highest meaningful verbosity.
pub const MAX_VERBOSITY: u8 = 4;

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Storage address.
    pub storage: String,

    /// Verbosity from 0 (errors only) to 4 (trace).
    pub verbosity: u8,

    /// Debug mode. Logs at least at debug level.
    pub debug: bool,
}

impl AppConfig {
    /// Create a configuration for the given storage address.
    pub fn new(storage: impl Into<String>) -> Self {
        Self {
            storage: storage.into(),
            verbosity: 0,
            debug: false,
        }
    }

    /// Set the verbosity, capped at [`MAX_VERBOSITY`].
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity.min(MAX_VERBOSITY);
        self
    }

    /// Enable debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Log level implied by the verbosity and debug flag.
    pub fn log_level(&self) -> &'static str {
        let mut index = usize::from(self.verbosity.min(MAX_VERBOSITY));
        if self.debug {
            index = index.max(3);
        }
        LEVELS[index]
    }

    /// Default `tracing` filter directive.
    pub fn log_filter(&self) -> String {
        let level = self.log_level();
        format!("ajiaco_core={level},ajiaco_cli={level}")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE)
    }
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "ajc")]
#[command(version, about = "Ajiaco experiment toolkit", long_about = None)]
pub struct Args {
    /// Storage address (sled://<path>, or sled:// for an in-memory storage).
    #[arg(short, long, env = STORAGE_ENV, default_value = DEFAULT_STORAGE, global = true)]
    pub storage: String,

    /// Increase verbosity (-v warn, -vv info, -vvv debug, -vvvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Debug mode.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Builtin commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the version of Ajiaco and exit.
    Version,

    /// Drop and recreate the storage, its schema and its stamp.
    ResetStorage {
        /// Don't ask for confirmation.
        #[arg(long)]
        noinput: bool,
    },

    /// Show the storage stamp.
    Stamp,

    /// List the experiment models, or describe one.
    Models {
        /// Model to describe.
        name: Option<String>,
    },
}

impl Args {
    /// Convert command-line arguments into configuration and the command to run.
    pub fn into_config(self) -> (AppConfig, Command) {
        let config = AppConfig::new(self.storage)
            .with_verbosity(self.verbose)
            .with_debug(self.debug);
        (config, self.command)
    }
}
