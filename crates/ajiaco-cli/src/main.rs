//! Ajiaco command-line tool.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ajiaco_cli::{commands, Args};

fn main() {
    let args = Args::parse();
    let (config, command) = args.into_config();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(storage = %config.storage, ?command, "configuration loaded");

    if let Err(e) = commands::run(&config, command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
