//! Builtin command implementations.

use std::io::{BufRead, Write};

use ajiaco_core::{register_experiment_models, ModelRegistry};

use crate::config::{AppConfig, Command};
use crate::error::CliError;

/// Ajiaco version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open the configured storage with the experiment models registered.
pub fn open_registry(config: &AppConfig) -> Result<ModelRegistry, CliError> {
    let mut registry = ModelRegistry::open(&config.storage)?;
    register_experiment_models(&mut registry)?;
    Ok(registry)
}

/// Run a command against stdin/stdout.
pub fn run(config: &AppConfig, command: Command) -> Result<(), CliError> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    execute(config, command, &mut stdin.lock(), &mut stdout.lock())
}

/// Run a command with explicit input and output.
pub fn execute<R: BufRead, W: Write>(
    config: &AppConfig,
    command: Command,
    input: &mut R,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Command::Version => version(out),
        Command::ResetStorage { noinput } => {
            let registry = open_registry(config)?;
            reset_storage(&registry, noinput, input, out).map(|_| ())
        }
        Command::Stamp => stamp(&open_registry(config)?, out),
        Command::Models { name } => models(&open_registry(config)?, name.as_deref(), out),
    }
}

/// Print the version.
pub fn version<W: Write>(out: &mut W) -> Result<(), CliError> {
    writeln!(out, "Ajiaco v.{}", VERSION)?;
    Ok(())
}

/// Drop and recreate the storage. Returns whether it was reset.
pub fn reset_storage<R: BufRead, W: Write>(
    registry: &ModelRegistry,
    noinput: bool,
    input: &mut R,
    out: &mut W,
) -> Result<bool, CliError> {
    if !noinput && !confirm(input, out)? {
        return Ok(false);
    }

    writeln!(out, "Target: {}", registry.storage().address())?;
    writeln!(out, "  - Deleting Storage...")?;
    if registry.exists() {
        registry.drop_storage()?;
    }

    writeln!(out, "  - Creating Storage...")?;
    registry.create_storage()?;

    writeln!(out, "  - Creating Schema...")?;
    registry.create_schema()?;

    writeln!(out, "  - Stamping...")?;
    registry.stamp()?;
    registry.storage().flush()?;

    writeln!(out, "DONE!")?;
    Ok(true)
}

fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<bool, CliError> {
    write!(out, "Do you want to clear the storage? [yes/no] ")?;
    out.flush()?;
    loop {
        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        match answer.trim().to_lowercase().as_str() {
            "yes" => return Ok(true),
            "no" => return Ok(false),
            _ => {
                write!(out, "Please answer 'yes' or 'no': ")?;
                out.flush()?;
            }
        }
    }
}

/// Print the storage stamp as JSON.
pub fn stamp<W: Write>(registry: &ModelRegistry, out: &mut W) -> Result<(), CliError> {
    let stamp = registry
        .read_stamp()?
        .ok_or_else(|| CliError::NotStamped(registry.storage().address().to_string()))?;
    writeln!(out, "{}", serde_json::to_string_pretty(&stamp)?)?;
    Ok(())
}

/// List the registered models or describe one of them.
pub fn models<W: Write>(
    registry: &ModelRegistry,
    name: Option<&str>,
    out: &mut W,
) -> Result<(), CliError> {
    match name {
        Some(name) => {
            let model = registry
                .get(name)
                .ok_or_else(|| CliError::UnknownModel(name.to_string()))?;
            writeln!(out, "{}", model.describe())?;
        }
        None => {
            for model in registry.models() {
                writeln!(
                    out,
                    "{:<10} table={:<10} columns={}",
                    model.name(),
                    model.table_name(),
                    model.columns().len()
                )?;
            }
        }
    }
    Ok(())
}
