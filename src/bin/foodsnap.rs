//! Foodsnap CLI Binary
//!
//! Command-line access to the client's pending image cache, step progress,
//! preferences and session.

use clap::Parser;
use foodsnap::cli::{map_error, Cli, RunContext};
use foodsnap::config::ConfigLoader;
use foodsnap::logging::{init_logging, LoggingConfig};
use foodsnap::ClientError;
use std::process;
use tracing::{debug, error};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(Some(&build_logging_config(&cli))) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    match run(&cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<String, ClientError> {
    let context = RunContext::new(cli.workspace.clone(), cli.config.clone())?;
    debug!(base_url = %context.config().api.base_url, "Client state ready");

    let output = context.execute(&cli.command)?;
    if !cli.quiet {
        if let Some(hint) = context.resume_hint(&cli.command) {
            eprintln!("{}", hint);
        }
    }
    Ok(output)
}

/// Logging settings from the config layers, then command-line flags on top
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(&cli.workspace),
    };
    let mut config = loaded.map(|c| c.logging).unwrap_or_default();

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    for (flag, slot) in [
        (&cli.log_level, &mut config.level),
        (&cli.log_format, &mut config.format),
        (&cli.log_output, &mut config.output),
    ] {
        if let Some(value) = flag {
            *slot = value.clone();
        }
    }
    if let Some(file) = &cli.log_file {
        config.file = file.clone();
    }

    config
}
