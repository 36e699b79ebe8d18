// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use synchrotron::config::Config;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // logs go to stderr, stdout carries the JSON report
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sync {
            force,
            src_suite,
            dest_suite,
            component,
            packages,
            output,
        } => {
            let config = Config::load(&cli.config)?;
            commands::cmd_sync(
                &config,
                &src_suite,
                &dest_suite,
                &component,
                &packages,
                force,
                output.as_deref(),
            )
        }
        Commands::Autosync {
            dest_suite,
            state,
            output,
        } => {
            let config = Config::load(&cli.config)?;
            commands::cmd_autosync(
                &config,
                dest_suite.as_deref(),
                state.as_deref(),
                output.as_deref(),
            )
        }
        Commands::Compare { a, b } => commands::cmd_compare(&a, &b),
        Commands::Verify { keyring_dir, paths } => {
            let keyring_dir = match keyring_dir {
                Some(dir) => dir,
                None => Config::load(&cli.config)?.base.keyring_dir,
            };
            commands::cmd_verify(&keyring_dir, &paths)
        }
    }
}
