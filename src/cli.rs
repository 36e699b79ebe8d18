// src/cli.rs
//! CLI definitions for synchrotron
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use synchrotron::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "synchrotron")]
#[command(author = "Synchrotron Project")]
#[command(version)]
#[command(about = "Synchronize packages from an upstream distribution into a derivative", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize a package or set of packages
    Sync {
        /// Propose packages even when the target is ahead or modified
        #[arg(long)]
        force: bool,

        /// The suite to synchronize from
        src_suite: String,

        /// The suite to synchronize to
        dest_suite: String,

        /// The archive component to import from
        component: String,

        /// The (source) packages to import
        #[arg(required = true)]
        packages: Vec<String>,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Synchronize every configured source suite automatically
    Autosync {
        /// Target suite (default: synchrotron.target_suite from the config)
        dest_suite: Option<String>,

        /// Issue list of the previous run; new and resolved issues become events
        #[arg(long)]
        state: Option<PathBuf>,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare two Debian versions and print <, = or >
    Compare {
        a: String,
        b: String,
    },

    /// Check the signature of a Release-style file
    Verify {
        /// Directory holding trusted keys (default: base.keyring_dir)
        #[arg(short, long)]
        keyring_dir: Option<PathBuf>,

        /// Candidate paths, tried in order (e.g. InRelease Release)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}
