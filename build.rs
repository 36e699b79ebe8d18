// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: configuration file
fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("PATH")
        .default_value("/etc/synchrotron/config.toml")
        .help("Configuration file")
}

/// Common argument: JSON report destination
fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("PATH")
        .help("Write the JSON report here instead of stdout")
}

fn build_cli() -> Command {
    Command::new("synchrotron")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Synchrotron Project")
        .about("Synchronize packages from an upstream distribution into a derivative")
        .arg(config_arg())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug messages"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("sync")
                .about("Synchronize a package or set of packages")
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Propose packages even when the target is ahead or modified"),
                )
                .arg(Arg::new("src_suite").required(true).help("The suite to synchronize from"))
                .arg(Arg::new("dest_suite").required(true).help("The suite to synchronize to"))
                .arg(
                    Arg::new("component")
                        .required(true)
                        .help("The archive component to import from"),
                )
                .arg(
                    Arg::new("packages")
                        .required(true)
                        .num_args(1..)
                        .help("The (source) packages to import"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("autosync")
                .about("Synchronize every configured source suite automatically")
                .arg(Arg::new("dest_suite").help("Target suite (default: synchrotron.target_suite)"))
                .arg(
                    Arg::new("state")
                        .long("state")
                        .value_name("PATH")
                        .help("Issue list of the previous run; new and resolved issues become events"),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare two Debian versions and print <, = or >")
                .arg(Arg::new("a").required(true))
                .arg(Arg::new("b").required(true)),
        )
        .subcommand(
            Command::new("verify")
                .about("Check the signature of a Release-style file")
                .arg(
                    Arg::new("keyring_dir")
                        .short('k')
                        .long("keyring-dir")
                        .value_name("DIR")
                        .help("Directory holding trusted keys (default: base.keyring_dir)"),
                )
                .arg(
                    Arg::new("paths")
                        .required(true)
                        .num_args(1..)
                        .help("Candidate paths, tried in order (e.g. InRelease Release)"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("synchrotron.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
