// src/commands.rs
//! Command handlers for the synchrotron CLI

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use synchrotron::blacklist::load_blacklist;
use synchrotron::config::Config;
use synchrotron::repository::{SignatureLayout, SignedFile, TrustedKeyring};
use synchrotron::suite::SuiteInfo;
use synchrotron::sync::{
    IssueKind, SyncEngine, SyncEvent, SyncProposal, SyncResult, SyncSourceInfo,
    SynchrotronIssue, TrustContext,
};
use synchrotron::version;
use tracing::{info, warn};

/// JSON document printed by `sync` and `autosync`
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub target_suite: String,
    pub source: Option<SyncSourceInfo>,
    pub proposals: Vec<SyncProposal>,
    pub issues: Vec<SynchrotronIssue>,
    pub events: Vec<SyncEvent>,
}

impl SyncReport {
    fn new(engine: &SyncEngine, result: SyncResult, events: Vec<SyncEvent>) -> Self {
        Self {
            target_suite: engine.target().name.clone(),
            source: engine.source_info(),
            proposals: result.proposals,
            issues: result.issues,
            events,
        }
    }
}

/// Create an engine for a configured target suite
fn build_engine(config: &Config, target: SuiteInfo) -> Result<SyncEngine> {
    let target_keyring = Arc::new(config.base.load_keyring()?);
    let source_keyring = Arc::new(config.synchrotron.load_source_keyring(&config.base)?);

    let mut engine = SyncEngine::new(
        config.base.clone(),
        config.synchrotron.clone(),
        target,
        TrustContext::new(target_keyring, source_keyring),
    );

    if let Some(path) = &config.synchrotron.blacklist_file {
        let names = load_blacklist(path)
            .with_context(|| format!("Failed to load blacklist {}", path.display()))?;
        info!("Using {} blacklisted package name(s)", names.len());
        engine.set_blacklist(names);
    }
    Ok(engine)
}

fn target_suite(config: &Config, name: &str) -> Result<SuiteInfo> {
    config
        .suite(name)
        .cloned()
        .ok_or_else(|| anyhow!("Target suite '{}' is not configured", name))
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Synchronize a dedicated set of packages
pub fn cmd_sync(
    config: &Config,
    src_suite: &str,
    dest_suite: &str,
    component: &str,
    packages: &[String],
    force: bool,
    output: Option<&Path>,
) -> Result<()> {
    if !config.synchrotron.sync_enabled {
        bail!("Synchronization is disabled in the configuration");
    }

    let mut engine = build_engine(config, target_suite(config, dest_suite)?)?;
    engine.set_source_suite_by_name(src_suite)?;

    info!(
        "Synchronizing {} package(s) from {}/{} to {}",
        packages.len(),
        src_suite,
        component,
        dest_suite
    );
    let result = engine.sync_selected(component, packages, force)?;

    let failed = result.issues_of(IssueKind::SyncFailed).count();
    let events = SyncEvent::imported(&result, &config.synchrotron.source_name);
    write_json(&SyncReport::new(&engine, result, events), output)?;

    if failed > 0 {
        bail!("{} package(s) could not be synchronized", failed);
    }
    Ok(())
}

/// Run all configured automatic syncs into one target suite
pub fn cmd_autosync(
    config: &Config,
    dest_suite: Option<&str>,
    state: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let name = dest_suite
        .or(config.synchrotron.target_suite.as_deref())
        .ok_or_else(|| anyhow!("No target suite given and synchrotron.target_suite is not set"))?;

    let mut engine = build_engine(config, target_suite(config, name)?)?;
    info!(
        "Synchronizing packages from {} with {}",
        config.synchrotron.source_name, name
    );
    let result = engine.autosync()?;

    let source_name = &config.synchrotron.source_name;
    let mut events = SyncEvent::imported(&result, source_name);
    if let Some(path) = state {
        let previous = read_state(path)?;
        events.extend(SyncEvent::issue_changes(&previous, &result.issues, source_name));
        fs::write(path, serde_json::to_string_pretty(&result.issues)? + "\n")
            .with_context(|| format!("Failed to write state file {}", path.display()))?;
    }

    write_json(&SyncReport::new(&engine, result, events), output)
}

fn read_state(path: &Path) -> Result<Vec<SynchrotronIssue>> {
    if !path.exists() {
        warn!("State file {} does not exist yet, every issue is new", path.display());
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("State file {} is not a valid issue list", path.display()))
}

/// Print how two versions order
pub fn cmd_compare(a: &str, b: &str) -> Result<()> {
    let symbol = match version::compare(a, b)? {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    println!("{} {} {}", a, symbol, b);
    Ok(())
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    path: PathBuf,
    signature_path: Option<PathBuf>,
    layout: SignatureLayout,
    valid: bool,
    fingerprints: Vec<String>,
    trusted_signers: Vec<String>,
    signature_id: Option<String>,
}

/// Check the signature of a signed file against a keyring
pub fn cmd_verify(keyring_dir: &Path, paths: &[PathBuf]) -> Result<()> {
    let keyring = TrustedKeyring::load_dir(keyring_dir)?;
    let mut file = SignedFile::open(paths, Arc::new(keyring))?;
    let valid = file.is_valid();

    let report = VerifyReport {
        path: file.path().to_path_buf(),
        signature_path: file.signature_path().map(Path::to_path_buf),
        layout: file.layout(),
        valid,
        fingerprints: file.fingerprints().to_vec(),
        trusted_signers: file.trusted_signers().to_vec(),
        signature_id: file.signature_id().ok(),
    };
    write_json(&report, None)?;

    if !valid {
        bail!("{} is not signed by a trusted key", file.path().display());
    }
    Ok(())
}
