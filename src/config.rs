// src/config.rs

//! Configuration file handling
//!
//! Everything is read from one TOML file:
//!
//! ```toml
//! [base]
//! archive_root = "/srv/archive/pureos"
//! keyring_dir = "/etc/synchrotron/keyrings"
//!
//! [synchrotron]
//! source_name = "Debian"
//! sync_auto_enabled = true
//! distro_tag = "pureos"
//!
//! [synchrotron.source]
//! repo_root = "/srv/mirror/debian"
//! default_suite = "sid"
//!
//! [[synchrotron.source.suites]]
//! name = "sid"
//! components = ["main", "contrib"]
//! architectures = ["amd64", "arm64"]
//!
//! [[suite]]
//! name = "landing"
//! components = ["main"]
//! architectures = ["amd64", "arm64"]
//! parent = { name = "byzantium" }
//! ```

use crate::error::{Error, Result};
use crate::repository::TrustedKeyring;
use crate::suite::SuiteInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/synchrotron/config.toml";

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub base: BaseConfig,
    #[serde(default)]
    pub synchrotron: SynchrotronConfig,
    /// Suites of the target (derivative) archive
    #[serde(default, rename = "suite")]
    pub suites: Vec<SuiteInfo>,
}

impl Config {
    /// Load and validate the configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = content.parse()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Find a target suite by name
    pub fn suite(&self, name: &str) -> Option<&SuiteInfo> {
        self.suites.iter().find(|s| s.name == name)
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for suite in &self.suites {
            if suite.name.is_empty() {
                return Err(Error::Config("suite with empty name".to_string()));
            }
            if !names.insert(suite.name.as_str()) {
                return Err(Error::Config(format!("suite '{}' defined twice", suite.name)));
            }
        }

        for suite in &self.suites {
            if let Some(parent) = &suite.parent {
                if parent.name == suite.name {
                    return Err(Error::Config(format!(
                        "suite '{}' cannot be its own parent",
                        suite.name
                    )));
                }
            }
        }

        for source in &self.synchrotron.source.suites {
            if source.name.is_empty() {
                return Err(Error::Config("sync source suite with empty name".to_string()));
            }
            if source.components.is_empty() {
                return Err(Error::Config(format!(
                    "sync source suite '{}' has no components",
                    source.name
                )));
            }
        }

        if let Some(tag) = &self.synchrotron.distro_tag {
            if tag.trim().is_empty() {
                return Err(Error::Config("distro_tag must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

/// Settings of the archive the engine works on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Root of the target (derivative) archive
    #[serde(default = "default_archive_root")]
    pub archive_root: PathBuf,

    /// Keys trusted to sign the target archive
    #[serde(default = "default_keyring_dir")]
    pub keyring_dir: PathBuf,

    /// Refuse suites whose Release signature does not verify
    #[serde(default = "default_true")]
    pub require_signed_suites: bool,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            archive_root: default_archive_root(),
            keyring_dir: default_keyring_dir(),
            require_signed_suites: true,
        }
    }
}

impl BaseConfig {
    pub fn load_keyring(&self) -> Result<TrustedKeyring> {
        TrustedKeyring::load_dir(&self.keyring_dir)
    }
}

/// One upstream suite feeding synchronization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSourceSuite {
    pub name: String,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub architectures: Vec<String>,
}

impl SyncSourceSuite {
    pub fn has_component(&self, component: &str) -> bool {
        self.components.iter().any(|c| c == component)
    }
}

/// The upstream distribution packages are synchronized from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSource {
    /// Root of the local upstream mirror
    #[serde(default)]
    pub repo_root: PathBuf,

    /// Suite used when no source suite is selected explicitly
    #[serde(default)]
    pub default_suite: Option<String>,

    /// Keys trusted to sign the upstream archive
    #[serde(default)]
    pub keyring_dir: Option<PathBuf>,

    #[serde(default)]
    pub suites: Vec<SyncSourceSuite>,
}

impl SyncSource {
    pub fn suite(&self, name: &str) -> Option<&SyncSourceSuite> {
        self.suites.iter().find(|s| s.name == name)
    }
}

/// Synchronization settings and policy switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchrotronConfig {
    /// Display name of the upstream distribution
    #[serde(default = "default_source_name")]
    pub source_name: String,

    #[serde(default)]
    pub source: SyncSource,

    /// Target suite used when none is named on the command line
    #[serde(default)]
    pub target_suite: Option<String>,

    #[serde(default = "default_true")]
    pub sync_enabled: bool,

    #[serde(default)]
    pub sync_auto_enabled: bool,

    /// Attach the matching upstream binaries to every proposal
    #[serde(default)]
    pub sync_binaries: bool,

    /// Report target packages that vanished upstream during autosync
    #[serde(default)]
    pub auto_cruft_remove: bool,

    /// Version marker of downstream-modified packages (e.g. `pureos`)
    #[serde(default)]
    pub distro_tag: Option<String>,

    /// File listing package names never to synchronize
    #[serde(default)]
    pub blacklist_file: Option<PathBuf>,
}

impl Default for SynchrotronConfig {
    fn default() -> Self {
        Self {
            source_name: default_source_name(),
            source: SyncSource::default(),
            target_suite: None,
            sync_enabled: true,
            sync_auto_enabled: false,
            sync_binaries: false,
            auto_cruft_remove: false,
            distro_tag: None,
            blacklist_file: None,
        }
    }
}

impl SynchrotronConfig {
    /// Keyring for the upstream archive, falling back to the base keyring
    pub fn load_source_keyring(&self, base: &BaseConfig) -> Result<TrustedKeyring> {
        match &self.source.keyring_dir {
            Some(dir) => TrustedKeyring::load_dir(dir),
            None => base.load_keyring(),
        }
    }
}

fn default_archive_root() -> PathBuf {
    PathBuf::from("/srv/archive")
}

fn default_keyring_dir() -> PathBuf {
    PathBuf::from("/etc/synchrotron/keyrings")
}

fn default_source_name() -> String {
    "Debian".to_string()
}

fn default_true() -> bool {
    true
}
