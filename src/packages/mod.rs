// src/packages/mod.rs

//! Package records parsed from archive indices
//!
//! Records are plain data: they are created by the index parser, never
//! mutated afterwards, and refer to each other only through lookup keys
//! (`SourceRef`, `BinaryKey`) resolved against the snapshot they came from.

mod archive_file;
mod binary;
mod source;
pub mod traits;

pub use archive_file::{merge_checksum_lists, parse_checksum_lines, ArchiveFile};
pub use binary::{BinaryKey, BinaryPackage, Relations, SourceRef};
pub use source::SourcePackage;
pub use traits::{newest_packages_map, InvalidVersionEntry, VersionedPackage};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a record describes a source or a binary package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Source,
    Binary,
}

/// Binary package flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebType {
    #[default]
    Deb,
    /// Installer package, only used by the debian-installer
    Udeb,
}

impl DebType {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim() {
            "deb" => Some(Self::Deb),
            "udeb" => Some(Self::Udeb),
            _ => None,
        }
    }
}

impl fmt::Display for DebType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deb => write!(f, "deb"),
            Self::Udeb => write!(f, "udeb"),
        }
    }
}

/// Debian package priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagePriority {
    #[default]
    Unknown,
    Required,
    Important,
    Standard,
    Optional,
    Extra,
}

impl PackagePriority {
    pub fn from_name(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "required" => Self::Required,
            "important" => Self::Important,
            "standard" => Self::Standard,
            "optional" => Self::Optional,
            "extra" => Self::Extra,
            _ => Self::Unknown,
        }
    }
}

/// Lightweight summary of a package
///
/// Used for the binaries a source package declares (`Binary`/`Package-List`)
/// and anywhere a full record would be overkill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub kind: PackageKind,
    pub deb_type: DebType,
    pub section: Option<String>,
    pub priority: PackagePriority,
    /// Architectures restriction from `arch=` in a Package-List line
    pub architectures: Vec<String>,
}

impl PackageInfo {
    pub fn binary(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            kind: PackageKind::Binary,
            deb_type: DebType::Deb,
            section: None,
            priority: PackagePriority::Unknown,
            architectures: Vec::new(),
        }
    }

    /// Parse a `Package-List` field into summaries
    ///
    /// Each line reads `name type section priority [key=value ...]`; lines
    /// with fewer than four columns are ignored.
    pub fn parse_package_list(raw: &str, version: &str) -> Vec<PackageInfo> {
        raw.lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 4 {
                    return None;
                }

                let mut info = PackageInfo::binary(parts[0], version);
                info.deb_type = DebType::from_name(parts[1]).unwrap_or_default();
                info.section = Some(parts[2].to_string());
                info.priority = PackagePriority::from_name(parts[3]);
                for extra in &parts[4..] {
                    if let Some(arches) = extra.strip_prefix("arch=") {
                        info.architectures = arches.split(',').map(str::to_string).collect();
                    }
                }
                Some(info)
            })
            .collect()
    }
}

/// Split a whitespace separated list field
pub(crate) fn split_words(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Split a comma separated list field, dropping empty entries
pub(crate) fn split_commas(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
