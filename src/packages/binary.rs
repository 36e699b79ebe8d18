// src/packages/binary.rs

use super::{ArchiveFile, DebType, PackagePriority, VersionedPackage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookup key of the source a binary was built from
///
/// A binary never owns its source; the key is resolved against the source
/// records of the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub version: String,
}

impl SourceRef {
    /// Decode the `Source` field of a binary stanza
    ///
    /// The field is either absent (source has the binary's own name and
    /// version), a bare name, or `name (version)` when the source version
    /// differs from the binary version (binNMUs).
    pub fn from_field(field: Option<&str>, binary_name: &str, binary_version: &str) -> Self {
        let Some(raw) = field.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self {
                name: binary_name.to_string(),
                version: binary_version.to_string(),
            };
        };

        match (raw.find('('), raw.find(')')) {
            (Some(open), Some(close)) if open < close => Self {
                name: raw[..open].trim().to_string(),
                version: raw[open + 1..close].trim().to_string(),
            },
            _ => Self {
                name: raw.to_string(),
                version: binary_version.to_string(),
            },
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// Identity of a binary package within a snapshot
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BinaryKey {
    pub name: String,
    pub version: String,
    pub architecture: String,
}

impl fmt::Display for BinaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.name, self.version, self.architecture)
    }
}

/// Raw relationship fields of a binary package, stored verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relations {
    pub depends: Option<String>,
    pub pre_depends: Option<String>,
    pub recommends: Option<String>,
    pub suggests: Option<String>,
    pub enhances: Option<String>,
    pub breaks: Option<String>,
    pub conflicts: Option<String>,
    pub replaces: Option<String>,
    pub provides: Option<String>,
}

impl Relations {
    /// Field names in the order they are conventionally written
    pub const FIELDS: [&'static str; 9] = [
        "Pre-Depends",
        "Depends",
        "Recommends",
        "Suggests",
        "Enhances",
        "Breaks",
        "Conflicts",
        "Replaces",
        "Provides",
    ];

    pub fn slot_mut(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field.to_ascii_lowercase().as_str() {
            "pre-depends" => Some(&mut self.pre_depends),
            "depends" => Some(&mut self.depends),
            "recommends" => Some(&mut self.recommends),
            "suggests" => Some(&mut self.suggests),
            "enhances" => Some(&mut self.enhances),
            "breaks" => Some(&mut self.breaks),
            "conflicts" => Some(&mut self.conflicts),
            "replaces" => Some(&mut self.replaces),
            "provides" => Some(&mut self.provides),
            _ => None,
        }
    }
}

/// A binary package from a `Packages` index
///
/// Unique by (name, version, architecture) within one suite snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryPackage {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub component: String,
    pub deb_type: DebType,
    pub maintainer: String,
    pub section: Option<String>,
    pub priority: PackagePriority,
    pub description: Option<String>,
    pub description_md5: Option<String>,
    pub homepage: Option<String>,
    /// Installed size in KiB
    pub installed_size: u64,
    pub relations: Relations,
    pub file: ArchiveFile,
    pub source: SourceRef,
    /// Fields this parser does not interpret, in original order
    pub extra: Vec<(String, String)>,
}

impl BinaryPackage {
    pub fn key(&self) -> BinaryKey {
        BinaryKey {
            name: self.name.clone(),
            version: self.version.clone(),
            architecture: self.architecture.clone(),
        }
    }

    pub fn extra_field(&self, name: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl VersionedPackage for BinaryPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }
}
