// src/packages/source.rs

use super::{ArchiveFile, PackageInfo, VersionedPackage};
use serde::{Deserialize, Serialize};

/// A source package from a `Sources` index
///
/// Unique by (name, version) within one suite snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePackage {
    pub name: String,
    pub version: String,
    pub component: String,
    /// Architectures the source builds for (`any`, `all`, or a list)
    pub architectures: Vec<String>,
    pub format_version: Option<String>,
    pub standards_version: String,
    pub maintainer: String,
    pub uploaders: Vec<String>,
    pub section: Option<String>,
    pub homepage: Option<String>,
    pub vcs_browser: Option<String>,
    /// Raw `Build-Depends` relation string, never resolved here
    pub build_depends: Option<String>,
    pub build_depends_indep: Option<String>,
    pub build_depends_arch: Option<String>,
    pub build_conflicts: Option<String>,
    /// Pool directory holding the files
    pub directory: String,
    pub files: Vec<ArchiveFile>,
    /// Binaries this source declares (from `Package-List` or `Binary`)
    pub binaries: Vec<PackageInfo>,
    /// Fields this parser does not interpret, in original order
    pub extra: Vec<(String, String)>,
}

impl SourcePackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            component: component.into(),
            architectures: Vec::new(),
            format_version: None,
            standards_version: "0~notset".to_string(),
            maintainer: String::new(),
            uploaders: Vec::new(),
            section: None,
            homepage: None,
            vcs_browser: None,
            build_depends: None,
            build_depends_indep: None,
            build_depends_arch: None,
            build_conflicts: None,
            directory: String::new(),
            files: Vec::new(),
            binaries: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// The `.dsc` control file of this source, if listed
    pub fn dsc_file(&self) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.path.ends_with(".dsc"))
    }

    /// Look up an uninterpreted field by name (case-insensitive)
    pub fn extra_field(&self, name: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl VersionedPackage for SourcePackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }
}

impl VersionedPackage for &SourcePackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }
}
