// src/repository/snapshot.rs

//! Point-in-time view of one suite component

use super::parsers::SkippedStanza;
use crate::packages::{BinaryPackage, SourcePackage, SourceRef};
use crate::version;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Packages of one (suite, component) as read from disk
///
/// Never updated in place; a fresh read produces a fresh snapshot. Binaries
/// refer to their source through `SourceRef`, resolved here by lookup.
/// Versions are matched by dpkg equality, so `0:1.0` finds `1.0`.
#[derive(Debug, Clone, Default)]
pub struct SuiteSnapshot {
    pub suite: String,
    pub component: String,
    pub sources: Vec<SourcePackage>,
    pub binaries: Vec<BinaryPackage>,
    /// Stanzas dropped from any index that fed this snapshot
    pub skipped: Vec<SkippedStanza>,
    /// Source name to positions in `sources`
    source_index: HashMap<String, Vec<usize>>,
}

/// dpkg equality, falling back to the literal text for unparsable versions
fn same_version(a: &str, b: &str) -> bool {
    match version::compare(a, b) {
        Ok(ord) => ord == Ordering::Equal,
        Err(_) => a == b,
    }
}

impl SuiteSnapshot {
    pub fn new(
        suite: impl Into<String>,
        component: impl Into<String>,
        sources: Vec<SourcePackage>,
        binaries: Vec<BinaryPackage>,
        skipped: Vec<SkippedStanza>,
    ) -> Self {
        let mut source_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, src) in sources.iter().enumerate() {
            source_index.entry(src.name.clone()).or_default().push(idx);
        }

        Self {
            suite: suite.into(),
            component: component.into(),
            sources,
            binaries,
            skipped,
            source_index,
        }
    }

    pub fn source(&self, name: &str, version: &str) -> Option<&SourcePackage> {
        self.source_index
            .get(name)?
            .iter()
            .map(|&idx| &self.sources[idx])
            .find(|src| same_version(&src.version, version))
    }

    /// Source record a binary was built from, if present in this snapshot
    pub fn resolve_source(&self, binary: &BinaryPackage) -> Option<&SourcePackage> {
        self.source(&binary.source.name, &binary.source.version)
    }

    /// Binaries whose source back-reference resolves to nothing
    pub fn orphan_binaries(&self) -> Vec<&BinaryPackage> {
        self.binaries
            .iter()
            .filter(|bin| self.resolve_source(bin).is_none())
            .collect()
    }

    /// Binaries built from a given source version
    pub fn binaries_of(&self, name: &str, version: &str) -> Vec<&BinaryPackage> {
        self.binaries
            .iter()
            .filter(|bin| bin.source.name == name && same_version(&bin.source.version, version))
            .collect()
    }
}
