// src/sync/issue.rs

//! Proposals and issues produced by a sync run

use crate::hash;
use crate::packages::BinaryKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a proposal would do downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalKind {
    /// Package does not exist in the target yet
    New,
    /// Target carries an older version
    Update,
}

impl fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Update => write!(f, "UPDATE"),
        }
    }
}

/// A source package the engine suggests to copy into the target suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProposal {
    pub kind: ProposalKind,
    pub package_name: String,
    pub source_version: String,
    /// Version currently in the target, `None` for NEW
    pub target_version: Option<String>,
    pub component: String,
    pub source_suite: String,
    pub target_suite: String,
    /// Proposed despite an issue because the run was forced
    #[serde(default)]
    pub forced: bool,
    /// Upstream binaries built from this source (only with `sync_binaries`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binaries: Vec<BinaryKey>,
}

impl fmt::Display for SyncProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target_version {
            Some(target) => write!(
                f,
                "{} {} {} -> {} ({})",
                self.kind, self.package_name, target, self.source_version, self.component
            ),
            None => write!(
                f,
                "{} {} {} ({})",
                self.kind, self.package_name, self.source_version, self.component
            ),
        }
    }
}

/// Reason a package needs operator attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    /// Target is ahead of the source; syncing would downgrade it
    MergeConflict,
    /// Source is newer but the target carries downstream changes
    MergeRequired,
    /// A version string could not be parsed or compared
    InvalidVersion,
    /// An index stanza was dropped while reading a suite
    MalformedStanza,
    /// A binary whose source package is missing from its suite
    OrphanBinary,
    /// Target package no longer exists upstream
    MaybeCruft,
    /// An explicitly requested package could not be synchronized
    SyncFailed,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MergeConflict => "merge-conflict",
            Self::MergeRequired => "merge-required",
            Self::InvalidVersion => "invalid-version",
            Self::MalformedStanza => "malformed-stanza",
            Self::OrphanBinary => "orphan-binary",
            Self::MaybeCruft => "maybe-cruft",
            Self::SyncFailed => "sync-failed",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem with one package, reported instead of a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchrotronIssue {
    pub kind: IssueKind,
    pub package_name: String,
    pub source_version: Option<String>,
    pub target_version: Option<String>,
    pub component: String,
    pub source_suite: String,
    pub target_suite: String,
    pub details: String,
}

impl SynchrotronIssue {
    /// Stable identity used to match issues between runs
    ///
    /// Issues without a package name (stanzas lacking `Package`) carry a
    /// short digest of their component and details instead.
    pub fn id(&self) -> String {
        let id = format!(
            "{}-{}-{}:{}",
            self.package_name,
            self.source_version.as_deref().unwrap_or_default(),
            self.target_version.as_deref().unwrap_or_default(),
            self.kind
        );
        if !self.package_name.is_empty() {
            return id;
        }

        let digest = hash::sha256(format!("{}\n{}", self.component, self.details).as_bytes());
        format!("{}@{}", id, &digest[..12])
    }
}

impl fmt::Display for SynchrotronIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.package_name, self.details)
    }
}

/// Outcome of one sync call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub proposals: Vec<SyncProposal>,
    pub issues: Vec<SynchrotronIssue>,
}

impl SyncResult {
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty() && self.issues.is_empty()
    }

    /// Append another result, keeping both orders
    pub fn extend(&mut self, other: SyncResult) {
        self.proposals.extend(other.proposals);
        self.issues.extend(other.issues);
    }

    /// Put proposals and issues in their canonical order
    pub(crate) fn sort(&mut self) {
        self.proposals
            .sort_by(|a, b| a.package_name.cmp(&b.package_name));
        self.issues.sort_by(|a, b| {
            (
                &a.package_name,
                a.kind,
                &a.source_version,
                &a.target_version,
                &a.details,
            )
                .cmp(&(
                    &b.package_name,
                    b.kind,
                    &b.source_version,
                    &b.target_version,
                    &b.details,
                ))
        });
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &SynchrotronIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}
