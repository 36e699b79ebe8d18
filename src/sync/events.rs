// src/sync/events.rs

//! Events describing a sync run for a message relay
//!
//! The engine only builds these values; publishing them is up to the
//! caller.

use super::issue::{SyncResult, SynchrotronIssue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Payload shared by the issue events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEventData {
    pub name: String,
    pub src_os: String,
    pub suite_src: String,
    pub suite_dest: String,
    pub version_src: Option<String>,
    pub version_dest: Option<String>,
    pub kind: String,
}

impl IssueEventData {
    fn new(issue: &SynchrotronIssue, src_os: &str) -> Self {
        Self {
            name: issue.package_name.clone(),
            src_os: src_os.to_string(),
            suite_src: issue.source_suite.clone(),
            suite_dest: issue.target_suite.clone(),
            version_src: issue.source_version.clone(),
            version_dest: issue.target_version.clone(),
            kind: issue.kind.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", content = "data", rename_all = "kebab-case")]
pub enum SyncEvent {
    /// A source package was proposed for import
    SrcPackageImported {
        name: String,
        version: String,
        src_os: String,
        suite_src: String,
        suite_dest: String,
        forced: bool,
    },
    /// An issue appeared that the previous run did not report
    NewAutosyncIssue(IssueEventData),
    /// An issue of the previous run is gone
    ResolvedAutosyncIssue(IssueEventData),
}

impl SyncEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SrcPackageImported { .. } => "src-package-imported",
            Self::NewAutosyncIssue(_) => "new-autosync-issue",
            Self::ResolvedAutosyncIssue(_) => "resolved-autosync-issue",
        }
    }

    /// One import event per proposal
    pub fn imported(result: &SyncResult, src_os: &str) -> Vec<SyncEvent> {
        result
            .proposals
            .iter()
            .map(|p| SyncEvent::SrcPackageImported {
                name: p.package_name.clone(),
                version: p.source_version.clone(),
                src_os: src_os.to_string(),
                suite_src: p.source_suite.clone(),
                suite_dest: p.target_suite.clone(),
                forced: p.forced,
            })
            .collect()
    }

    /// Compare the issues of two runs by `SynchrotronIssue::id`
    ///
    /// New issues come first in `current` order, then resolved ones in
    /// `previous` order.
    pub fn issue_changes(
        previous: &[SynchrotronIssue],
        current: &[SynchrotronIssue],
        src_os: &str,
    ) -> Vec<SyncEvent> {
        let mut remaining: BTreeMap<String, &SynchrotronIssue> =
            previous.iter().map(|i| (i.id(), i)).collect();

        let mut events = Vec::new();
        for issue in current {
            if remaining.remove(&issue.id()).is_none() {
                events.push(SyncEvent::NewAutosyncIssue(IssueEventData::new(issue, src_os)));
            }
        }
        for issue in previous {
            if remaining.remove(&issue.id()).is_some() {
                events.push(SyncEvent::ResolvedAutosyncIssue(IssueEventData::new(
                    issue, src_os,
                )));
            }
        }
        events
    }
}
