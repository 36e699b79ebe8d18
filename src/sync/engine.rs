// src/sync/engine.rs

//! Source-to-target synchronization decisions

use super::issue::{IssueKind, ProposalKind, SyncProposal, SyncResult, SynchrotronIssue};
use crate::config::{BaseConfig, SyncSourceSuite, SynchrotronConfig};
use crate::error::{Error, Result};
use crate::packages::{newest_packages_map, BinaryKey, SourcePackage};
use crate::repository::{RepositoryReader, SkippedStanza, SuiteSnapshot, TrustedKeyring, ARCH_ALL};
use crate::suite::SuiteInfo;
use crate::version;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Keyrings used to check the two archives
#[derive(Debug, Clone)]
pub struct TrustContext {
    pub target: Arc<TrustedKeyring>,
    pub source: Arc<TrustedKeyring>,
}

impl TrustContext {
    pub fn new(target: Arc<TrustedKeyring>, source: Arc<TrustedKeyring>) -> Self {
        Self { target, source }
    }

    /// Same keyring for both archives
    pub fn shared(keyring: Arc<TrustedKeyring>) -> Self {
        Self {
            target: Arc::clone(&keyring),
            source: keyring,
        }
    }
}

/// The source currently selected for synchronization
#[derive(Debug, Clone, Serialize)]
pub struct SyncSourceInfo {
    pub source_name: String,
    pub repo_root: PathBuf,
    pub suite: SyncSourceSuite,
}

/// One unit of work: a component of a source suite
struct SyncRequest<'a> {
    source: &'a SyncSourceSuite,
    component: &'a str,
    architectures: &'a [String],
    force: bool,
    /// Restrict the run to these source package names
    only: Option<&'a BTreeSet<String>>,
    report_cruft: bool,
}

/// Outcome of one request before it is handed out
struct Plan {
    result: SyncResult,
    synced: Vec<SourcePackage>,
}

/// Target side of a comparison: newest version per name
struct TargetView {
    newest: BTreeMap<String, SourcePackage>,
    /// Names present in the target suite itself (not only in its parent)
    own: BTreeSet<String>,
    /// Names present downstream whose newest version does not parse
    invalid: BTreeSet<String>,
    issues: Vec<SynchrotronIssue>,
}

/// Compares a source suite against the target suite and proposes syncs
///
/// Configure it (source suite, blacklist) first, then call the sync entry
/// points. The engine keeps no state between calls apart from that
/// configuration and the source packages of the last run.
pub struct SyncEngine {
    base: BaseConfig,
    config: SynchrotronConfig,
    target: SuiteInfo,
    trust: TrustContext,
    source_suite: Option<SyncSourceSuite>,
    blacklist: BTreeSet<String>,
    synced: Vec<SourcePackage>,
}

impl SyncEngine {
    /// Create an engine for `target`
    ///
    /// The source suite defaults to `config.source.default_suite` when that
    /// suite is configured.
    pub fn new(
        base: BaseConfig,
        config: SynchrotronConfig,
        target: SuiteInfo,
        trust: TrustContext,
    ) -> Self {
        let source_suite = config
            .source
            .default_suite
            .as_deref()
            .and_then(|name| config.source.suite(name))
            .cloned();

        Self {
            base,
            config,
            target,
            trust,
            source_suite,
            blacklist: BTreeSet::new(),
            synced: Vec::new(),
        }
    }

    pub fn set_source_suite(&mut self, suite: SyncSourceSuite) {
        self.source_suite = Some(suite);
    }

    /// Select a configured source suite by name
    pub fn set_source_suite_by_name(&mut self, name: &str) -> Result<()> {
        let suite = self.config.source.suite(name).cloned().ok_or_else(|| {
            Error::Config(format!("source suite '{}' is not configured", name))
        })?;
        self.source_suite = Some(suite);
        Ok(())
    }

    /// Package names never to propose or report
    pub fn set_blacklist<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = names.into_iter().map(Into::into).collect();
    }

    pub fn target(&self) -> &SuiteInfo {
        &self.target
    }

    pub fn source_info(&self) -> Option<SyncSourceInfo> {
        self.source_suite.as_ref().map(|suite| SyncSourceInfo {
            source_name: self.config.source_name.clone(),
            repo_root: self.config.source.repo_root.clone(),
            suite: suite.clone(),
        })
    }

    /// Source packages proposed by the last sync call
    pub fn synced_source_packages(&self) -> &[SourcePackage] {
        &self.synced
    }

    /// Compare one component of the selected source suite with the target
    pub fn sync_packages(
        &mut self,
        component: &str,
        architectures: &[String],
        force: bool,
    ) -> Result<SyncResult> {
        let source = self.selected_source()?.clone();
        let plan = self.plan(&SyncRequest {
            source: &source,
            component,
            architectures,
            force,
            only: None,
            report_cruft: false,
        })?;
        Ok(self.finish(plan))
    }

    /// Like [`sync_packages`](Self::sync_packages), limited to named sources
    ///
    /// Requested names missing upstream are reported as `SyncFailed`.
    pub fn sync_selected(
        &mut self,
        component: &str,
        names: &[String],
        force: bool,
    ) -> Result<SyncResult> {
        let source = self.selected_source()?.clone();
        let only: BTreeSet<String> = names.iter().cloned().collect();
        let architectures = self.architectures_for(&source);

        let plan = self.plan(&SyncRequest {
            source: &source,
            component,
            architectures: &architectures,
            force,
            only: Some(&only),
            report_cruft: false,
        })?;
        Ok(self.finish(plan))
    }

    /// Run every configured (source suite, component) pair
    ///
    /// Pairs run in parallel; the merged result keeps configuration order.
    /// Components the target suite lacks are skipped with a warning.
    pub fn autosync(&mut self) -> Result<SyncResult> {
        if !self.config.sync_enabled || !self.config.sync_auto_enabled {
            info!("Autosync is disabled for target suite {}", self.target.name);
            self.synced.clear();
            return Ok(SyncResult::default());
        }

        let mut jobs = Vec::new();
        for source in &self.config.source.suites {
            for component in &source.components {
                if !self.target.has_component(component) {
                    warn!(
                        "Target suite {} has no component {}, not syncing it from {}",
                        self.target.name, component, source.name
                    );
                    continue;
                }
                jobs.push((source, component.as_str(), self.architectures_for(source)));
            }
        }

        let plans = jobs
            .par_iter()
            .map(|(source, component, architectures)| {
                self.plan(&SyncRequest {
                    source,
                    component,
                    architectures,
                    force: false,
                    only: None,
                    report_cruft: self.config.auto_cruft_remove,
                })
            })
            .collect::<Result<Vec<Plan>>>()?;

        let mut merged = Plan {
            result: SyncResult::default(),
            synced: Vec::new(),
        };
        for plan in plans {
            merged.result.extend(plan.result);
            merged.synced.extend(plan.synced);
        }
        Ok(self.finish(merged))
    }

    fn finish(&mut self, plan: Plan) -> SyncResult {
        info!(
            "Sync into {}: {} proposal(s), {} issue(s)",
            self.target.name,
            plan.result.proposals.len(),
            plan.result.issues.len()
        );
        self.synced = plan.synced;
        plan.result
    }

    fn selected_source(&self) -> Result<&SyncSourceSuite> {
        self.source_suite
            .as_ref()
            .ok_or_else(|| Error::Config("no source suite selected".to_string()))
    }

    /// Binary architectures both suites share
    fn architectures_for(&self, source: &SyncSourceSuite) -> Vec<String> {
        self.target
            .binary_architectures()
            .filter(|arch| source.architectures.is_empty() || source.architectures.contains(arch))
            .cloned()
            .collect()
    }

    fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.contains(name)
    }

    /// Whether a target version carries downstream modifications
    fn is_modified_downstream(&self, version: &str) -> bool {
        self.config
            .distro_tag
            .as_deref()
            .map(|tag| version.contains(tag))
            .unwrap_or(false)
    }

    fn source_reader(&self, source: &SyncSourceSuite) -> RepositoryReader {
        RepositoryReader::new(
            &self.config.source.repo_root,
            source.name.as_str(),
            source.components.clone(),
            source.architectures.clone(),
            Arc::clone(&self.trust.source),
        )
        .with_require_signature(self.base.require_signed_suites)
    }

    fn target_reader(&self, suite: &str) -> RepositoryReader {
        RepositoryReader::new(
            &self.base.archive_root,
            suite,
            self.target.components.clone(),
            self.target.architectures.clone(),
            Arc::clone(&self.trust.target),
        )
        .with_require_signature(self.base.require_signed_suites)
    }

    /// Read the target's sources, layered over its parent suite if any
    fn read_target(&self, source: &SyncSourceSuite, component: &str) -> Result<TargetView> {
        let mut issues = Vec::new();
        let mut newest = BTreeMap::new();
        let mut invalid_names = BTreeSet::new();

        if let Some(parent) = &self.target.parent {
            let entries = self.target_reader(&parent.name).get_source_packages(component)?;
            self.skipped_issues(&entries.skipped, &parent.name, component, source, &mut issues);
            let (map, invalid) = newest_packages_map(entries.packages);
            for entry in invalid {
                if !map.contains_key(&entry.package.name) {
                    invalid_names.insert(entry.package.name.clone());
                }
                issues.push(self.issue(
                    IssueKind::InvalidVersion,
                    &entry.package.name,
                    None,
                    Some(&entry.package.version),
                    component,
                    source,
                    format!("in parent suite {}: {}", parent.name, entry.error),
                ));
            }
            debug!("Parent suite {} provides {} source packages", parent.name, map.len());
            newest = map;
        }

        let entries = self.target_reader(&self.target.name).get_source_packages(component)?;
        self.skipped_issues(&entries.skipped, &self.target.name, component, source, &mut issues);
        let (own_map, invalid) = newest_packages_map(entries.packages);
        let mut own: BTreeSet<String> = own_map.keys().cloned().collect();
        for entry in invalid {
            let name = &entry.package.name;
            if !own_map.contains_key(name) {
                // an unreadable own version still shadows the parent's
                newest.remove(name);
                invalid_names.insert(name.clone());
                own.insert(name.clone());
            }
            issues.push(self.issue(
                IssueKind::InvalidVersion,
                name,
                None,
                Some(&entry.package.version),
                component,
                source,
                entry.error.to_string(),
            ));
        }

        for name in own_map.keys() {
            invalid_names.remove(name);
        }
        // the suite's own packages shadow the parent's
        newest.extend(own_map);
        Ok(TargetView {
            newest,
            own,
            invalid: invalid_names,
            issues,
        })
    }

    fn plan(&self, req: &SyncRequest<'_>) -> Result<Plan> {
        let component = req.component;
        if !self.target.has_component(component) {
            return Err(Error::Config(format!(
                "target suite {} has no component {}",
                self.target.name, component
            )));
        }

        info!(
            "Comparing {}/{} with {}/{}",
            req.source.name, component, self.target.name, component
        );

        let mut binary_archs = Vec::new();
        if self.config.sync_binaries {
            binary_archs.extend(req.architectures.iter().filter(|a| *a != ARCH_ALL).cloned());
            binary_archs.push(ARCH_ALL.to_string());
        }
        let upstream = self.source_reader(req.source).snapshot(component, &binary_archs)?;
        let mut target = self.read_target(req.source, component)?;

        let in_scope = |name: &str| req.only.map(|only| only.contains(name)).unwrap_or(true);

        let mut issues = std::mem::take(&mut target.issues);
        self.skipped_issues(&upstream.skipped, &req.source.name, component, req.source, &mut issues);

        let (source_map, invalid) = newest_packages_map(upstream.sources.iter());
        let mut invalid_names = BTreeSet::new();
        for entry in invalid {
            invalid_names.insert(entry.package.name.clone());
            issues.push(self.issue(
                IssueKind::InvalidVersion,
                &entry.package.name,
                Some(&entry.package.version),
                None,
                component,
                req.source,
                entry.error.to_string(),
            ));
        }

        let mut proposals = Vec::new();
        let mut synced = Vec::new();

        for (name, spkg) in &source_map {
            if !in_scope(name) {
                continue;
            }
            if self.is_blacklisted(name) {
                debug!("Skipping blacklisted package {}", name);
                continue;
            }

            let Some(tpkg) = target.newest.get(name) else {
                if target.invalid.contains(name) {
                    debug!(
                        "Not proposing {} {}, the target version is unreadable",
                        name, spkg.version
                    );
                    continue;
                }
                debug!("{} {} is new", name, spkg.version);
                proposals.push(self.proposal(ProposalKind::New, spkg, None, req, &upstream, false));
                synced.push((*spkg).clone());
                continue;
            };

            let ordering = match version::compare(&spkg.version, &tpkg.version) {
                Ok(ordering) => ordering,
                Err(e) => {
                    issues.push(self.issue(
                        IssueKind::InvalidVersion,
                        name,
                        Some(&spkg.version),
                        Some(&tpkg.version),
                        component,
                        req.source,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            let issue_kind = match ordering {
                Ordering::Equal => continue,
                Ordering::Greater if !self.is_modified_downstream(&tpkg.version) => None,
                Ordering::Greater => Some((
                    IssueKind::MergeRequired,
                    format!(
                        "{} {} carries downstream changes, upstream has {}",
                        name, tpkg.version, spkg.version
                    ),
                )),
                Ordering::Less => Some((
                    IssueKind::MergeConflict,
                    format!(
                        "target version {} is newer than source version {}",
                        tpkg.version, spkg.version
                    ),
                )),
            };

            let forced = match issue_kind {
                None => false,
                Some((kind, details)) => {
                    issues.push(self.issue(
                        kind,
                        name,
                        Some(&spkg.version),
                        Some(&tpkg.version),
                        component,
                        req.source,
                        details,
                    ));
                    if !req.force {
                        continue;
                    }
                    true
                }
            };

            proposals.push(self.proposal(
                ProposalKind::Update,
                spkg,
                Some(&tpkg.version),
                req,
                &upstream,
                forced,
            ));
            synced.push((*spkg).clone());
        }

        if let Some(only) = req.only {
            for name in only {
                if source_map.contains_key(name)
                    || invalid_names.contains(name)
                    || self.is_blacklisted(name)
                {
                    continue;
                }
                issues.push(self.issue(
                    IssueKind::SyncFailed,
                    name,
                    None,
                    target.newest.get(name).map(|t| t.version.as_str()),
                    component,
                    req.source,
                    format!("package not found in {}/{}", req.source.name, component),
                ));
            }
        }

        if self.config.sync_binaries {
            self.orphan_issues(&upstream, req, &mut issues);
        }

        if req.report_cruft {
            self.cruft_issues(&target, &source_map, &invalid_names, req, &mut issues);
        }

        issues.retain(|issue| {
            !self.is_blacklisted(&issue.package_name)
                && (issue.kind == IssueKind::SyncFailed || in_scope(&issue.package_name))
        });

        let mut result = SyncResult { proposals, issues };
        result.sort();
        Ok(Plan { result, synced })
    }

    fn proposal(
        &self,
        kind: ProposalKind,
        spkg: &SourcePackage,
        target_version: Option<&str>,
        req: &SyncRequest<'_>,
        upstream: &SuiteSnapshot,
        forced: bool,
    ) -> SyncProposal {
        let binaries = if self.config.sync_binaries {
            let mut keys: Vec<BinaryKey> = upstream
                .binaries_of(&spkg.name, &spkg.version)
                .into_iter()
                .filter(|bin| {
                    bin.architecture == ARCH_ALL || req.architectures.contains(&bin.architecture)
                })
                .map(|bin| bin.key())
                .collect();
            keys.sort();
            keys.dedup();
            keys
        } else {
            Vec::new()
        };

        SyncProposal {
            kind,
            package_name: spkg.name.clone(),
            source_version: spkg.version.clone(),
            target_version: target_version.map(str::to_string),
            component: req.component.to_string(),
            source_suite: req.source.name.clone(),
            target_suite: self.target.name.clone(),
            forced,
            binaries,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn issue(
        &self,
        kind: IssueKind,
        name: &str,
        source_version: Option<&str>,
        target_version: Option<&str>,
        component: &str,
        source: &SyncSourceSuite,
        details: String,
    ) -> SynchrotronIssue {
        SynchrotronIssue {
            kind,
            package_name: name.to_string(),
            source_version: source_version.map(str::to_string),
            target_version: target_version.map(str::to_string),
            component: component.to_string(),
            source_suite: source.name.clone(),
            target_suite: self.target.name.clone(),
            details,
        }
    }

    fn skipped_issues(
        &self,
        skipped: &[SkippedStanza],
        suite: &str,
        component: &str,
        source: &SyncSourceSuite,
        issues: &mut Vec<SynchrotronIssue>,
    ) {
        for skip in skipped {
            issues.push(self.issue(
                IssueKind::MalformedStanza,
                skip.package.as_deref().unwrap_or_default(),
                None,
                None,
                component,
                source,
                format!("{} line {}: {}", suite, skip.line, skip.reason),
            ));
        }
    }

    fn orphan_issues(
        &self,
        upstream: &SuiteSnapshot,
        req: &SyncRequest<'_>,
        issues: &mut Vec<SynchrotronIssue>,
    ) {
        let mut seen = BTreeSet::new();
        for bin in upstream.orphan_binaries() {
            if self.is_blacklisted(&bin.source.name) {
                continue;
            }
            if !seen.insert((bin.name.as_str(), bin.version.as_str())) {
                continue;
            }
            issues.push(self.issue(
                IssueKind::OrphanBinary,
                &bin.name,
                Some(&bin.version),
                None,
                req.component,
                req.source,
                format!(
                    "built from {} which is missing from {}/{}",
                    bin.source, req.source.name, req.component
                ),
            ));
        }
    }

    fn cruft_issues(
        &self,
        target: &TargetView,
        source_map: &BTreeMap<String, &SourcePackage>,
        invalid_names: &BTreeSet<String>,
        req: &SyncRequest<'_>,
        issues: &mut Vec<SynchrotronIssue>,
    ) {
        if self.config.distro_tag.is_none() {
            return;
        }

        for name in &target.own {
            if source_map.contains_key(name) || invalid_names.contains(name) {
                continue;
            }
            let Some(tpkg) = target.newest.get(name) else {
                continue;
            };
            if self.is_modified_downstream(&tpkg.version) {
                continue;
            }
            issues.push(self.issue(
                IssueKind::MaybeCruft,
                name,
                None,
                Some(&tpkg.version),
                req.component,
                req.source,
                format!(
                    "{} {} is gone from {}/{} and was never modified downstream",
                    name, tpkg.version, req.source.name, req.component
                ),
            ));
        }
    }
}
