// src/lib.rs

//! Synchrotron
//!
//! Keeps a derivative distribution in step with its upstream by comparing
//! package archives suite by suite.
//!
//! # Architecture
//!
//! - Trust first: suite Release files are signature-checked against an
//!   explicitly passed keyring before any index is parsed
//! - Indices are verified against the Release digests, then parsed into
//!   immutable package records
//! - Versions order exactly like dpkg
//! - The sync engine only decides; it never writes to an archive

pub mod blacklist;
pub mod compression;
pub mod config;
mod error;
pub mod hash;
pub mod packages;
pub mod repository;
pub mod suite;
pub mod sync;
pub mod version;

pub use config::{BaseConfig, Config, SyncSource, SyncSourceSuite, SynchrotronConfig};
pub use error::{Error, Result};
pub use packages::{ArchiveFile, BinaryPackage, PackageInfo, SourcePackage};
pub use repository::{RepositoryReader, SignedFile, SuiteSnapshot, TrustedKeyring};
pub use suite::{ParentSuiteInfo, SuiteInfo};
pub use sync::{
    IssueKind, ProposalKind, SyncEngine, SyncEvent, SyncProposal, SyncResult, SynchrotronIssue,
    TrustContext,
};
pub use version::DebVersion;
