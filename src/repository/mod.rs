// src/repository/mod.rs

//! Archive access
//!
//! This module provides functionality for:
//! - Loading the trusted OpenPGP keyring
//! - Opening signed Release files and checking their signatures
//! - Parsing Release, Sources and Packages indices
//! - Reading per-component snapshots of a local archive

pub mod gpg;
pub mod parsers;
mod reader;
pub mod signedfile;
mod snapshot;

pub use gpg::TrustedKeyring;
pub use parsers::{
    parse_stanzas, IndexEntries, IndexKind, IndexParser, ParsedIndex, ReleaseFile, SkippedStanza,
    Stanza,
};
pub use reader::{RepositoryReader, ARCH_ALL};
pub use signedfile::{SignatureLayout, SignedFile};
pub use snapshot::SuiteSnapshot;
