// src/error.rs

//! Error types shared across the synchronization engine
//!
//! Structural failures (a whole suite cannot be read or trusted) are
//! `Error` values and abort the enclosing call. Per-package anomalies are
//! not errors: they surface as `SynchrotronIssue` entries or skipped
//! stanzas so one broken package never blocks a suite.

use std::path::PathBuf;
use thiserror::Error;

use crate::compression::CompressionError;

/// Errors produced by the archive readers and the sync engine
#[derive(Error, Debug)]
pub enum Error {
    /// None of the candidate files exist (index, Release or signature)
    #[error("File not found: {0}")]
    NotFound(String),

    /// The signed file carries no signature packets at all
    #[error("No signature found in {0}")]
    NoSignature(String),

    /// Content was requested before a successful signature check
    #[error("Content of {0} requested before successful verification")]
    NotVerified(String),

    /// Suite Release file is unsigned or the signature is not trusted
    #[error("Suite '{suite}' in {root} is not properly signed")]
    UnsignedSuite { suite: String, root: PathBuf },

    /// Suite Release file cannot be opened at all
    #[error("Suite '{suite}' not found in repository {root}")]
    SuiteNotFound { suite: String, root: PathBuf },

    /// A single stanza lacks a mandatory field or holds garbage
    #[error("Malformed stanza: {0}")]
    MalformedStanza(String),

    /// Version string cannot be parsed
    #[error("Invalid version format '{version}': {reason}")]
    InvalidVersionFormat { version: String, reason: String },

    /// File contents do not match the digests recorded in the archive
    #[error("Checksum mismatch for {path}: {detail}")]
    ChecksumMismatch { path: String, detail: String },

    /// Trusted keyring could not be loaded
    #[error("Keyring error: {0}")]
    Keyring(String),

    /// Configuration file is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Decompression(#[from] CompressionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
