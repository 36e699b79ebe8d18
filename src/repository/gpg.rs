// src/repository/gpg.rs

//! Trusted OpenPGP keyring
//!
//! The keyring is loaded once and then shared read-only (`Arc`) with every
//! `SignedFile` that needs it. Nothing in the crate mutates a keyring after
//! construction; tests build their own with throwaway keys.

use crate::error::{Error, Result};
use openpgp::cert::prelude::*;
use openpgp::parse::Parse;
use openpgp::KeyHandle;
use sequoia_openpgp as openpgp;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extensions recognised as keyring files
const KEYRING_EXTENSIONS: &[&str] = &["gpg", "asc", "pgp"];

/// Immutable set of certificates trusted to sign archive metadata
#[derive(Debug, Clone, Default)]
pub struct TrustedKeyring {
    certs: Vec<Cert>,
}

impl TrustedKeyring {
    /// A keyring trusting nobody
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_certs(certs: impl IntoIterator<Item = Cert>) -> Self {
        let mut keyring = Self::empty();
        for cert in certs {
            keyring.insert(cert);
        }
        keyring
    }

    /// Parse binary or armored keyring data holding one or more certificates
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let parser = CertParser::from_bytes(data)
            .map_err(|e| Error::Keyring(format!("Failed to parse keyring: {}", e)))?;
        let certs = parser
            .collect::<openpgp::Result<Vec<Cert>>>()
            .map_err(|e| Error::Keyring(format!("Failed to parse certificate: {}", e)))?;
        if certs.is_empty() {
            return Err(Error::Keyring("no certificates found".to_string()));
        }
        Ok(Self::from_certs(certs))
    }

    /// Load and merge several keyring files
    pub fn load_files(paths: &[PathBuf]) -> Result<Self> {
        let mut keyring = Self::empty();
        for path in paths {
            let data = fs::read(path).map_err(|e| {
                Error::Keyring(format!("Failed to read keyring {}: {}", path.display(), e))
            })?;
            let loaded = Self::from_bytes(&data).map_err(|e| {
                Error::Keyring(format!("{}: {}", path.display(), e))
            })?;
            debug!("Loaded {} certificate(s) from {}", loaded.len(), path.display());
            keyring = keyring.merge(&loaded);
        }
        Ok(keyring)
    }

    /// Load every `*.gpg`, `*.asc` and `*.pgp` file of a directory
    ///
    /// Files are read in name order. A missing directory yields an empty
    /// keyring with a warning, so an unsigned test archive can still be read
    /// when signatures are not required.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            warn!("Keyring directory {} does not exist", dir.display());
            return Ok(Self::empty());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_keyring = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| KEYRING_EXTENSIONS.contains(&e))
                .unwrap_or(false);
            if is_keyring && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let keyring = Self::load_files(&paths)?;
        info!(
            "Loaded trusted keyring from {} ({} certificate(s))",
            dir.display(),
            keyring.len()
        );
        Ok(keyring)
    }

    fn insert(&mut self, cert: Cert) {
        match self
            .certs
            .iter_mut()
            .find(|c| c.fingerprint() == cert.fingerprint())
        {
            Some(existing) => {
                // same key seen twice: combine signatures and subkeys
                if let Ok(merged) = existing.clone().merge_public(cert) {
                    *existing = merged;
                }
            }
            None => self.certs.push(cert),
        }
    }

    /// Union of two keyrings
    pub fn merge(&self, other: &TrustedKeyring) -> Self {
        let mut merged = self.clone();
        for cert in &other.certs {
            merged.insert(cert.clone());
        }
        merged
    }

    pub fn certs(&self) -> &[Cert] {
        &self.certs
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Primary key fingerprints (uppercase hex), sorted
    pub fn fingerprints(&self) -> Vec<String> {
        self.certs
            .iter()
            .map(|c| c.fingerprint().to_hex())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Find the certificate owning a key (primary or subkey)
    pub fn lookup(&self, handle: &KeyHandle) -> Option<&Cert> {
        self.certs
            .iter()
            .find(|cert| cert.keys().any(|k| k.key().key_handle().aliases(handle)))
    }
}
