// src/packages/archive_file.rs

//! File entries referenced from archive indices

use crate::error::{Error, Result};
use crate::hash::{self, ChecksumAlgorithm};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single file listed in an index (pool file, or index file in a Release)
///
/// One entry may carry digests from several algorithms. They are merged by
/// path while parsing; all of them must describe the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFile {
    /// Path relative to the repository root (pool files) or suite dir (indices)
    pub path: String,
    pub size: u64,
    pub checksums: BTreeMap<ChecksumAlgorithm, String>,
}

impl ArchiveFile {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            checksums: BTreeMap::new(),
        }
    }

    /// Builder-style helper used by parsers and tests
    pub fn with_checksum(mut self, algorithm: ChecksumAlgorithm, digest: impl Into<String>) -> Self {
        self.checksums.insert(algorithm, digest.into().to_lowercase());
        self
    }

    pub fn checksum(&self, algorithm: ChecksumAlgorithm) -> Option<&str> {
        self.checksums.get(&algorithm).map(String::as_str)
    }

    /// Strongest digest available, e.g. for logging
    pub fn strongest_checksum(&self) -> Option<(ChecksumAlgorithm, &str)> {
        ChecksumAlgorithm::ALL
            .iter()
            .find_map(|alg| self.checksum(*alg).map(|d| (*alg, d)))
    }

    /// Record a digest for this file
    ///
    /// Fails if the same algorithm was already recorded with another value
    /// or if `size` disagrees with the size seen before.
    pub fn add_checksum(&mut self, algorithm: ChecksumAlgorithm, digest: &str, size: u64) -> Result<()> {
        if size != self.size {
            return Err(Error::MalformedStanza(format!(
                "size of {} listed as both {} and {}",
                self.path, self.size, size
            )));
        }

        let digest = digest.to_lowercase();
        match self.checksums.get(&algorithm) {
            Some(existing) if *existing != digest => Err(Error::MalformedStanza(format!(
                "conflicting {} digests for {}",
                algorithm, self.path
            ))),
            Some(_) => Ok(()),
            None => {
                self.checksums.insert(algorithm, digest);
                Ok(())
            }
        }
    }

    /// Verify file contents against the recorded size and digests
    ///
    /// Every recorded digest must match; a file with no digest at all is
    /// rejected, since nothing vouches for it.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        if data.len() as u64 != self.size {
            return Err(Error::ChecksumMismatch {
                path: self.path.clone(),
                detail: format!("expected {} bytes, found {}", self.size, data.len()),
            });
        }

        if self.checksums.is_empty() {
            return Err(Error::ChecksumMismatch {
                path: self.path.clone(),
                detail: "no checksum recorded".to_string(),
            });
        }

        for (algorithm, expected) in &self.checksums {
            let actual = hash::hash_bytes(*algorithm, data);
            if actual != *expected {
                return Err(Error::ChecksumMismatch {
                    path: self.path.clone(),
                    detail: format!("{} expected {}, got {}", algorithm, expected, actual),
                });
            }
        }
        Ok(())
    }
}

/// Parse a checksum list field (`<digest> <size> <name>` per line)
///
/// Lines that do not have exactly three columns are ignored, matching how
/// archive tools treat the empty first line of multi-line fields. `prefix`
/// is joined in front of each name (the `Directory` of a source package).
pub fn parse_checksum_lines(
    algorithm: ChecksumAlgorithm,
    raw: &str,
    prefix: Option<&str>,
) -> Result<Vec<(String, u64, String)>> {
    let mut entries = Vec::new();
    for line in raw.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            continue;
        }

        let digest = parts[0];
        if !hash::is_valid_digest(algorithm, digest) {
            return Err(Error::MalformedStanza(format!(
                "invalid {} digest '{}' for {}",
                algorithm, digest, parts[2]
            )));
        }
        let size = parts[1].parse::<u64>().map_err(|_| {
            Error::MalformedStanza(format!("invalid size '{}' for {}", parts[1], parts[2]))
        })?;
        let path = match prefix {
            Some(dir) if !dir.is_empty() => format!("{}/{}", dir.trim_end_matches('/'), parts[2]),
            _ => parts[2].to_string(),
        };
        entries.push((path, size, digest.to_lowercase()));
    }
    Ok(entries)
}

/// Merge several per-algorithm checksum lists into file entries
///
/// Order follows first appearance, so the `.dsc` listed first stays first.
pub fn merge_checksum_lists(
    lists: Vec<(ChecksumAlgorithm, Vec<(String, u64, String)>)>,
) -> Result<Vec<ArchiveFile>> {
    let mut files: Vec<ArchiveFile> = Vec::new();
    for (algorithm, entries) in lists {
        for (path, size, digest) in entries {
            match files.iter_mut().find(|f| f.path == path) {
                Some(existing) => existing.add_checksum(algorithm, &digest, size)?,
                None => files.push(ArchiveFile::new(path, size).with_checksum(algorithm, digest)),
            }
        }
    }
    Ok(files)
}
