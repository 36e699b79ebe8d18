// src/hash.rs

//! Checksum algorithms used by Debian archive metadata
//!
//! Index files name each digest list by algorithm:
//!
//! | Algorithm | Release field | Sources field      | Packages field |
//! |-----------|---------------|--------------------|----------------|
//! | MD5       | `MD5Sum`      | `Files`            | `MD5sum`       |
//! | SHA-1     | `SHA1`        | `Checksums-Sha1`   | `SHA1`         |
//! | SHA-256   | `SHA256`      | `Checksums-Sha256` | `SHA256`       |
//! | SHA-512   | `SHA512`      | `Checksums-Sha512` | `SHA512`       |

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;

/// Digest algorithm of an archive checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    /// All algorithms, strongest first
    pub const ALL: [ChecksumAlgorithm; 4] = [
        ChecksumAlgorithm::Sha512,
        ChecksumAlgorithm::Sha256,
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Md5,
    ];

    /// Length of the hex digest
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Field holding the file list in a Release file
    pub const fn release_field(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5Sum",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    /// Field holding the file list in a Sources stanza
    pub const fn sources_field(&self) -> &'static str {
        match self {
            Self::Md5 => "Files",
            Self::Sha1 => "Checksums-Sha1",
            Self::Sha256 => "Checksums-Sha256",
            Self::Sha512 => "Checksums-Sha512",
        }
    }

    /// Field holding the single digest in a Packages stanza
    pub const fn packages_field(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5sum",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" | "md5sum" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(format!("unknown checksum algorithm: {}", s)),
        }
    }
}

/// Check that a digest string is plausible for the algorithm
pub fn is_valid_digest(algorithm: ChecksumAlgorithm, digest: &str) -> bool {
    digest.len() == algorithm.hex_len() && digest.chars().all(|c| c.is_ascii_hexdigit())
}

/// Compute the lowercase hex digest of a byte slice
pub fn hash_bytes(algorithm: ChecksumAlgorithm, data: &[u8]) -> String {
    match algorithm {
        ChecksumAlgorithm::Md5 => format!("{:x}", Md5::digest(data)),
        ChecksumAlgorithm::Sha1 => format!("{:x}", Sha1::digest(data)),
        ChecksumAlgorithm::Sha256 => format!("{:x}", Sha256::digest(data)),
        ChecksumAlgorithm::Sha512 => format!("{:x}", Sha512::digest(data)),
    }
}

/// Compute SHA-256 hex digest
#[inline]
pub fn sha256(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
