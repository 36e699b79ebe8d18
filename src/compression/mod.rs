// src/compression/mod.rs
//! Transparent decompression of archive index files
//!
//! Debian archives publish every index in several encodings
//! (`Packages.xz`, `Packages.gz`, plain `Packages`). Readers try them in
//! preference order and hand plain bytes to the stanza parser.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Compression-related errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to decompress {format} data from {path}: {source}")]
    Decompression {
        format: &'static str,
        path: String,
        source: io::Error,
    },
}

/// Encodings used for index files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    None,
    Gzip,
    Xz,
}

/// Preference order when several encodings of one index are published
pub const INDEX_PREFERENCE: [CompressionFormat; 3] = [
    CompressionFormat::Xz,
    CompressionFormat::Gzip,
    CompressionFormat::None,
];

impl CompressionFormat {
    /// Detect compression format from magic bytes
    ///
    /// - Gzip: `1f 8b`
    /// - XZ: `fd 37 7a 58 5a 00`
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x1f, 0x8b]) {
            Self::Gzip
        } else if data.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Self::Xz
        } else {
            Self::None
        }
    }

    /// File name suffix for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => ".gz",
            Self::Xz => ".xz",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Candidate paths for an index, most preferred first
///
/// `base` is the uncompressed name, e.g. `dists/sid/main/source/Sources`.
pub fn index_candidates(base: &Path) -> Vec<(PathBuf, CompressionFormat)> {
    INDEX_PREFERENCE
        .iter()
        .map(|format| {
            let mut name = base.as_os_str().to_owned();
            name.push(format.extension());
            (PathBuf::from(name), *format)
        })
        .collect()
}

/// Decompress a byte slice using the specified format
pub fn decompress(
    data: &[u8],
    format: CompressionFormat,
    origin: &str,
) -> Result<Vec<u8>, CompressionError> {
    let mut output = Vec::new();
    let result = match format {
        CompressionFormat::None => {
            output.extend_from_slice(data);
            Ok(output.len())
        }
        CompressionFormat::Gzip => flate2::read::GzDecoder::new(data).read_to_end(&mut output),
        CompressionFormat::Xz => xz2::read::XzDecoder::new(data).read_to_end(&mut output),
    };

    result.map_err(|e| CompressionError::Decompression {
        format: format.name(),
        path: origin.to_string(),
        source: e,
    })?;
    Ok(output)
}
