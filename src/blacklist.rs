// src/blacklist.rs

//! Sync blacklist loading
//!
//! The file lists one package name per line. Anything after `#` is a
//! comment, typically the reason the package is kept out of sync:
//!
//! ```text
//! # branding
//! base-files      # carries our os-release
//! debian-archive-keyring
//! ```

use crate::error::Result;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse blacklist text into a set of package names
pub fn parse_blacklist(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter_map(|line| {
            let entry = line.split('#').next().unwrap_or_default().trim();
            entry
                .split_whitespace()
                .next()
                .map(str::to_string)
        })
        .collect()
}

/// Load a blacklist file
pub fn load_blacklist(path: &Path) -> Result<BTreeSet<String>> {
    let names = parse_blacklist(&fs::read_to_string(path)?);
    debug!("Loaded {} blacklisted package(s) from {}", names.len(), path.display());
    Ok(names)
}
