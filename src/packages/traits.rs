// src/packages/traits.rs

//! Shared behaviour of source and binary records

use crate::error::Error;
use crate::version;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Anything identified by a package name and a Debian version
pub trait VersionedPackage {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
}

/// A record dropped from a name map because its version does not parse
#[derive(Debug)]
pub struct InvalidVersionEntry<T> {
    pub package: T,
    pub error: Error,
}

/// Collapse records into a name-keyed map holding only the highest version
///
/// Records whose version cannot be parsed are returned separately so callers
/// can report them; they never take part in the ordering.
pub fn newest_packages_map<T, I>(packages: I) -> (BTreeMap<String, T>, Vec<InvalidVersionEntry<T>>)
where
    T: VersionedPackage,
    I: IntoIterator<Item = T>,
{
    let mut newest: BTreeMap<String, (version::DebVersion, T)> = BTreeMap::new();
    let mut invalid = Vec::new();

    for pkg in packages {
        let parsed = match version::DebVersion::parse(pkg.version()) {
            Ok(v) => v,
            Err(error) => {
                invalid.push(InvalidVersionEntry { package: pkg, error });
                continue;
            }
        };

        let replace = match newest.get(pkg.name()) {
            Some((existing, _)) => parsed.compare(existing) == Ordering::Greater,
            None => true,
        };
        if replace {
            newest.insert(pkg.name().to_string(), (parsed, pkg));
        }
    }

    let newest = newest.into_iter().map(|(name, (_, pkg))| (name, pkg)).collect();
    (newest, invalid)
}
