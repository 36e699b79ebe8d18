// src/version/mod.rs

//! Debian version parsing and ordering
//!
//! Versions have the form `[epoch:]upstream[-revision]` and are ordered
//! exactly like `dpkg --compare-versions`:
//!
//! - epochs compare numerically, a missing epoch is `0`
//! - upstream and revision compare with the dpkg `verrevcmp` rules, where
//!   non-digit runs compare per character (`~` before end of string, letters
//!   before everything else) and digit runs compare numerically
//! - a missing revision is equal to an empty one, so `1.0 == 1.0-0`

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed Debian package version
#[derive(Debug, Clone)]
pub struct DebVersion {
    pub epoch: u64,
    pub upstream: String,
    pub revision: Option<String>,
}

impl DebVersion {
    /// Parse a version string
    ///
    /// Format: [epoch:]upstream[-revision]
    /// Examples:
    /// - "1.2.3" → epoch=0, upstream="1.2.3", revision=None
    /// - "2:1.2.3" → epoch=2, upstream="1.2.3", revision=None
    /// - "1.2-3-4" → epoch=0, upstream="1.2-3", revision=Some("4")
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidVersionFormat {
            version: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("version string is empty"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(invalid("version string has embedded spaces"));
        }

        let (epoch, rest) = match s.split_once(':') {
            Some((epoch_str, rest)) => {
                if epoch_str.is_empty() {
                    return Err(invalid("epoch is empty"));
                }
                if !epoch_str.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("epoch is not a number"));
                }
                let epoch = epoch_str
                    .parse::<u64>()
                    .map_err(|_| invalid("epoch is too large"))?;
                (epoch, rest)
            }
            None => (0, s),
        };

        let (upstream, revision) = match rest.rfind('-') {
            Some(dash_pos) => (&rest[..dash_pos], Some(&rest[dash_pos + 1..])),
            None => (rest, None),
        };

        if upstream.is_empty() {
            return Err(invalid("upstream version is empty"));
        }
        if revision == Some("") {
            return Err(invalid("revision is empty"));
        }

        Ok(Self {
            epoch,
            upstream: upstream.to_string(),
            revision: revision.map(str::to_string),
        })
    }

    /// The Debian revision, or the empty string for native versions
    pub fn revision_str(&self) -> &str {
        self.revision.as_deref().unwrap_or("")
    }

    /// Compare two versions using dpkg semantics
    pub fn compare(&self, other: &DebVersion) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| verrevcmp(self.upstream.as_bytes(), other.upstream.as_bytes()))
            .then_with(|| {
                verrevcmp(self.revision_str().as_bytes(), other.revision_str().as_bytes())
            })
    }
}

/// Compare two version strings
///
/// Both inputs are validated first; an unparseable version yields
/// `Error::InvalidVersionFormat` instead of a silently coerced ordering.
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    let a = DebVersion::parse(a)?;
    let b = DebVersion::parse(b)?;
    Ok(a.compare(&b))
}

/// Weight of a single character in a non-digit run
///
/// End of string and digits weigh 0, `~` sorts before both, letters keep
/// their ASCII value and everything else is pushed after all letters.
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(b'~') => -1,
        Some(c) => i32::from(c) + 256,
    }
}

fn is_digit(c: Option<u8>) -> bool {
    c.is_some_and(|c| c.is_ascii_digit())
}

fn verrevcmp(a: &[u8], b: &[u8]) -> Ordering {
    let (mut i, mut j) = (0, 0);
    let at = |s: &[u8], idx: usize| s.get(idx).copied();

    while i < a.len() || j < b.len() {
        while (at(a, i).is_some() && !is_digit(at(a, i)))
            || (at(b, j).is_some() && !is_digit(at(b, j)))
        {
            let ac = order(at(a, i));
            let bc = order(at(b, j));
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        while at(a, i) == Some(b'0') {
            i += 1;
        }
        while at(b, j) == Some(b'0') {
            j += 1;
        }

        let mut first_diff = Ordering::Equal;
        while is_digit(at(a, i)) && is_digit(at(b, j)) {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        // the longer digit run is the larger number
        if is_digit(at(a, i)) {
            return Ordering::Greater;
        }
        if is_digit(at(b, j)) {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}

impl fmt::Display for DebVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.upstream)?;
        if let Some(ref revision) = self.revision {
            write!(f, "-{}", revision)?;
        }
        Ok(())
    }
}

impl FromStr for DebVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for DebVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for DebVersion {}

impl Ord for DebVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for DebVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        compare(a, b).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let v = DebVersion::parse("1.2.3").unwrap();
        assert_eq!(v.epoch, 0);
        assert_eq!(v.upstream, "1.2.3");
        assert_eq!(v.revision, None);
    }

    #[test]
    fn test_parse_full() {
        let v = DebVersion::parse("1:2.30-4+deb12u1").unwrap();
        assert_eq!(v.epoch, 1);
        assert_eq!(v.upstream, "2.30");
        assert_eq!(v.revision.as_deref(), Some("4+deb12u1"));
    }

    #[test]
    fn test_parse_splits_on_last_dash() {
        let v = DebVersion::parse("1.0-beta-2").unwrap();
        assert_eq!(v.upstream, "1.0-beta");
        assert_eq!(v.revision.as_deref(), Some("2"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(DebVersion::parse("").is_err());
        assert!(DebVersion::parse("a:1.0").is_err());
        assert!(DebVersion::parse(":1.0").is_err());
        assert!(DebVersion::parse("1:").is_err());
        assert!(DebVersion::parse("1.0-").is_err());
        assert!(DebVersion::parse("1.0 2").is_err());

        match compare("x:1", "1") {
            Err(Error::InvalidVersionFormat { version, .. }) => assert_eq!(version, "x:1"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reference_orderings() {
        assert_eq!(cmp("1.0", "1.0-1"), Ordering::Less);
        assert_eq!(cmp("1:0.1", "2.0"), Ordering::Greater);
        assert_eq!(cmp("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(cmp("1.0a", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_tilde_sorts_first() {
        assert_eq!(cmp("1.0~~", "1.0~~a"), Ordering::Less);
        assert_eq!(cmp("1.0~~a", "1.0~"), Ordering::Less);
        assert_eq!(cmp("1.0~", "1.0"), Ordering::Less);
        assert_eq!(cmp("1.0", "1.0a"), Ordering::Less);
        assert_eq!(cmp("2.0~beta1-1", "2.0-1"), Ordering::Less);
    }

    #[test]
    fn test_numeric_runs() {
        assert_eq!(cmp("1.10", "1.9"), Ordering::Greater);
        assert_eq!(cmp("1.001", "1.1"), Ordering::Equal);
        assert_eq!(cmp("1.0-0", "1.0"), Ordering::Equal);
        assert_eq!(cmp("0:1.0", "1.0"), Ordering::Equal);
        assert_eq!(cmp("1.2.3-10", "1.2.3-9"), Ordering::Greater);
    }

    #[test]
    fn test_letters_before_symbols() {
        assert_eq!(cmp("1.0+b1", "1.0a"), Ordering::Greater);
        assert_eq!(cmp("1.0-1ubuntu1", "1.0-1"), Ordering::Greater);
        assert_eq!(cmp("1.0-1pureos1", "1.0-1+deb12u1"), Ordering::Less);
    }

    #[test]
    fn test_reflexive_and_antisymmetric() {
        let versions = [
            "1.0", "1.0-1", "1:0.9", "1.0~rc1", "1.0a", "1.0.1", "2.0+dfsg-3", "0.0.0~git1",
        ];
        for a in versions {
            assert_eq!(cmp(a, a), Ordering::Equal);
            for b in versions {
                assert_eq!(cmp(a, b), cmp(b, a).reverse(), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_sorting() {
        let mut versions: Vec<DebVersion> = ["1.0", "1.0~rc1", "1:0.1", "1.0-1", "0.9"]
            .iter()
            .map(|v| DebVersion::parse(v).unwrap())
            .collect();
        versions.sort();
        let sorted: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(sorted, vec!["0.9", "1.0~rc1", "1.0", "1.0-1", "1:0.1"]);
    }

    #[test]
    fn test_display_roundtrip() {
        for s in ["1.2.3", "2:1.2.3-4", "1.0-beta-2"] {
            assert_eq!(DebVersion::parse(s).unwrap().to_string(), s);
        }
    }
}
