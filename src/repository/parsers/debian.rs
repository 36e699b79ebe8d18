// src/repository/parsers/debian.rs

//! Debian archive index decoding
//!
//! Turns `Release`, `Sources` and `Packages` stanzas into typed records.
//! Bytes handed to the parser are already decompressed; trust is
//! established by the caller before parsing.

use super::{parse_stanzas, SkippedStanza, Stanza};
use crate::error::{Error, Result};
use crate::hash::{self, ChecksumAlgorithm};
use crate::packages::{
    merge_checksum_lists, parse_checksum_lines, split_commas, split_words, ArchiveFile,
    BinaryPackage, DebType, PackageInfo, PackagePriority, Relations, SourcePackage, SourceRef,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Kind of index document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Release,
    Packages,
    Sources,
}

impl IndexKind {
    /// Base file name of the index inside a suite
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Release => "Release",
            Self::Packages => "Packages",
            Self::Sources => "Sources",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Records decoded from a package index, plus the stanzas that were dropped
#[derive(Debug, Clone, Serialize)]
pub struct IndexEntries<T> {
    pub packages: Vec<T>,
    pub skipped: Vec<SkippedStanza>,
}

impl<T> Default for IndexEntries<T> {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Result of parsing one index document
#[derive(Debug, Clone)]
pub enum ParsedIndex {
    Release(ReleaseFile),
    Sources(IndexEntries<SourcePackage>),
    Packages(IndexEntries<BinaryPackage>),
}

impl ParsedIndex {
    pub fn kind(&self) -> IndexKind {
        match self {
            Self::Release(_) => IndexKind::Release,
            Self::Sources(_) => IndexKind::Sources,
            Self::Packages(_) => IndexKind::Packages,
        }
    }

    pub fn into_release(self) -> Option<ReleaseFile> {
        match self {
            Self::Release(release) => Some(release),
            _ => None,
        }
    }

    pub fn into_sources(self) -> Option<IndexEntries<SourcePackage>> {
        match self {
            Self::Sources(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn into_packages(self) -> Option<IndexEntries<BinaryPackage>> {
        match self {
            Self::Packages(entries) => Some(entries),
            _ => None,
        }
    }
}

/// Decoded top-level `Release` file of a suite
#[derive(Debug, Clone)]
pub struct ReleaseFile {
    pub suite: Option<String>,
    pub codename: Option<String>,
    pub version: Option<String>,
    pub origin: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub architectures: Vec<String>,
    pub components: Vec<String>,
    pub acquire_by_hash: bool,
    /// Index files listed in the checksum sections, merged by path
    pub files: Vec<ArchiveFile>,
    /// The complete stanza, unknown fields included
    pub stanza: Stanza,
}

impl ReleaseFile {
    /// Look up an index file by its path relative to the suite directory
    pub fn file(&self, path: &str) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Whether `Valid-Until` lies before `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map(|until| until < now).unwrap_or(false)
    }
}

const SOURCE_FIELDS: &[&str] = &[
    "Package",
    "Version",
    "Architecture",
    "Format",
    "Standards-Version",
    "Maintainer",
    "Uploaders",
    "Section",
    "Homepage",
    "Vcs-Browser",
    "Build-Depends",
    "Build-Depends-Indep",
    "Build-Depends-Arch",
    "Build-Conflicts",
    "Directory",
    "Files",
    "Checksums-Sha1",
    "Checksums-Sha256",
    "Checksums-Sha512",
    "Binary",
    "Package-List",
];

const BINARY_FIELDS: &[&str] = &[
    "Package",
    "Version",
    "Architecture",
    "Source",
    "Maintainer",
    "Section",
    "Priority",
    "Description",
    "Description-md5",
    "Homepage",
    "Installed-Size",
    "Package-Type",
    "Filename",
    "Size",
    "MD5sum",
    "SHA1",
    "SHA256",
    "SHA512",
    "Pre-Depends",
    "Depends",
    "Recommends",
    "Suggests",
    "Enhances",
    "Breaks",
    "Conflicts",
    "Replaces",
    "Provides",
];

/// Parser for archive indices of one component
pub struct IndexParser {
    component: String,
}

impl IndexParser {
    /// `component` is recorded on every package record produced
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Parse decompressed index bytes
    ///
    /// Only a broken `Release` file is an error; package indices report
    /// broken stanzas through `IndexEntries::skipped`.
    pub fn parse(&self, bytes: &[u8], kind: IndexKind) -> Result<ParsedIndex> {
        let text = String::from_utf8_lossy(bytes);
        match kind {
            IndexKind::Release => self.parse_release(&text).map(ParsedIndex::Release),
            IndexKind::Sources => Ok(ParsedIndex::Sources(self.parse_sources(&text))),
            IndexKind::Packages => Ok(ParsedIndex::Packages(self.parse_packages(&text))),
        }
    }

    pub fn parse_release(&self, text: &str) -> Result<ReleaseFile> {
        let (mut stanzas, skipped) = parse_stanzas(text);
        if let Some(bad) = skipped.first() {
            return Err(Error::MalformedStanza(format!("Release file: {}", bad)));
        }
        if stanzas.is_empty() {
            return Err(Error::MalformedStanza("Release file is empty".to_string()));
        }
        let stanza = stanzas.swap_remove(0);

        let mut lists = Vec::new();
        for algorithm in ChecksumAlgorithm::ALL {
            if let Some(raw) = stanza.get(algorithm.release_field()) {
                lists.push((algorithm, parse_checksum_lines(algorithm, raw, None)?));
            }
        }
        let files = merge_checksum_lists(lists)?;

        let text_field = |name: &str| stanza.get_trimmed(name).map(str::to_string);
        let release = ReleaseFile {
            suite: text_field("Suite"),
            codename: text_field("Codename"),
            version: text_field("Version"),
            origin: text_field("Origin"),
            label: text_field("Label"),
            description: text_field("Description"),
            date: stanza.get_trimmed("Date").and_then(|d| parse_date("Date", d)),
            valid_until: stanza
                .get_trimmed("Valid-Until")
                .and_then(|d| parse_date("Valid-Until", d)),
            architectures: split_words(stanza.get("Architectures")),
            components: split_words(stanza.get("Components")),
            acquire_by_hash: stanza
                .get_trimmed("Acquire-By-Hash")
                .map(|v| v.eq_ignore_ascii_case("yes"))
                .unwrap_or(false),
            files,
            stanza,
        };
        debug!(
            "Parsed Release for suite {:?}: {} index files",
            release.suite,
            release.files.len()
        );
        Ok(release)
    }

    pub fn parse_sources(&self, text: &str) -> IndexEntries<SourcePackage> {
        self.parse_entries(text, |stanza| self.parse_source_stanza(stanza))
    }

    pub fn parse_packages(&self, text: &str) -> IndexEntries<BinaryPackage> {
        self.parse_entries(text, |stanza| self.parse_binary_stanza(stanza))
    }

    fn parse_entries<T, F>(&self, text: &str, decode: F) -> IndexEntries<T>
    where
        F: Fn(&Stanza) -> Result<T>,
    {
        let (stanzas, mut skipped) = parse_stanzas(text);
        let mut packages = Vec::with_capacity(stanzas.len());

        for stanza in &stanzas {
            match decode(stanza) {
                Ok(pkg) => packages.push(pkg),
                Err(e) => skipped.push(SkippedStanza {
                    line: stanza.line,
                    package: stanza.get_trimmed("Package").map(str::to_string),
                    reason: e.to_string(),
                }),
            }
        }

        for skip in &skipped {
            warn!("Skipping {} in component {}", skip, self.component);
        }
        skipped.sort_by_key(|s| s.line);

        IndexEntries { packages, skipped }
    }

    /// Decode one `Sources` stanza
    pub fn parse_source_stanza(&self, stanza: &Stanza) -> Result<SourcePackage> {
        let name = required(stanza, "Package")?;
        let version = required(stanza, "Version")?;
        let mut pkg = SourcePackage::new(name, version, self.component.as_str());

        let opt = |field: &str| stanza.get_trimmed(field).map(str::to_string);

        pkg.architectures = split_words(stanza.get("Architecture"));
        pkg.format_version = opt("Format");
        if let Some(standards) = opt("Standards-Version") {
            pkg.standards_version = standards;
        }
        pkg.maintainer = opt("Maintainer").unwrap_or_default();
        pkg.uploaders = split_commas(stanza.get("Uploaders"));
        pkg.section = opt("Section");
        pkg.homepage = opt("Homepage");
        pkg.vcs_browser = opt("Vcs-Browser");
        pkg.build_depends = opt("Build-Depends");
        pkg.build_depends_indep = opt("Build-Depends-Indep");
        pkg.build_depends_arch = opt("Build-Depends-Arch");
        pkg.build_conflicts = opt("Build-Conflicts");
        pkg.directory = opt("Directory").unwrap_or_default();

        let mut lists = Vec::new();
        for algorithm in ChecksumAlgorithm::ALL {
            if let Some(raw) = stanza.get(algorithm.sources_field()) {
                let entries = parse_checksum_lines(algorithm, raw, Some(&pkg.directory))?;
                lists.push((algorithm, entries));
            }
        }
        // keep Files (md5) order, which lists the .dsc first
        lists.reverse();
        pkg.files = merge_checksum_lists(lists)?;

        pkg.binaries = match stanza.get("Package-List") {
            Some(list) => PackageInfo::parse_package_list(list, &pkg.version),
            None => split_commas(stanza.get("Binary"))
                .into_iter()
                .map(|bin| PackageInfo::binary(bin, pkg.version.as_str()))
                .collect(),
        };

        pkg.extra = stanza.unknown_fields(SOURCE_FIELDS);
        Ok(pkg)
    }

    /// Decode one `Packages` stanza
    pub fn parse_binary_stanza(&self, stanza: &Stanza) -> Result<BinaryPackage> {
        let name = required(stanza, "Package")?;
        let version = required(stanza, "Version")?;
        let architecture = required(stanza, "Architecture")?;
        let filename = required(stanza, "Filename")?;

        let opt = |field: &str| stanza.get_trimmed(field).map(str::to_string);

        let size = parse_number(stanza, "Size")?;
        let mut file = ArchiveFile::new(filename.as_str(), size);
        for algorithm in ChecksumAlgorithm::ALL {
            if let Some(digest) = stanza.get_trimmed(algorithm.packages_field()) {
                if !hash::is_valid_digest(algorithm, digest) {
                    return Err(Error::MalformedStanza(format!(
                        "invalid {} digest '{}' for {}",
                        algorithm, digest, name
                    )));
                }
                file = file.with_checksum(algorithm, digest.to_lowercase());
            }
        }

        let deb_type = match stanza.get_trimmed("Package-Type") {
            Some(kind) => DebType::from_name(kind).ok_or_else(|| {
                Error::MalformedStanza(format!("unknown Package-Type '{}' for {}", kind, name))
            })?,
            None if filename.ends_with(".udeb") => DebType::Udeb,
            None => DebType::Deb,
        };

        let mut relations = Relations::default();
        for field in Relations::FIELDS {
            if let (Some(slot), Some(value)) = (relations.slot_mut(field), opt(field)) {
                *slot = Some(value);
            }
        }

        let source = SourceRef::from_field(stanza.get("Source"), &name, &version);

        Ok(BinaryPackage {
            installed_size: parse_number(stanza, "Installed-Size")?,
            component: self.component.clone(),
            deb_type,
            maintainer: opt("Maintainer").unwrap_or_default(),
            section: opt("Section"),
            priority: stanza
                .get_trimmed("Priority")
                .map(PackagePriority::from_name)
                .unwrap_or_default(),
            description: opt("Description"),
            description_md5: opt("Description-md5"),
            homepage: opt("Homepage"),
            relations,
            file,
            source,
            extra: stanza.unknown_fields(BINARY_FIELDS),
            name,
            version,
            architecture,
        })
    }
}

fn required(stanza: &Stanza, field: &str) -> Result<String> {
    stanza.get_trimmed(field).map(str::to_string).ok_or_else(|| {
        Error::MalformedStanza(match stanza.get_trimmed("Package") {
            Some(pkg) => format!("{} has no {} field", pkg, field),
            None => format!("stanza at line {} has no {} field", stanza.line, field),
        })
    })
}

fn parse_number(stanza: &Stanza, field: &str) -> Result<u64> {
    match stanza.get_trimmed(field) {
        None => Ok(0),
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            Error::MalformedStanza(format!("{} is not a number: '{}'", field, raw))
        }),
    }
}

/// Parse an archive date (RFC 2822, archives often spell the zone `UTC`)
fn parse_date(field: &str, raw: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc2822(raw).or_else(|e| match raw.strip_suffix("UTC") {
        Some(head) => DateTime::parse_from_rfc2822(&format!("{}+0000", head)),
        None => Err(e),
    });
    match parsed {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!("Ignoring unparseable {} '{}': {}", field, raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RELEASE: &str = "\
Origin: Debian
Label: Debian
Suite: unstable
Codename: sid
Date: Sat, 14 Oct 2023 08:12:01 UTC
Valid-Until: Sat, 21 Oct 2023 08:12:01 UTC
Acquire-By-Hash: yes
Architectures: amd64 arm64
Components: main contrib
Description: Debian x.y Unstable - Not Released
MD5Sum:
 5d41402abc4b2a76b9719d911017c592 5 main/source/Sources
SHA256:
 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824 5 main/source/Sources
 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824 5 main/binary-amd64/Packages
";

    const SOURCES: &str = "\
Package: hello
Binary: hello, hello-udeb
Version: 2.10-3
Maintainer: Santiago Vila <sanvila@debian.org>
Uploaders: A <a@example.org>, B <b@example.org>
Build-Depends: debhelper-compat (= 13)
Architecture: any
Standards-Version: 4.6.2
Format: 3.0 (quilt)
Files:
 5d41402abc4b2a76b9719d911017c592 5 hello_2.10-3.dsc
 6f5902ac237024bdd0c176cb93063dc4 12 hello_2.10.orig.tar.gz
Checksums-Sha256:
 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824 5 hello_2.10-3.dsc
Package-List:
 hello deb devel optional arch=any
 hello-udeb udeb debian-installer extra arch=any
Directory: pool/main/h/hello
Priority: source
Section: devel
Testsuite: autopkgtest

Package: broken
Architecture: any

Package: legacy
Version: 1.0-1
Binary: legacy, legacy-doc
";

    const PACKAGES: &str = "\
Package: libc6
Source: glibc (2.36-9)
Version: 2.36-9+b1
Installed-Size: 12988
Maintainer: GNU Libc Maintainers <debian-glibc@lists.debian.org>
Architecture: amd64
Depends: libgcc-s1
Breaks: hurd (<< 1:0.9.git20220301-2)
Description: GNU C Library: Shared libraries
Multi-Arch: same
Section: libs
Priority: optional
Filename: pool/main/g/glibc/libc6_2.36-9+b1_amd64.deb
Size: 2757936
SHA256: 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824

Package: hello-udeb
Version: 2.10-3
Architecture: amd64
Filename: pool/main/h/hello/hello-udeb_2.10-3_amd64.udeb
Size: 1024

Package: bad-size
Version: 1
Architecture: amd64
Filename: pool/main/b/bad/bad_1_amd64.deb
Size: lots
";

    #[test]
    fn test_parse_release() {
        let parser = IndexParser::new("main");
        let release = parser
            .parse(RELEASE.as_bytes(), IndexKind::Release)
            .unwrap()
            .into_release()
            .unwrap();

        assert_eq!(release.suite.as_deref(), Some("unstable"));
        assert_eq!(release.codename.as_deref(), Some("sid"));
        assert_eq!(release.architectures, vec!["amd64", "arm64"]);
        assert_eq!(release.components, vec!["main", "contrib"]);
        assert!(release.acquire_by_hash);
        assert_eq!(
            release.date,
            Some(Utc.with_ymd_and_hms(2023, 10, 14, 8, 12, 1).unwrap())
        );
        assert!(release.is_expired(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));

        assert_eq!(release.files.len(), 2);
        let sources = release.file("main/source/Sources").unwrap();
        assert!(sources.checksum(ChecksumAlgorithm::Md5).is_some());
        assert!(sources.checksum(ChecksumAlgorithm::Sha256).is_some());
        sources.verify(b"hello").unwrap();
    }

    #[test]
    fn test_release_must_not_be_empty() {
        let parser = IndexParser::new("main");
        assert!(matches!(
            parser.parse(b"\n\n", IndexKind::Release),
            Err(Error::MalformedStanza(_))
        ));
    }

    #[test]
    fn test_parse_sources() {
        let parser = IndexParser::new("main");
        let entries = parser
            .parse(SOURCES.as_bytes(), IndexKind::Sources)
            .unwrap()
            .into_sources()
            .unwrap();

        assert_eq!(entries.packages.len(), 2);
        assert_eq!(entries.skipped.len(), 1);
        assert_eq!(entries.skipped[0].package.as_deref(), Some("broken"));
        assert!(entries.skipped[0].reason.contains("Version"));

        let hello = &entries.packages[0];
        assert_eq!(hello.name, "hello");
        assert_eq!(hello.version, "2.10-3");
        assert_eq!(hello.component, "main");
        assert_eq!(hello.standards_version, "4.6.2");
        assert_eq!(hello.format_version.as_deref(), Some("3.0 (quilt)"));
        assert_eq!(hello.uploaders.len(), 2);
        assert_eq!(hello.build_depends.as_deref(), Some("debhelper-compat (= 13)"));

        assert_eq!(hello.files.len(), 2);
        let dsc = hello.dsc_file().unwrap();
        assert_eq!(dsc.path, "pool/main/h/hello/hello_2.10-3.dsc");
        assert!(dsc.checksum(ChecksumAlgorithm::Sha256).is_some());
        assert!(dsc.checksum(ChecksumAlgorithm::Md5).is_some());

        assert_eq!(hello.binaries.len(), 2);
        assert_eq!(hello.binaries[1].deb_type, DebType::Udeb);

        // unknown fields survive untouched
        assert_eq!(hello.extra_field("Testsuite"), Some("autopkgtest"));
        assert_eq!(hello.extra_field("Priority"), Some("source"));

        let legacy = &entries.packages[1];
        assert_eq!(legacy.standards_version, "0~notset");
        let names: Vec<_> = legacy.binaries.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["legacy", "legacy-doc"]);
    }

    #[test]
    fn test_conflicting_file_sizes_mark_stanza_malformed() {
        let text = "\
Package: clash
Version: 1
Directory: pool/main/c/clash
Files:
 5d41402abc4b2a76b9719d911017c592 5 clash_1.dsc
Checksums-Sha256:
 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824 6 clash_1.dsc
";
        let entries = IndexParser::new("main").parse_sources(text);
        assert!(entries.packages.is_empty());
        assert_eq!(entries.skipped.len(), 1);
    }

    #[test]
    fn test_parse_packages() {
        let parser = IndexParser::new("main");
        let entries = parser
            .parse(PACKAGES.as_bytes(), IndexKind::Packages)
            .unwrap()
            .into_packages()
            .unwrap();

        assert_eq!(entries.packages.len(), 2);
        assert_eq!(entries.skipped.len(), 1);
        assert_eq!(entries.skipped[0].package.as_deref(), Some("bad-size"));

        let libc = &entries.packages[0];
        assert_eq!(libc.source.name, "glibc");
        assert_eq!(libc.source.version, "2.36-9");
        assert_eq!(libc.installed_size, 12988);
        assert_eq!(libc.file.size, 2757936);
        assert_eq!(libc.deb_type, DebType::Deb);
        assert_eq!(libc.priority, PackagePriority::Optional);
        assert_eq!(libc.relations.depends.as_deref(), Some("libgcc-s1"));
        assert_eq!(
            libc.relations.breaks.as_deref(),
            Some("hurd (<< 1:0.9.git20220301-2)")
        );
        assert_eq!(libc.extra_field("Multi-Arch"), Some("same"));

        let udeb = &entries.packages[1];
        assert_eq!(udeb.deb_type, DebType::Udeb);
        assert_eq!(udeb.source.name, "hello-udeb");
    }

    #[test]
    fn test_binary_requires_architecture() {
        let text = "Package: noarch\nVersion: 1\nFilename: pool/n.deb\n";
        let entries = IndexParser::new("main").parse_packages(text);
        assert!(entries.packages.is_empty());
        assert!(entries.skipped[0].reason.contains("Architecture"));
    }
}
