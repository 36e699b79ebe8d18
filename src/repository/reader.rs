// src/repository/reader.rs

//! Reading package sets from a local archive tree
//!
//! Layout follows the Debian convention:
//!
//! ```text
//! <root>/dists/<suite>/InRelease (or Release + Release.gpg)
//! <root>/dists/<suite>/<component>/source/Sources[.xz|.gz]
//! <root>/dists/<suite>/<component>/binary-<arch>/Packages[.xz|.gz]
//! <root>/dists/<suite>/<component>/debian-installer/binary-<arch>/Packages[.xz|.gz]
//! ```
//!
//! Every call goes back to disk. Index files are checked against the
//! digests of the (signature-checked) Release file before they are parsed.

use super::gpg::TrustedKeyring;
use super::parsers::{IndexEntries, IndexKind, IndexParser, ReleaseFile};
use super::signedfile::SignedFile;
use super::snapshot::SuiteSnapshot;
use crate::compression::{decompress, index_candidates, CompressionFormat};
use crate::error::{Error, Result};
use crate::packages::{BinaryPackage, DebType, SourcePackage};
use chrono::Utc;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Architecture name of architecture-independent packages
pub const ARCH_ALL: &str = "all";

/// Reader for one suite of a local repository
#[derive(Debug, Clone)]
pub struct RepositoryReader {
    root: PathBuf,
    suite: String,
    components: Vec<String>,
    architectures: Vec<String>,
    keyring: Arc<TrustedKeyring>,
    require_signature: bool,
}

impl RepositoryReader {
    /// Create a reader; signatures are required unless relaxed with
    /// [`with_require_signature`](Self::with_require_signature)
    pub fn new(
        root: impl Into<PathBuf>,
        suite: impl Into<String>,
        components: Vec<String>,
        architectures: Vec<String>,
        keyring: Arc<TrustedKeyring>,
    ) -> Self {
        Self {
            root: root.into(),
            suite: suite.into(),
            components,
            architectures,
            keyring,
            require_signature: true,
        }
    }

    pub fn with_require_signature(mut self, require: bool) -> Self {
        self.require_signature = require;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn architectures(&self) -> &[String] {
        &self.architectures
    }

    pub fn suite_dir(&self) -> PathBuf {
        self.root.join("dists").join(&self.suite)
    }

    /// Open the suite's Release file and check its signature
    ///
    /// Fails with `SuiteNotFound` when neither `InRelease` nor `Release`
    /// exists, and with `UnsignedSuite` when the signature does not verify
    /// and signatures are required.
    pub fn release_file(&self) -> Result<SignedFile> {
        let dir = self.suite_dir();
        let candidates = [dir.join("InRelease"), dir.join("Release")];

        let mut file = SignedFile::open(&candidates, Arc::clone(&self.keyring)).map_err(|e| match e {
            Error::NotFound(_) => Error::SuiteNotFound {
                suite: self.suite.clone(),
                root: self.root.clone(),
            },
            other => other,
        })?;

        if !file.is_valid() {
            if self.require_signature {
                return Err(Error::UnsignedSuite {
                    suite: self.suite.clone(),
                    root: self.root.clone(),
                });
            }
            warn!(
                "Suite {} in {} is not properly signed, reading it anyway",
                self.suite,
                self.root.display()
            );
        }
        Ok(file)
    }

    /// Parsed Release file of the suite
    pub fn release(&self) -> Result<ReleaseFile> {
        let file = self.release_file()?;
        let content = match file.content() {
            Ok(verified) => verified.to_vec(),
            Err(_) => file.unverified_content().into_owned(),
        };

        let release = IndexParser::new("").parse_release(&String::from_utf8_lossy(&content))?;
        if release.is_expired(Utc::now()) {
            if let Some(until) = release.valid_until {
                warn!("Release file of suite {} expired on {}", self.suite, until);
            }
        }
        Ok(release)
    }

    /// Signed file vouching for an index of `component`
    ///
    /// Indices are covered by the Release file's digests, so this is the
    /// Release handle once the component is known to this reader.
    pub fn get_index_file(&self, component: &str, kind: IndexKind) -> Result<SignedFile> {
        if kind != IndexKind::Release && !self.components.iter().any(|c| c == component) {
            return Err(Error::NotFound(format!(
                "{} index of component {} in suite {}",
                kind, component, self.suite
            )));
        }
        self.release_file()
    }

    pub fn get_source_packages(&self, component: &str) -> Result<IndexEntries<SourcePackage>> {
        let release = self.release()?;
        self.read_sources(&release, component)
    }

    /// Binary packages of one architecture
    ///
    /// `Architecture: all` packages are only returned when `arch` is `all`.
    pub fn get_binary_packages(
        &self,
        component: &str,
        arch: &str,
    ) -> Result<IndexEntries<BinaryPackage>> {
        let release = self.release()?;
        self.read_binaries(&release, component, arch, false)
    }

    /// Installer (udeb) packages of one architecture
    pub fn get_installer_packages(
        &self,
        component: &str,
        arch: &str,
    ) -> Result<IndexEntries<BinaryPackage>> {
        let release = self.release()?;
        self.read_binaries(&release, component, arch, true)
    }

    /// Read sources and the binaries of `architectures` for one component
    ///
    /// The Release file is verified once for the whole snapshot.
    pub fn snapshot(&self, component: &str, architectures: &[String]) -> Result<SuiteSnapshot> {
        let release = self.release()?;
        let sources = self.read_sources(&release, component)?;
        let mut skipped = sources.skipped;

        let mut binaries = Vec::new();
        for arch in architectures {
            let entries = self.read_binaries(&release, component, arch, false)?;
            binaries.extend(entries.packages);
            skipped.extend(entries.skipped);
        }

        info!(
            "Read {}/{}: {} source and {} binary packages",
            self.suite,
            component,
            sources.packages.len(),
            binaries.len()
        );
        Ok(SuiteSnapshot::new(
            self.suite.as_str(),
            component,
            sources.packages,
            binaries,
            skipped,
        ))
    }

    fn read_sources(
        &self,
        release: &ReleaseFile,
        component: &str,
    ) -> Result<IndexEntries<SourcePackage>> {
        let rel_dir = format!("{}/source", component);
        match self.read_index(release, &rel_dir, IndexKind::Sources)? {
            Some(bytes) => {
                Ok(IndexParser::new(component).parse_sources(&String::from_utf8_lossy(&bytes)))
            }
            None => Ok(IndexEntries::default()),
        }
    }

    fn read_binaries(
        &self,
        release: &ReleaseFile,
        component: &str,
        arch: &str,
        installer: bool,
    ) -> Result<IndexEntries<BinaryPackage>> {
        let rel_dir = if installer {
            format!("{}/debian-installer/binary-{}", component, arch)
        } else {
            format!("{}/binary-{}", component, arch)
        };

        let mut entries = match self.read_index(release, &rel_dir, IndexKind::Packages)? {
            Some(bytes) => {
                IndexParser::new(component).parse_packages(&String::from_utf8_lossy(&bytes))
            }
            None if arch == ARCH_ALL && !installer => {
                return self.collect_arch_all(release, component);
            }
            None => IndexEntries::default(),
        };

        if arch != ARCH_ALL {
            entries.packages.retain(|pkg| pkg.architecture != ARCH_ALL);
        }
        if installer {
            for pkg in &mut entries.packages {
                pkg.deb_type = DebType::Udeb;
            }
        }
        Ok(entries)
    }

    /// Gather `Architecture: all` packages from the per-architecture
    /// indices of archives that publish no `binary-all` index
    fn collect_arch_all(
        &self,
        release: &ReleaseFile,
        component: &str,
    ) -> Result<IndexEntries<BinaryPackage>> {
        let mut seen = BTreeSet::new();
        let mut result = IndexEntries::default();

        for arch in self.architectures.iter().filter(|a| *a != ARCH_ALL) {
            let rel_dir = format!("{}/binary-{}", component, arch);
            let Some(bytes) = self.read_index(release, &rel_dir, IndexKind::Packages)? else {
                continue;
            };
            let parsed = IndexParser::new(component).parse_packages(&String::from_utf8_lossy(&bytes));
            for pkg in parsed.packages {
                if pkg.architecture == ARCH_ALL && seen.insert(pkg.key()) {
                    result.packages.push(pkg);
                }
            }
            result.skipped.extend(parsed.skipped);
        }
        Ok(result)
    }

    /// Locate, checksum and decompress an index
    ///
    /// Encodings are tried in preference order. With signatures required an
    /// encoding missing from the Release file is passed over in favour of a
    /// listed one. Returns `None` only when the index is neither on disk nor
    /// listed in the Release file.
    fn read_index(
        &self,
        release: &ReleaseFile,
        rel_dir: &str,
        kind: IndexKind,
    ) -> Result<Option<Vec<u8>>> {
        let base = self.suite_dir().join(rel_dir).join(kind.file_name());
        let mut listed_missing = None;
        let mut unlisted = None;

        for (path, format) in index_candidates(&base) {
            let rel_path = format!("{}/{}{}", rel_dir, kind.file_name(), format.extension());
            let entry = release.file(&rel_path);
            if !path.is_file() {
                if entry.is_some() && listed_missing.is_none() {
                    listed_missing = Some(rel_path);
                }
                continue;
            }

            match entry {
                None if self.require_signature => {
                    warn!("{} is not listed in the Release file, skipping it", rel_path);
                    unlisted.get_or_insert(rel_path);
                    continue;
                }
                None => warn!("{} is not listed in Release, using it unchecked", rel_path),
                Some(_) => {}
            }

            let raw = fs::read(&path)?;
            if let Some(entry) = entry {
                entry.verify(&raw)?;
                if let Some((algorithm, digest)) = entry.strongest_checksum() {
                    debug!("{} matches {} {}", rel_path, algorithm, digest);
                }
            }

            let sniffed = CompressionFormat::from_magic_bytes(&raw);
            let format = if sniffed != CompressionFormat::None && sniffed != format {
                warn!("{} is {} data despite its name, decoding it as such", rel_path, sniffed);
                sniffed
            } else {
                format
            };

            debug!("Reading {} ({})", path.display(), format);
            return Ok(Some(decompress(&raw, format, &path.display().to_string())?));
        }

        if let Some(rel_path) = listed_missing {
            return Err(Error::NotFound(format!(
                "{} is listed in the Release file of suite {} but missing on disk",
                rel_path, self.suite
            )));
        }
        if let Some(rel_path) = unlisted {
            return Err(Error::NotFound(format!(
                "{} is not listed in the Release file of suite {}",
                rel_path, self.suite
            )));
        }

        debug!("No {} index at {}", kind, base.display());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    const SOURCES: &str = "Package: hello\nVersion: 2.10-3\nMaintainer: M <m@example.org>\n";
    const PACKAGES: &str = "\
Package: hello
Version: 2.10-3
Architecture: amd64
Filename: pool/main/h/hello/hello_2.10-3_amd64.deb

Package: hello-doc
Source: hello
Version: 2.10-3
Architecture: all
Filename: pool/main/h/hello/hello-doc_2.10-3_all.deb
";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Unsigned archive with gz Sources and plain Packages
    fn write_archive(root: &Path, corrupt_sources: bool) {
        let dists = root.join("dists/sid");
        fs::create_dir_all(dists.join("main/source")).unwrap();
        fs::create_dir_all(dists.join("main/binary-amd64")).unwrap();

        let sources = gzip(SOURCES.as_bytes());
        let packages = PACKAGES.as_bytes();
        let release = format!(
            "Suite: unstable\nCodename: sid\nComponents: main\nArchitectures: amd64\nSHA256:\n {} {} main/source/Sources.gz\n {} {} main/binary-amd64/Packages\n",
            crate::hash::sha256(&sources),
            sources.len(),
            crate::hash::sha256(packages),
            packages.len(),
        );
        fs::write(dists.join("Release"), release).unwrap();

        let mut on_disk = sources.clone();
        if corrupt_sources {
            on_disk.push(0);
        }
        fs::write(dists.join("main/source/Sources.gz"), on_disk).unwrap();
        fs::write(dists.join("main/binary-amd64/Packages"), packages).unwrap();
    }

    fn reader(root: &Path) -> RepositoryReader {
        RepositoryReader::new(
            root,
            "sid",
            vec!["main".to_string()],
            vec!["amd64".to_string()],
            Arc::new(TrustedKeyring::empty()),
        )
    }

    #[test]
    fn test_missing_suite() {
        let temp = TempDir::new().unwrap();
        let err = reader(temp.path()).get_source_packages("main").unwrap_err();
        assert!(matches!(err, Error::SuiteNotFound { .. }));
    }

    #[test]
    fn test_unsigned_suite_rejected_when_required() {
        let temp = TempDir::new().unwrap();
        write_archive(temp.path(), false);
        let err = reader(temp.path()).get_source_packages("main").unwrap_err();
        assert!(matches!(err, Error::UnsignedSuite { .. }));
    }

    #[test]
    fn test_unsigned_suite_read_when_allowed() {
        let temp = TempDir::new().unwrap();
        write_archive(temp.path(), false);
        let reader = reader(temp.path()).with_require_signature(false);

        let release = reader.release().unwrap();
        assert_eq!(release.codename.as_deref(), Some("sid"));

        let sources = reader.get_source_packages("main").unwrap();
        assert_eq!(sources.packages.len(), 1);
        assert_eq!(sources.packages[0].name, "hello");
        assert_eq!(sources.packages[0].component, "main");

        let binaries = reader.get_binary_packages("main", "amd64").unwrap();
        assert_eq!(binaries.packages.len(), 1);
        assert_eq!(binaries.packages[0].name, "hello");

        // no binary-all index: arch:all packages come from the arch indices
        let all = reader.get_binary_packages("main", ARCH_ALL).unwrap();
        assert_eq!(all.packages.len(), 1);
        assert_eq!(all.packages[0].name, "hello-doc");
    }

    #[test]
    fn test_missing_index_is_empty() {
        let temp = TempDir::new().unwrap();
        write_archive(temp.path(), false);
        let reader = reader(temp.path()).with_require_signature(false);
        assert!(reader
            .get_installer_packages("main", "amd64")
            .unwrap()
            .packages
            .is_empty());
        assert!(reader.get_source_packages("contrib").unwrap().packages.is_empty());
    }

    #[test]
    fn test_mislabelled_index_is_sniffed() {
        let temp = TempDir::new().unwrap();
        let dists = temp.path().join("dists/sid");
        fs::create_dir_all(dists.join("main/source")).unwrap();

        // gzip data under the plain name
        let sources = gzip(SOURCES.as_bytes());
        let release = format!(
            "Codename: sid\nComponents: main\nSHA256:\n {} {} main/source/Sources\n",
            crate::hash::sha256(&sources),
            sources.len(),
        );
        fs::write(dists.join("Release"), release).unwrap();
        fs::write(dists.join("main/source/Sources"), &sources).unwrap();

        let reader = reader(temp.path()).with_require_signature(false);
        let parsed = reader.get_source_packages("main").unwrap();
        assert_eq!(parsed.packages.len(), 1);
        assert_eq!(parsed.packages[0].name, "hello");
    }

    #[test]
    fn test_index_checksum_mismatch() {
        let temp = TempDir::new().unwrap();
        write_archive(temp.path(), true);
        let reader = reader(temp.path()).with_require_signature(false);
        let err = reader.get_source_packages("main").unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_snapshot() {
        let temp = TempDir::new().unwrap();
        write_archive(temp.path(), false);
        let reader = reader(temp.path()).with_require_signature(false);
        let snapshot = reader.snapshot("main", &["amd64".to_string()]).unwrap();
        assert_eq!(snapshot.suite, "sid");
        assert_eq!(snapshot.sources.len(), 1);
        assert_eq!(snapshot.binaries.len(), 1);
        assert!(snapshot.orphan_binaries().is_empty());
    }

    #[test]
    fn test_index_file_handle() {
        let temp = TempDir::new().unwrap();
        write_archive(temp.path(), false);
        let reader = reader(temp.path()).with_require_signature(false);
        let handle = reader.get_index_file("main", IndexKind::Sources).unwrap();
        assert!(handle.content().is_err());
        assert!(reader.get_index_file("non-free", IndexKind::Sources).is_err());
    }
}
