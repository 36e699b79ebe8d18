// tests/repository.rs

//! Reading signed archives from disk.

mod common;

use common::{binary_stanza, generate_key, keyring, Signing, SuiteFixture};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use synchrotron::packages::DebType;
use synchrotron::repository::{IndexKind, SignatureLayout};
use synchrotron::{Error, RepositoryReader, TrustedKeyring};
use tempfile::TempDir;

fn fixture() -> SuiteFixture {
    SuiteFixture::new("sid")
        .package("main", "hello", "2.10-3")
        .binary("main", "amd64", binary_stanza("hello-doc", "2.10-3", "all", Some("hello")))
        .installer("main", "amd64", binary_stanza("hello-udeb", "2.10-3", "amd64", Some("hello")))
        .package("contrib", "nonfree-firmware-helper", "1.2-1")
}

fn reader(root: &Path, keyring: Arc<TrustedKeyring>) -> RepositoryReader {
    RepositoryReader::new(
        root,
        "sid",
        vec!["main".to_string(), "contrib".to_string()],
        vec!["amd64".to_string()],
        keyring,
    )
}

#[test]
fn test_inline_signed_suite() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::InRelease(&key));

    let reader = reader(temp.path(), keyring(&[&key]));
    let mut release = reader.release_file().unwrap();
    assert_eq!(release.layout(), SignatureLayout::Inline);
    assert!(release.is_valid());
    assert_eq!(release.trusted_signers(), &[key.fingerprint().to_hex()]);

    let parsed = reader.release().unwrap();
    assert_eq!(parsed.codename.as_deref(), Some("sid"));
    assert_eq!(parsed.components, vec!["contrib", "main"]);
    assert!(parsed.date.is_some());
    assert!(parsed.file("main/source/Sources.xz").is_some());

    let sources = reader.get_source_packages("main").unwrap();
    assert!(sources.skipped.is_empty());
    assert_eq!(sources.packages.len(), 1);
    assert_eq!(sources.packages[0].name, "hello");
    assert_eq!(sources.packages[0].version, "2.10-3");

    let contrib = reader.get_source_packages("contrib").unwrap();
    assert_eq!(contrib.packages[0].component, "contrib");
}

#[test]
fn test_detached_signed_suite() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::Detached(&key));

    let reader = reader(temp.path(), keyring(&[&key]));
    let release = reader.release_file().unwrap();
    assert_eq!(release.layout(), SignatureLayout::Detached);
    assert!(release.signature_path().unwrap().ends_with("Release.gpg"));

    let binaries = reader.get_binary_packages("main", "amd64").unwrap();
    let names: Vec<&str> = binaries.packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["hello"]);
    assert_eq!(binaries.packages[0].deb_type, DebType::Deb);
}

#[test]
fn test_arch_all_collected_from_arch_indices() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::InRelease(&key));

    let all = reader(temp.path(), keyring(&[&key]))
        .get_binary_packages("main", "all")
        .unwrap();
    assert_eq!(all.packages.len(), 1);
    assert_eq!(all.packages[0].name, "hello-doc");
    assert_eq!(all.packages[0].source.name, "hello");
    assert_eq!(all.packages[0].source.version, "2.10-3");
}

#[test]
fn test_installer_packages_are_udebs() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::InRelease(&key));

    let reader = reader(temp.path(), keyring(&[&key]));
    let udebs = reader.get_installer_packages("main", "amd64").unwrap();
    assert_eq!(udebs.packages.len(), 1);
    assert_eq!(udebs.packages[0].name, "hello-udeb");
    assert_eq!(udebs.packages[0].deb_type, DebType::Udeb);

    assert!(reader.get_installer_packages("contrib", "amd64").unwrap().packages.is_empty());
}

#[test]
fn test_untrusted_key_rejected() {
    let temp = TempDir::new().unwrap();
    let signer = generate_key("Archive <archive@example.org>");
    let trusted = generate_key("Other <other@example.org>");
    fixture().write(temp.path(), Signing::InRelease(&signer));

    let err = reader(temp.path(), keyring(&[&trusted]))
        .get_source_packages("main")
        .unwrap_err();
    assert!(matches!(err, Error::UnsignedSuite { .. }));

    let err = reader(temp.path(), Arc::new(TrustedKeyring::empty()))
        .get_source_packages("main")
        .unwrap_err();
    assert!(matches!(err, Error::UnsignedSuite { .. }));
}

#[test]
fn test_tampered_release_rejected() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::Detached(&key));

    let release = temp.path().join("dists/sid/Release");
    let mut content = fs::read_to_string(&release).unwrap();
    content = content.replace("Origin: Test", "Origin: Evil");
    fs::write(&release, content).unwrap();

    let err = reader(temp.path(), keyring(&[&key])).release().unwrap_err();
    assert!(matches!(err, Error::UnsignedSuite { .. }));
}

#[test]
fn test_tampered_index_rejected() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::InRelease(&key));

    let sources = temp.path().join("dists/sid/main/source/Sources.xz");
    fs::write(&sources, common::xz(b"Package: evil\nVersion: 9.9\n")).unwrap();

    let err = reader(temp.path(), keyring(&[&key]))
        .get_source_packages("main")
        .unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { .. }));
}

#[test]
fn test_unknown_component_index() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::InRelease(&key));

    let reader = reader(temp.path(), keyring(&[&key]));
    assert!(reader.get_index_file("main", IndexKind::Sources).is_ok());
    assert!(matches!(
        reader.get_index_file("non-free", IndexKind::Packages),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_snapshot_links_binaries() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::InRelease(&key));

    let archs = vec!["amd64".to_string(), "all".to_string()];
    let snapshot = reader(temp.path(), keyring(&[&key]))
        .snapshot("main", &archs)
        .unwrap();

    assert_eq!(snapshot.sources.len(), 1);
    let mut built: Vec<&str> = snapshot
        .binaries_of("hello", "2.10-3")
        .into_iter()
        .map(|b| b.name.as_str())
        .collect();
    built.sort();
    assert_eq!(built, vec!["hello", "hello-doc"]);
    assert!(snapshot.orphan_binaries().is_empty());
}

#[test]
fn test_listed_index_missing_on_disk() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::InRelease(&key));
    fs::remove_file(temp.path().join("dists/sid/main/source/Sources.xz")).unwrap();

    let err = reader(temp.path(), keyring(&[&key]))
        .get_source_packages("main")
        .unwrap_err();
    match err {
        Error::NotFound(msg) => assert!(msg.contains("main/source/Sources.xz")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unlisted_encoding_falls_back_to_listed_one() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    fixture().write(temp.path(), Signing::InRelease(&key));

    // Packages.xz is preferred over the listed Packages.gz but not in Release
    fs::write(
        temp.path().join("dists/sid/main/binary-amd64/Packages.xz"),
        common::xz(binary_stanza("evil", "9.9", "amd64", None).as_bytes()),
    )
    .unwrap();

    let binaries = reader(temp.path(), keyring(&[&key]))
        .get_binary_packages("main", "amd64")
        .unwrap();
    let names: Vec<&str> = binaries.packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["hello"]);
}
