// tests/signed_file.rs

//! Keyring directories and signature checks through the public API.

mod common;

use common::{clearsign, detached_sign, generate_key};
use openpgp::serialize::Serialize;
use sequoia_openpgp as openpgp;
use std::fs;
use std::sync::Arc;
use synchrotron::repository::SignatureLayout;
use synchrotron::{Error, SignedFile, TrustedKeyring};
use tempfile::TempDir;

const RELEASE: &[u8] = b"Origin: Test\nSuite: stable\nCodename: bookworm\n";

#[test]
fn test_keyring_dir_with_armored_and_binary_keys() {
    let temp = TempDir::new().unwrap();
    let first = generate_key("First <first@example.org>");
    let second = generate_key("Second <second@example.org>");

    let mut armored = Vec::new();
    first.armored().serialize(&mut armored).unwrap();
    fs::write(temp.path().join("first.asc"), armored).unwrap();

    let mut binary = Vec::new();
    second.serialize(&mut binary).unwrap();
    fs::write(temp.path().join("second.gpg"), binary).unwrap();

    fs::write(temp.path().join("README"), "not a key").unwrap();

    let keyring = TrustedKeyring::load_dir(temp.path()).unwrap();
    assert_eq!(keyring.len(), 2);

    let mut expected = vec![first.fingerprint().to_hex(), second.fingerprint().to_hex()];
    expected.sort();
    assert_eq!(keyring.fingerprints(), expected);
}

#[test]
fn test_missing_keyring_dir_is_empty() {
    let keyring = TrustedKeyring::load_dir(std::path::Path::new("/nonexistent/keys")).unwrap();
    assert!(keyring.is_empty());
}

#[test]
fn test_detached_signature_verification() {
    let temp = TempDir::new().unwrap();
    let key = generate_key("Archive <archive@example.org>");
    let release = temp.path().join("Release");
    fs::write(&release, RELEASE).unwrap();
    fs::write(temp.path().join("Release.gpg"), detached_sign(&key, RELEASE)).unwrap();

    let keyring = Arc::new(TrustedKeyring::from_certs(vec![key.clone()]));
    let mut file = SignedFile::open(&[release], keyring).unwrap();
    assert_eq!(file.layout(), SignatureLayout::Detached);
    assert!(file.is_valid());
    assert_eq!(file.content().unwrap(), RELEASE);
    assert_eq!(file.signature_id().unwrap().len(), 64);
}

#[test]
fn test_signature_by_unknown_key() {
    let temp = TempDir::new().unwrap();
    let signer = generate_key("Archive <archive@example.org>");
    let other = generate_key("Other <other@example.org>");
    let path = temp.path().join("InRelease");
    fs::write(&path, clearsign(&signer, RELEASE)).unwrap();

    let keyring = Arc::new(TrustedKeyring::from_certs(vec![other]));
    let mut file = SignedFile::open(&[path], keyring).unwrap();
    assert!(!file.is_valid());
    assert!(file.trusted_signers().is_empty());
    assert!(!file.fingerprints().is_empty());
    assert!(matches!(file.content(), Err(Error::NotVerified(_))));
}

#[test]
fn test_unsigned_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("Release");
    fs::write(&path, RELEASE).unwrap();

    let mut file = SignedFile::open(&[path], Arc::new(TrustedKeyring::empty())).unwrap();
    assert_eq!(file.layout(), SignatureLayout::Unsigned);
    assert!(!file.is_valid());
    assert!(matches!(file.primary_fingerprint(), Err(Error::NoSignature(_))));
    assert_eq!(file.unverified_content().as_ref(), RELEASE);
}

#[test]
fn test_no_candidate_exists() {
    let temp = TempDir::new().unwrap();
    let candidates = [temp.path().join("InRelease"), temp.path().join("Release")];
    let err = SignedFile::open(&candidates, Arc::new(TrustedKeyring::empty())).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
