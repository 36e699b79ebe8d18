// tests/common/mod.rs

//! Shared test utilities: signing keys and on-disk archive fixtures.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use sequoia_openpgp as openpgp;
use openpgp::cert::prelude::*;
use openpgp::crypto::KeyPair;
use openpgp::policy::StandardPolicy;
use openpgp::serialize::stream::{Message, Signer};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use synchrotron::hash;
use synchrotron::TrustedKeyring;

/// Generate a fresh archive signing key
pub fn generate_key(userid: &str) -> Cert {
    let (cert, _revocation) = CertBuilder::new()
        .add_userid(userid)
        .add_signing_subkey()
        .generate()
        .unwrap();
    cert
}

pub fn keyring(certs: &[&Cert]) -> Arc<TrustedKeyring> {
    Arc::new(TrustedKeyring::from_certs(
        certs.iter().map(|c| (*c).clone()).collect(),
    ))
}

fn signing_keypair(cert: &Cert) -> KeyPair {
    let policy = StandardPolicy::new();
    cert.keys()
        .unencrypted_secret()
        .with_policy(&policy, None)
        .alive()
        .revoked(false)
        .for_signing()
        .next()
        .unwrap()
        .key()
        .clone()
        .into_keypair()
        .unwrap()
}

/// Produce a clearsigned (InRelease style) document
pub fn clearsign(cert: &Cert, data: &[u8]) -> Vec<u8> {
    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let mut signer = Signer::new(message, signing_keypair(cert))
        .cleartext()
        .build()
        .unwrap();
    signer.write_all(data).unwrap();
    signer.finalize().unwrap();
    sink
}

/// Produce a binary detached signature (Release.gpg style)
pub fn detached_sign(cert: &Cert, data: &[u8]) -> Vec<u8> {
    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let mut signer = Signer::new(message, signing_keypair(cert))
        .detached()
        .build()
        .unwrap();
    signer.write_all(data).unwrap();
    signer.finalize().unwrap();
    sink
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn source_stanza(name: &str, version: &str) -> String {
    format!(
        "Package: {name}\nBinary: {name}\nVersion: {version}\nMaintainer: Test Maintainer <maint@example.org>\nArchitecture: any\nDirectory: pool/main/{initial}/{name}\nFiles:\n d41d8cd98f00b204e9800998ecf8427e 0 {name}_{version}.dsc\n",
        initial = &name[..1],
    )
}

pub fn binary_stanza(name: &str, version: &str, arch: &str, source: Option<&str>) -> String {
    let mut stanza = format!("Package: {name}\n");
    if let Some(source) = source {
        stanza.push_str(&format!("Source: {source}\n"));
    }
    stanza.push_str(&format!(
        "Version: {version}\nArchitecture: {arch}\nMaintainer: Test Maintainer <maint@example.org>\nFilename: pool/main/{initial}/{name}/{name}_{version}_{arch}.deb\nSize: 1024\nDescription: test package {name}\n",
        initial = &name[..1],
    ));
    stanza
}

/// How the Release file of a fixture suite is signed
pub enum Signing<'a> {
    InRelease(&'a Cert),
    Detached(&'a Cert),
    Unsigned,
}

/// Builder for a `dists/<suite>` tree with checksummed indices
pub struct SuiteFixture {
    name: String,
    sources: BTreeMap<String, Vec<String>>,
    /// Packages stanzas keyed by index directory, e.g. `main/binary-amd64`
    packages: BTreeMap<String, Vec<String>>,
}

impl SuiteFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sources: BTreeMap::new(),
            packages: BTreeMap::new(),
        }
    }

    /// Add a source package with one same-named binary on amd64
    pub fn package(self, component: &str, name: &str, version: &str) -> Self {
        self.source(component, source_stanza(name, version))
            .binary(component, "amd64", binary_stanza(name, version, "amd64", None))
    }

    pub fn source(mut self, component: &str, stanza: String) -> Self {
        self.sources
            .entry(component.to_string())
            .or_default()
            .push(stanza);
        self
    }

    pub fn binary(self, component: &str, arch: &str, stanza: String) -> Self {
        self.packages_in(format!("{component}/binary-{arch}"), stanza)
    }

    pub fn installer(self, component: &str, arch: &str, stanza: String) -> Self {
        self.packages_in(format!("{component}/debian-installer/binary-{arch}"), stanza)
    }

    fn packages_in(mut self, dir: String, stanza: String) -> Self {
        self.packages.entry(dir).or_default().push(stanza);
        self
    }

    /// Write the suite below `root` and sign its Release file
    pub fn write(&self, root: &Path, signing: Signing<'_>) {
        let dist = root.join("dists").join(&self.name);
        fs::create_dir_all(&dist).unwrap();

        let mut components: Vec<&str> = self
            .sources
            .keys()
            .chain(self.packages.keys())
            .filter_map(|dir| dir.split('/').next())
            .collect();
        components.sort();
        components.dedup();
        if components.is_empty() {
            components.push("main");
        }

        let mut listed = Vec::new();
        for (component, stanzas) in &self.sources {
            let data = xz(stanzas.join("\n").as_bytes());
            listed.push(write_index(&dist, &format!("{component}/source/Sources.xz"), &data));
        }
        for (dir, stanzas) in &self.packages {
            let data = gzip(stanzas.join("\n").as_bytes());
            listed.push(write_index(&dist, &format!("{dir}/Packages.gz"), &data));
        }

        let mut release = format!(
            "Origin: Test\nLabel: Test\nSuite: {name}\nCodename: {name}\nDate: Thu, 01 Oct 2026 12:00:00 UTC\nArchitectures: amd64 arm64\nComponents: {components}\nSHA256:\n",
            name = self.name,
            components = components.join(" "),
        );
        for line in &listed {
            release.push_str(line);
        }

        match signing {
            Signing::InRelease(cert) => {
                fs::write(dist.join("InRelease"), clearsign(cert, release.as_bytes())).unwrap();
            }
            Signing::Detached(cert) => {
                fs::write(dist.join("Release"), &release).unwrap();
                fs::write(dist.join("Release.gpg"), detached_sign(cert, release.as_bytes()))
                    .unwrap();
            }
            Signing::Unsigned => fs::write(dist.join("Release"), &release).unwrap(),
        }
    }
}

fn write_index(dist: &Path, rel_path: &str, data: &[u8]) -> String {
    let path = dist.join(rel_path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, data).unwrap();
    format!(" {} {} {}\n", hash::sha256(data), data.len(), rel_path)
}
