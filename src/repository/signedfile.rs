// src/repository/signedfile.rs

//! Signature-checked access to archive metadata
//!
//! A `SignedFile` is opened from an ordered list of candidate paths. Three
//! layouts are recognised:
//!
//! - inline: a clearsigned document such as `InRelease`
//! - detached: a plain file with a `.gpg`/`.asc`/`.sig` sibling (`Release`
//!   + `Release.gpg`), or a candidate naming the signature itself
//! - unsigned: a plain file without any signature next to it
//!
//! Opening never verifies. `is_valid()` runs the check once against the
//! keyring the file was opened with, and only a passing check unlocks
//! `content()`.

use super::gpg::TrustedKeyring;
use crate::error::{Error, Result};
use crate::hash;
use openpgp::cert::prelude::*;
use openpgp::parse::stream::{
    DetachedVerifierBuilder, MessageLayer, MessageStructure, VerificationHelper, VerifierBuilder,
};
use openpgp::parse::Parse;
use openpgp::policy::{Policy, StandardPolicy};
use openpgp::{KeyHandle, Packet, PacketPile};
use sequoia_openpgp as openpgp;
use serde::Serialize;
use std::borrow::Cow;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CLEARSIGN_HEADER: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const SIGNATURE_HEADER: &str = "-----BEGIN PGP SIGNATURE-----";

/// Extensions of detached signature files
const DETACHED_EXTENSIONS: &[&str] = &["gpg", "asc", "sig"];

/// File names that must be clearsigned to be usable
const INLINE_NAMES: &[&str] = &["InRelease"];

/// How the signature is attached to the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureLayout {
    Inline,
    Detached,
    Unsigned,
}

#[derive(Debug)]
enum Verification {
    Unverified,
    Valid {
        content: Vec<u8>,
        signers: Vec<String>,
    },
    Invalid,
}

/// An opened, possibly signed, archive file
#[derive(Debug)]
pub struct SignedFile {
    path: PathBuf,
    signature_path: Option<PathBuf>,
    layout: SignatureLayout,
    /// Raw file bytes (the whole clearsigned text for inline files)
    data: Vec<u8>,
    /// Signature block, empty when unsigned
    signature: Vec<u8>,
    /// Issuer of every signature packet, in packet order
    issuers: Vec<String>,
    keyring: Arc<TrustedKeyring>,
    state: Verification,
}

impl SignedFile {
    /// Open the first usable candidate
    ///
    /// Candidates that do not exist are skipped, as are inline-only names
    /// (`InRelease`) that turn out not to be clearsigned. Fails with
    /// `NotFound` when nothing usable remains.
    pub fn open(candidates: &[PathBuf], keyring: Arc<TrustedKeyring>) -> Result<Self> {
        for candidate in candidates {
            if !candidate.is_file() {
                debug!("Signed file candidate {} does not exist", candidate.display());
                continue;
            }
            if let Some(file) = Self::open_candidate(candidate, &keyring)? {
                debug!(
                    "Opened {} ({:?}, {} signature(s))",
                    file.path.display(),
                    file.layout,
                    file.issuers.len()
                );
                return Ok(file);
            }
        }

        Err(Error::NotFound(
            candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        ))
    }

    fn open_candidate(path: &Path, keyring: &Arc<TrustedKeyring>) -> Result<Option<Self>> {
        // the candidate is a detached signature, the data sits next to it
        if has_extension(path, DETACHED_EXTENSIONS) {
            let data_path = path.with_extension("");
            if !data_path.is_file() {
                debug!("Signature {} has no data file", path.display());
                return Ok(None);
            }
            let data = fs::read(&data_path)?;
            let signature = fs::read(path)?;
            return Ok(Some(Self::new(
                data_path,
                Some(path.to_path_buf()),
                SignatureLayout::Detached,
                data,
                signature,
                keyring,
            )));
        }

        let data = fs::read(path)?;
        if let Some(signature) = clearsigned_signature(&data) {
            return Ok(Some(Self::new(
                path.to_path_buf(),
                None,
                SignatureLayout::Inline,
                data,
                signature,
                keyring,
            )));
        }

        if is_inline_name(path) {
            warn!("{} is not clearsigned, ignoring it", path.display());
            return Ok(None);
        }

        for ext in DETACHED_EXTENSIONS {
            let sig_path = with_appended_extension(path, ext);
            if sig_path.is_file() {
                let signature = fs::read(&sig_path)?;
                return Ok(Some(Self::new(
                    path.to_path_buf(),
                    Some(sig_path),
                    SignatureLayout::Detached,
                    data,
                    signature,
                    keyring,
                )));
            }
        }

        Ok(Some(Self::new(
            path.to_path_buf(),
            None,
            SignatureLayout::Unsigned,
            data,
            Vec::new(),
            keyring,
        )))
    }

    fn new(
        path: PathBuf,
        signature_path: Option<PathBuf>,
        layout: SignatureLayout,
        data: Vec<u8>,
        signature: Vec<u8>,
        keyring: &Arc<TrustedKeyring>,
    ) -> Self {
        let issuers = if signature.is_empty() {
            Vec::new()
        } else {
            signature_issuers(&signature)
        };
        Self {
            path,
            signature_path,
            layout,
            data,
            signature,
            issuers,
            keyring: Arc::clone(keyring),
            state: Verification::Unverified,
        }
    }

    /// Path of the data (or clearsigned) file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn signature_path(&self) -> Option<&Path> {
        self.signature_path.as_deref()
    }

    pub fn layout(&self) -> SignatureLayout {
        self.layout
    }

    /// Verify against the trusted keyring
    ///
    /// The check runs once; later calls return the cached outcome. Any
    /// failure (unknown signer, expired key, corrupt data) yields `false`.
    pub fn is_valid(&mut self) -> bool {
        if matches!(self.state, Verification::Unverified) {
            self.state = self.verify();
        }
        matches!(self.state, Verification::Valid { .. })
    }

    fn verify(&self) -> Verification {
        if self.keyring.is_empty() {
            warn!("No trusted keys to verify {} against", self.path.display());
            return Verification::Invalid;
        }

        let policy = StandardPolicy::new();
        let helper = KeyringHelper {
            keyring: &self.keyring,
            signers: Vec::new(),
        };
        let result = match self.layout {
            SignatureLayout::Unsigned => {
                warn!("{} carries no signature", self.path.display());
                return Verification::Invalid;
            }
            SignatureLayout::Inline => verify_inline(&self.data, &policy, helper),
            SignatureLayout::Detached => {
                verify_detached(&self.data, &self.signature, &policy, helper)
                    .map(|signers| (self.data.clone(), signers))
            }
        };

        match result {
            Ok((content, signers)) => {
                info!(
                    "Valid signature on {} by {}",
                    self.path.display(),
                    signers.join(", ")
                );
                Verification::Valid { content, signers }
            }
            Err(e) => {
                warn!("Signature check failed for {}: {}", self.path.display(), e);
                Verification::Invalid
            }
        }
    }

    /// Issuer fingerprints (or key IDs for old signatures), in signature order
    pub fn fingerprints(&self) -> &[String] {
        &self.issuers
    }

    /// Issuer of the first signature
    pub fn primary_fingerprint(&self) -> Result<&str> {
        self.issuers
            .first()
            .map(String::as_str)
            .ok_or_else(|| Error::NoSignature(self.path.display().to_string()))
    }

    /// Fingerprints of the trusted certificates whose signatures checked out
    ///
    /// Empty until a successful `is_valid()`.
    pub fn trusted_signers(&self) -> &[String] {
        match &self.state {
            Verification::Valid { signers, .. } => signers,
            _ => &[],
        }
    }

    /// SHA-256 of the signature block, stable across reads of the same file
    pub fn signature_id(&self) -> Result<String> {
        if self.signature.is_empty() {
            return Err(Error::NoSignature(self.path.display().to_string()));
        }
        Ok(hash::sha256(&self.signature))
    }

    /// Verified payload with the signature removed
    pub fn content(&self) -> Result<&[u8]> {
        match &self.state {
            Verification::Valid { content, .. } => Ok(content),
            _ => Err(Error::NotVerified(self.path.display().to_string())),
        }
    }

    /// Payload without any trust check, for callers applying their own policy
    pub fn unverified_content(&self) -> Cow<'_, [u8]> {
        match self.layout {
            SignatureLayout::Inline => {
                Cow::Owned(cleartext_body(&String::from_utf8_lossy(&self.data)))
            }
            _ => Cow::Borrowed(&self.data),
        }
    }
}

/// Accepts a message when at least one signature is good and made by a
/// key in the trusted keyring
struct KeyringHelper<'a> {
    keyring: &'a TrustedKeyring,
    signers: Vec<String>,
}

impl VerificationHelper for KeyringHelper<'_> {
    fn get_certs(&mut self, ids: &[KeyHandle]) -> openpgp::Result<Vec<Cert>> {
        // signatures without issuer subpackets get the whole keyring
        if ids.is_empty() {
            return Ok(self.keyring.certs().to_vec());
        }

        let mut certs: Vec<Cert> = Vec::new();
        for id in ids {
            match self.keyring.lookup(id) {
                Some(cert) if !certs.iter().any(|c| c.fingerprint() == cert.fingerprint()) => {
                    certs.push(cert.clone())
                }
                Some(_) => {}
                None => debug!("No trusted key for issuer {}", id),
            }
        }
        Ok(certs)
    }

    fn check(&mut self, structure: MessageStructure) -> openpgp::Result<()> {
        for layer in structure.into_iter() {
            if let MessageLayer::SignatureGroup { results } = layer {
                for result in results {
                    match result {
                        Ok(good) => self.signers.push(good.ka.cert().fingerprint().to_hex()),
                        Err(e) => debug!("Rejected signature: {}", e),
                    }
                }
            }
        }

        if self.signers.is_empty() {
            return Err(anyhow::anyhow!("no valid signature from a trusted key"));
        }
        Ok(())
    }
}

fn verify_inline(
    data: &[u8],
    policy: &dyn Policy,
    helper: KeyringHelper<'_>,
) -> openpgp::Result<(Vec<u8>, Vec<String>)> {
    let mut verifier = VerifierBuilder::from_bytes(data)?.with_policy(policy, None, helper)?;
    let mut content = Vec::new();
    verifier.read_to_end(&mut content)?;
    Ok((content, verifier.into_helper().signers))
}

fn verify_detached(
    data: &[u8],
    signature: &[u8],
    policy: &dyn Policy,
    helper: KeyringHelper<'_>,
) -> openpgp::Result<Vec<String>> {
    let mut verifier =
        DetachedVerifierBuilder::from_bytes(signature)?.with_policy(policy, None, helper)?;
    verifier.verify_bytes(data)?;
    Ok(verifier.into_helper().signers)
}

/// Issuer of every signature packet in a signature block
fn signature_issuers(signature: &[u8]) -> Vec<String> {
    let pile = match PacketPile::from_bytes(signature) {
        Ok(pile) => pile,
        Err(e) => {
            debug!("Unreadable signature block: {}", e);
            return Vec::new();
        }
    };

    pile.descendants()
        .filter_map(|packet| match packet {
            Packet::Signature(sig) => sig.get_issuers().first().map(handle_to_hex),
            _ => None,
        })
        .collect()
}

fn handle_to_hex(handle: &KeyHandle) -> String {
    match handle {
        KeyHandle::Fingerprint(fp) => fp.to_hex(),
        KeyHandle::KeyID(id) => id.to_hex(),
    }
}

/// Signature block of a clearsigned document, `None` if `data` is not one
fn clearsigned_signature(data: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(data).ok()?;
    if !text.trim_start().starts_with(CLEARSIGN_HEADER) {
        return None;
    }
    let start = text.find(SIGNATURE_HEADER)?;
    Some(text[start..].as_bytes().to_vec())
}

/// Dash-unescaped body of a clearsigned document
fn cleartext_body(text: &str) -> Vec<u8> {
    let mut lines = text
        .lines()
        .skip_while(|line| line.trim() != CLEARSIGN_HEADER)
        .skip(1);

    // armor headers (`Hash: SHA512`) end at the first empty line
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
    }

    let mut body = String::new();
    for line in lines {
        if line.trim_end() == SIGNATURE_HEADER {
            break;
        }
        body.push_str(line.strip_prefix("- ").unwrap_or(line));
        body.push('\n');
    }
    body.into_bytes()
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e))
        .unwrap_or(false)
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn is_inline_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| INLINE_NAMES.contains(&n))
        .unwrap_or(false)
}
