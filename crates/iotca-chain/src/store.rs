//! In-memory anchor set built from a trust bundle.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::parse_x509_certificate;

use crate::bundle::split_bundle;
use crate::error::{ChainError, Result};

/// A decoded certificate from the trust bundle
#[derive(Debug, Clone)]
pub struct Anchor {
    index: usize,
    der: Vec<u8>,
    subject: String,
    self_signed: bool,
}

impl Anchor {
    /// Position in the bundle
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// DER encoding
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Whether subject and issuer names are identical
    #[must_use]
    pub const fn is_self_signed(&self) -> bool {
        self.self_signed
    }

    /// Parse the stored DER.
    pub(crate) fn parse(&self) -> Result<X509Certificate<'_>> {
        parse_x509_certificate(&self.der)
            .map(|(_, cert)| cert)
            .map_err(|e| ChainError::InvalidAnchorCertificate {
                index: self.index,
                reason: e.to_string(),
            })
    }
}

/// Anchors keyed by raw subject name, in bundle order within each key.
///
/// Built fresh for each verification and never shared.
#[derive(Debug, Default)]
pub struct TrustStore {
    anchors: Vec<Anchor>,
    by_subject: HashMap<Vec<u8>, Vec<usize>>,
}

impl TrustStore {
    /// Decode every block; any block that is not a certificate fails the whole store.
    pub fn from_blocks<S: AsRef<str>>(blocks: &[S]) -> Result<Self> {
        let mut store = Self::default();
        for (index, block) in blocks.iter().enumerate() {
            let (anchor, subject_raw) = decode_anchor(index, block.as_ref())?;
            debug!(index, subject = %anchor.subject, "loaded trust anchor");
            store
                .by_subject
                .entry(subject_raw)
                .or_default()
                .push(store.anchors.len());
            store.anchors.push(anchor);
        }
        Ok(store)
    }

    /// Split and decode a PEM bundle.
    pub fn from_pem_bundle(bundle: &[u8]) -> Result<Self> {
        Self::from_blocks(&split_bundle(bundle)?)
    }

    /// Read, split and decode a PEM bundle file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ChainError::io(path, e))?;
        Self::from_pem_bundle(&bytes)
    }

    /// Number of anchors
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether the store holds no anchors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// All anchors in bundle order
    #[must_use]
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// First anchor whose subject equals `issuer_raw`
    #[must_use]
    pub fn first_issuer(&self, issuer_raw: &[u8]) -> Option<&Anchor> {
        self.by_subject
            .get(issuer_raw)
            .and_then(|indices| indices.first())
            .map(|&i| &self.anchors[i])
    }
}

fn decode_anchor(index: usize, block: &str) -> Result<(Anchor, Vec<u8>)> {
    let invalid = |reason: String| ChainError::InvalidAnchorCertificate { index, reason };

    let pem = pem::parse(block).map_err(|e| invalid(e.to_string()))?;
    if pem.tag() != "CERTIFICATE" {
        return Err(invalid(format!("unexpected PEM tag {}", pem.tag())));
    }

    let der = pem.into_contents();
    let (subject_raw, subject, self_signed) = {
        let (_, cert) = parse_x509_certificate(&der).map_err(|e| invalid(e.to_string()))?;
        (
            cert.subject().as_raw().to_vec(),
            cert.subject().to_string(),
            cert.subject().as_raw() == cert.issuer().as_raw(),
        )
    };

    Ok((
        Anchor {
            index,
            der,
            subject,
            self_signed,
        },
        subject_raw,
    ))
}
