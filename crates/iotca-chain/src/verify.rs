//! Chain-of-trust verification.
//!
//! Path construction is first-match-wins: at each hop the first anchor (in
//! bundle order) whose subject equals the current certificate's issuer is
//! taken. If that candidate fails a check the chain is rejected; other
//! anchors with the same subject are not tried.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};
use x509_parser::certificate::X509Certificate;
use x509_parser::parse_x509_certificate;
use x509_parser::time::ASN1Time;

use crate::bundle::split_bundle;
use crate::error::ChainError;
use crate::store::TrustStore;

/// Hops walked before giving up on a chain.
pub const MAX_CHAIN_DEPTH: usize = 16;

/// The check that failed at a hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HopCheck {
    /// Not-before lies in the future
    NotYetValid,
    /// Not-after lies in the past
    Expired,
    /// No anchor has a subject matching the issuer
    NoIssuerPath,
    /// The issuer's key does not verify the signature
    Signature,
    /// An issuer lacks the CA basic constraint
    NotCa,
    /// More than [`MAX_CHAIN_DEPTH`] hops without reaching a self-signed anchor
    DepthExceeded,
}

impl fmt::Display for HopCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotYetValid => "not yet valid",
            Self::Expired => "expired",
            Self::NoIssuerPath => "no issuer path",
            Self::Signature => "signature verification failed",
            Self::NotCa => "issuer is not a CA",
            Self::DepthExceeded => "chain too long",
        })
    }
}

/// Why a certificate was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// An input file could not be read
    Unreadable { path: String, reason: String },
    /// The bundle has an unterminated certificate block
    MalformedBundle { offset: usize },
    /// A bundle entry is not a certificate
    InvalidAnchorCertificate { index: usize, reason: String },
    /// The certificate under test is not a certificate
    InvalidLeafCertificate { reason: String },
    /// A check failed while walking the chain; hop 0 is the leaf
    Hop {
        depth: usize,
        subject: String,
        check: HopCheck,
    },
}

impl Rejection {
    /// The failed hop check, if the rejection came from the walk
    #[must_use]
    pub const fn check(&self) -> Option<HopCheck> {
        match self {
            Self::Hop { check, .. } => Some(*check),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { path, reason } => write!(f, "cannot read {path}: {reason}"),
            Self::MalformedBundle { offset } => {
                write!(f, "malformed bundle: unterminated certificate at byte {offset}")
            }
            Self::InvalidAnchorCertificate { index, reason } => {
                write!(f, "bundle entry {index} is not a valid certificate: {reason}")
            }
            Self::InvalidLeafCertificate { reason } => {
                write!(f, "leaf certificate is invalid: {reason}")
            }
            Self::Hop {
                depth,
                subject,
                check,
            } => write!(f, "{check} at hop {depth} ({subject})"),
        }
    }
}

impl From<ChainError> for Rejection {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::MalformedBundle { offset } => Self::MalformedBundle { offset },
            ChainError::InvalidAnchorCertificate { index, reason } => {
                Self::InvalidAnchorCertificate { index, reason }
            }
            ChainError::InvalidLeafCertificate(reason) => Self::InvalidLeafCertificate { reason },
            ChainError::Io { path, source } => Self::Unreadable {
                path: path.display().to_string(),
                reason: source.to_string(),
            },
        }
    }
}

/// Outcome of one verification call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum VerificationResult {
    /// A complete path reached a trusted, self-signed anchor
    Valid {
        /// Subjects walked, leaf first, anchor last
        chain: Vec<String>,
    },
    /// No acceptable path exists
    Invalid {
        /// First failure encountered
        reason: Rejection,
    },
}

impl VerificationResult {
    /// Whether the verdict is `Valid`
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// The rejection, for an `Invalid` verdict
    #[must_use]
    pub const fn reason(&self) -> Option<&Rejection> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason } => Some(reason),
        }
    }

    const fn invalid(reason: Rejection) -> Self {
        Self::Invalid { reason }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid { chain } => write!(f, "valid (chain: {})", chain.join(" -> ")),
            Self::Invalid { reason } => write!(f, "invalid: {reason}"),
        }
    }
}

/// Verification context binding an anchor set to a point in time
pub struct Verifier<'s> {
    store: &'s TrustStore,
    at: Option<ASN1Time>,
}

impl<'s> Verifier<'s> {
    /// Verify against `store` at the current time
    #[must_use]
    pub const fn new(store: &'s TrustStore) -> Self {
        Self { store, at: None }
    }

    /// Evaluate validity periods at `time` instead of now
    #[must_use]
    pub const fn at(mut self, time: ASN1Time) -> Self {
        self.at = Some(time);
        self
    }

    /// Verify a DER leaf
    #[must_use]
    pub fn verify_der(&self, leaf_der: &[u8]) -> VerificationResult {
        let verdict = match self.walk(leaf_der) {
            Ok(chain) => VerificationResult::Valid { chain },
            Err(reason) => VerificationResult::invalid(reason),
        };
        match &verdict {
            VerificationResult::Valid { chain } => debug!(depth = chain.len(), "chain verified"),
            VerificationResult::Invalid { reason } => warn!(%reason, "chain rejected"),
        }
        verdict
    }

    fn walk(&self, leaf_der: &[u8]) -> Result<Vec<String>, Rejection> {
        let now = self.at.unwrap_or_else(ASN1Time::now);
        let mut current_der = leaf_der;
        let mut chain = Vec::new();

        for depth in 0..MAX_CHAIN_DEPTH {
            let current = parse(current_der, depth)?;
            let subject = current.subject().to_string();
            let fail = |check| Rejection::Hop {
                depth,
                subject: subject.clone(),
                check,
            };

            check_validity(&current, now).map_err(fail)?;
            if depth > 0 && !is_ca(&current) {
                return Err(fail(HopCheck::NotCa));
            }
            chain.push(subject.clone());

            let anchor = self
                .store
                .first_issuer(current.issuer().as_raw())
                .ok_or_else(|| fail(HopCheck::NoIssuerPath))?;
            let issuer = anchor.parse().map_err(Rejection::from)?;
            current
                .verify_signature(Some(issuer.public_key()))
                .map_err(|_| fail(HopCheck::Signature))?;

            if anchor.is_self_signed() {
                return self.accept_anchor(&issuer, anchor.der() == current_der, depth + 1, chain);
            }
            current_der = anchor.der();
        }

        Err(Rejection::Hop {
            depth: MAX_CHAIN_DEPTH,
            subject: chain.last().cloned().unwrap_or_default(),
            check: HopCheck::DepthExceeded,
        })
    }

    /// Terminal checks on the self-signed anchor that closes the path
    fn accept_anchor(
        &self,
        anchor: &X509Certificate<'_>,
        already_walked: bool,
        depth: usize,
        mut chain: Vec<String>,
    ) -> Result<Vec<String>, Rejection> {
        let now = self.at.unwrap_or_else(ASN1Time::now);
        let subject = anchor.subject().to_string();
        let fail = |check| Rejection::Hop {
            depth,
            subject: subject.clone(),
            check,
        };

        check_validity(anchor, now).map_err(fail)?;
        if !is_ca(anchor) {
            return Err(fail(HopCheck::NotCa));
        }
        if !already_walked {
            chain.push(subject.clone());
        }
        Ok(chain)
    }
}

/// Verify a PEM leaf against the bundle file at `bundle_path`.
///
/// The leaf is decoded before the bundle is read, so a bad leaf is reported
/// as such even when the bundle is also broken.
#[must_use]
pub fn verify(leaf_pem: &str, bundle_path: &Path) -> VerificationResult {
    let leaf_der = match decode_leaf(leaf_pem) {
        Ok(der) => der,
        Err(e) => return VerificationResult::invalid(e.into()),
    };
    match TrustStore::from_file(bundle_path) {
        Ok(store) => Verifier::new(&store).verify_der(&leaf_der),
        Err(e) => VerificationResult::invalid(e.into()),
    }
}

/// Verify a PEM leaf against an in-memory bundle
#[must_use]
pub fn verify_pem(leaf_pem: &str, bundle: &[u8]) -> VerificationResult {
    let leaf_der = match decode_leaf(leaf_pem) {
        Ok(der) => der,
        Err(e) => return VerificationResult::invalid(e.into()),
    };
    match TrustStore::from_pem_bundle(bundle) {
        Ok(store) => Verifier::new(&store).verify_der(&leaf_der),
        Err(e) => VerificationResult::invalid(e.into()),
    }
}

/// Verify the leaf file at `leaf_path` against the bundle file at `bundle_path`
#[must_use]
pub fn verify_files(leaf_path: impl AsRef<Path>, bundle_path: impl AsRef<Path>) -> VerificationResult {
    let leaf_path = leaf_path.as_ref();
    match std::fs::read_to_string(leaf_path) {
        Ok(leaf_pem) => verify(&leaf_pem, bundle_path.as_ref()),
        Err(e) => VerificationResult::invalid(ChainError::io(leaf_path, e).into()),
    }
}

fn decode_leaf(leaf_pem: &str) -> Result<Vec<u8>, ChainError> {
    let invalid = |reason: String| ChainError::InvalidLeafCertificate(reason);

    let blocks = split_bundle(leaf_pem.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let first = blocks
        .first()
        .ok_or_else(|| invalid("no certificate block found".into()))?;
    let der = pem::parse(first)
        .map_err(|e| invalid(e.to_string()))?
        .into_contents();
    parse_x509_certificate(&der).map_err(|e| invalid(e.to_string()))?;
    Ok(der)
}

fn parse(der: &[u8], depth: usize) -> Result<X509Certificate<'_>, Rejection> {
    parse_x509_certificate(der)
        .map(|(_, cert)| cert)
        .map_err(|e| Rejection::InvalidLeafCertificate {
            reason: format!("hop {depth}: {e}"),
        })
}

fn check_validity(cert: &X509Certificate<'_>, now: ASN1Time) -> Result<(), HopCheck> {
    let validity = cert.validity();
    if now < validity.not_before {
        Err(HopCheck::NotYetValid)
    } else if now > validity.not_after {
        Err(HopCheck::Expired)
    } else {
        Ok(())
    }
}

fn is_ca(cert: &X509Certificate<'_>) -> bool {
    cert.basic_constraints()
        .ok()
        .flatten()
        .is_some_and(|bc| bc.value.ca)
}
