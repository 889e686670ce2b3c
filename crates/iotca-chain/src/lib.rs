//! # iotca-chain
//!
//! Chain-of-trust verification for leaf certificates against a PEM trust bundle.
//!
//! ## Data Flow
//!
//! ```text
//! bundle bytes --split_bundle()--> [PEM block, ...]
//!              --TrustStore::from_blocks()--> anchors keyed by subject
//! leaf DER ----Verifier::verify_der()--> walk issuer -> subject until a
//!                                        self-signed anchor is reached
//!              --> VerificationResult::Valid | VerificationResult::Invalid { reason }
//! ```
//!
//! Verification never fails: every parse, decode or path problem is folded
//! into [`VerificationResult::Invalid`] with a reason naming the failing hop and check.
//! Revocation is not consulted. Nothing is cached between calls.
//!
//! ## Example
//!
//! ```rust,ignore
//! use iotca_chain::verify_files;
//!
//! let verdict = verify_files("device.pem", "ca-bundle.pem");
//! if !verdict.is_valid() {
//!     eprintln!("{verdict}");
//!     std::process::exit(1);
//! }
//! ```

pub mod bundle;
pub mod error;
pub mod store;
pub mod verify;

pub use bundle::split_bundle;
pub use error::{ChainError, Result};
pub use store::{Anchor, TrustStore};
pub use verify::{
    verify, verify_files, verify_pem, HopCheck, Rejection, VerificationResult, Verifier,
    MAX_CHAIN_DEPTH,
};
pub use x509_parser::time::ASN1Time;
