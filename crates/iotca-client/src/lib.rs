//! HTTP client for the PKI secrets engine.
//!
//! This crate provides [`PkiClient`] for the engine operations the CA
//! workflow consumes: root generation and rotation, intermediate CSR and
//! signing, issuer URL and CRL settings, roles, and role-scoped issuance.

#![doc(html_root_url = "https://docs.rs/iotca-client/0.3.0")]

mod client;
pub mod api;

pub use client::{PkiClient, PkiClientBuilder};
pub use iotca_core::{PkiError, Result};
