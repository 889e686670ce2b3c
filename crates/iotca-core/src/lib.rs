//! Core types and errors for the iotca PKI engine client.
//!
//! This crate provides the foundational types used across the iotca workspace:
//!
//! - **Types**: Strongly-typed request and response bodies for the PKI secrets engine
//! - **Errors**: Engine and transport failures as [`PkiError`]
//! - **Device identifiers**: the stateless hashing helper in [`device`]
//!
//! # Example
//!
//! ```rust,ignore
//! use iotca_core::{EngineResponse, RootCertificate, Result};
//!
//! fn root_pem(resp: EngineResponse<RootCertificate>) -> Result<String> {
//!     let (root, warnings) = resp.into_parts()?;
//!     for w in &warnings {
//!         println!("engine warning: {w}");
//!     }
//!     Ok(root.certificate)
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/iotca-core/0.3.0")]

pub mod device;
mod error;
pub mod types;

pub use error::{PkiError, Result};
pub use types::*;
