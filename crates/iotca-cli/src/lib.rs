//! # iotca-cli
//!
//! Command-line front end for the iotca workspace.
//!
//! ## Features
//!
//! - **Provisioning**: root, intermediate, role and leaf against a PKI engine
//! - **Verification**: check a device certificate against a PEM trust bundle
//! - **Device identifiers**: stable common names from device descriptors
//! - **Multiple output formats**: Pretty, JSON, YAML

pub mod cli;
pub mod config;
pub mod logging;
pub mod output;

pub use cli::run;
