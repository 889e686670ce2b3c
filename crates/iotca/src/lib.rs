//! IoT certificate authority provisioning and chain-of-trust verification.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use iotca::{verify_files, ArtifactStore, Orchestrator, PkiClient, TracingReporter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PkiClient::new("http://127.0.0.1:8200", std::env::var("IOTCA_TOKEN")?)?;
//!     let artifacts = ArtifactStore::new("./certs");
//!
//!     // Root -> intermediate -> role -> leaf, stopping at the first failure
//!     let report = Orchestrator::new(&client, &artifacts, &TracingReporter)
//!         .run(&plan)
//!         .await?;
//!
//!     // Later, on the device side
//!     let verdict = verify_files("certs/sensor-1.pem", "certs/rootCA.pem");
//!     println!("{verdict}");
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/iotca/0.3.0")]

// Re-export core types
pub use iotca_core::*;

// Re-export client
pub use iotca_client::{PkiClient, PkiClientBuilder};

// Re-export verification
pub use iotca_chain as chain;
pub use iotca_chain::{verify, verify_files, verify_pem, VerificationResult};

// Re-export provisioning
pub use iotca_provision as provision;
pub use iotca_provision::{
    ArtifactStore, Orchestrator, ProvisionError, ProvisionPlan, ProvisionReport, Reporter, Stage,
    TracingReporter,
};

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;
