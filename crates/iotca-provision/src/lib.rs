//! Ordered provisioning of an IoT certificate authority hierarchy.
//!
//! A run creates, in order, a root authority, an intermediate signed by it,
//! an issuance role on the intermediate, and optionally one leaf
//! certificate. Each component is usable on its own; [`Orchestrator`]
//! strings them together and stops at the first failure.
//!
//! Progress goes to a caller-supplied [`Reporter`]. Certificates and keys are
//! written through an [`ArtifactStore`].
//!
//! # Example
//!
//! ```rust,ignore
//! use iotca_client::PkiClient;
//! use iotca_provision::{ArtifactStore, Orchestrator, TracingReporter};
//!
//! let client = PkiClient::new("http://127.0.0.1:8200", token)?;
//! let artifacts = ArtifactStore::new("./certs");
//! let report = Orchestrator::new(&client, &artifacts, &TracingReporter)
//!     .run(&plan)
//!     .await?;
//! println!("root expires {:?}", report.root.expires_at());
//! ```

#![doc(html_root_url = "https://docs.rs/iotca-provision/0.3.0")]

pub mod artifacts;
pub mod authority;
mod error;
pub mod issuance;
pub mod orchestrator;
pub mod reporter;
pub mod role;

#[cfg(test)]
mod testing;

pub use artifacts::{ArtifactStore, LeafPaths, INTERMEDIATE_CERT_FILE, ROOT_CERT_FILE};
pub use authority::{Authority, AuthorityKind, AuthorityProvisioner, AuthoritySpec, IssuerUrls};
pub use error::{ProvisionError, Result, Stage};
pub use issuance::{Certificate, IssuanceClient, Payload};
pub use orchestrator::{Orchestrator, ProvisionPlan, ProvisionReport};
pub use reporter::{Reporter, TracingReporter};
pub use role::{Role, RoleManager, RoleSpec};
