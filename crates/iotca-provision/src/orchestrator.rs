//! The full provisioning sequence.
//!
//! ```text
//! root ──▶ intermediate ──▶ role ──▶ leaf (optional)
//! ```
//!
//! Each stage is awaited before the next starts, and the first failure ends
//! the run. Nothing is rolled back; the error names the stage that failed.

use std::path::PathBuf;

use iotca_client::PkiClient;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::authority::{Authority, AuthorityProvisioner, AuthoritySpec, IssuerUrls};
use crate::error::Result;
use crate::issuance::{Certificate, IssuanceClient, Payload};
use crate::reporter::Reporter;
use crate::role::{Role, RoleManager, RoleSpec};

/// Everything one provisioning run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionPlan {
    /// Mount holding the root authority
    pub root_mount: String,
    /// Mount holding the intermediate authority
    pub intermediate_mount: String,
    pub root: AuthoritySpec,
    pub intermediate: AuthoritySpec,
    pub urls: IssuerUrls,
    pub role: RoleSpec,
    /// Issuance base URL; the role name is appended
    pub issuance_endpoint: String,
    /// Descriptor for a leaf to issue once the role exists
    #[serde(default)]
    pub payload: Option<PathBuf>,
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub root: Authority,
    pub intermediate: Authority,
    pub role: Role,
    pub certificate: Option<Certificate>,
}

impl ProvisionReport {
    /// Every engine warning raised during the run, in order
    #[must_use]
    pub fn warnings(&self) -> Vec<&str> {
        self.root
            .warnings()
            .iter()
            .chain(self.intermediate.warnings())
            .chain(self.role.warnings())
            .chain(self.certificate.iter().flat_map(Certificate::warnings))
            .map(String::as_str)
            .collect()
    }
}

/// Runs a [`ProvisionPlan`] stage by stage
pub struct Orchestrator<'a> {
    client: &'a PkiClient,
    artifacts: &'a ArtifactStore,
    reporter: &'a dyn Reporter,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(
        client: &'a PkiClient,
        artifacts: &'a ArtifactStore,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            client,
            artifacts,
            reporter,
        }
    }

    /// Provision root, intermediate and role, then issue the payload's leaf.
    ///
    /// The payload is loaded before the root is rotated, so an unreadable or
    /// malformed descriptor aborts the run before anything on the engine
    /// changes.
    pub async fn run(&self, plan: &ProvisionPlan) -> Result<ProvisionReport> {
        info!(
            root = %plan.root.common_name,
            intermediate = %plan.intermediate.common_name,
            role = %plan.role.name,
            "provisioning run started"
        );

        let payload = match &plan.payload {
            Some(path) => Some(Payload::load(path).await.map_err(|e| {
                self.reporter.stage_failed(&e);
                e
            })?),
            None => None,
        };

        let authorities = AuthorityProvisioner::new(self.client, self.artifacts, self.reporter);
        let root = authorities
            .provision_root(&plan.root_mount, &plan.root, &plan.urls)
            .await?;
        let intermediate = authorities
            .provision_intermediate(&root, &plan.intermediate_mount, &plan.intermediate)
            .await?;

        let role = RoleManager::new(self.client, self.reporter)
            .define_role(&intermediate, &plan.role)
            .await?;

        let certificate = match &payload {
            Some(payload) => Some(
                IssuanceClient::new(
                    self.client,
                    &plan.issuance_endpoint,
                    self.artifacts,
                    self.reporter,
                )
                .issue_payload(&role, payload)
                .await?,
            ),
            None => None,
        };

        info!("provisioning run finished");
        Ok(ProvisionReport {
            root,
            intermediate,
            role,
            certificate,
        })
    }
}
