//! Issuance role definition.

use iotca_client::PkiClient;
use iotca_core::{PkiError, RoleRequest};
use serde::{Deserialize, Serialize};

use crate::authority::Authority;
use crate::error::{ProvisionError, Result, Stage};
use crate::reporter::{finish, Reporter};

const fn default_true() -> bool {
    true
}

/// Issuance policy to write for a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role name, unique within the authority's mount
    pub name: String,
    /// Domains the role may certify; may be empty
    pub allowed_domains: Vec<String>,
    /// Lifetime of issued certificates
    #[serde(default)]
    pub ttl: Option<String>,
    #[serde(default)]
    pub allow_localhost: bool,
    #[serde(default = "default_true")]
    pub allow_subdomains: bool,
}

impl RoleSpec {
    /// Policy with no localhost and subdomains allowed
    #[must_use]
    pub fn new(name: impl Into<String>, allowed_domains: Vec<String>) -> Self {
        Self {
            name: name.into(),
            allowed_domains,
            ttl: None,
            allow_localhost: false,
            allow_subdomains: true,
        }
    }

    fn request(&self) -> RoleRequest {
        let mut request = RoleRequest::new(self.allowed_domains.clone());
        request.allow_localhost = self.allow_localhost;
        request.allow_subdomains = self.allow_subdomains;
        request.ttl.clone_from(&self.ttl);
        request.max_ttl.clone_from(&self.ttl);
        request
    }
}

/// A role that exists on an authority's mount
#[derive(Debug, Clone)]
pub struct Role {
    name: String,
    mount: String,
    policy: Option<RoleRequest>,
    warnings: Vec<String>,
}

impl Role {
    /// Refer to a role defined by an earlier run
    #[must_use]
    pub fn attached(name: impl Into<String>, mount: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mount: mount.into(),
            policy: None,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mount of the authority the role issues from
    #[must_use]
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Policy written in this run, if any
    #[must_use]
    pub const fn policy(&self) -> Option<&RoleRequest> {
        self.policy.as_ref()
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Writes roles onto an authority's mount
pub struct RoleManager<'a> {
    client: &'a PkiClient,
    reporter: &'a dyn Reporter,
}

impl<'a> RoleManager<'a> {
    #[must_use]
    pub fn new(client: &'a PkiClient, reporter: &'a dyn Reporter) -> Self {
        Self { client, reporter }
    }

    /// Create or update `spec` on `authority`'s mount.
    ///
    /// An attached authority is first checked for an imported CA
    /// certificate; a mount without one fails with `RoleDefinitionFailed`.
    pub async fn define_role(&self, authority: &Authority, spec: &RoleSpec) -> Result<Role> {
        self.reporter.stage_started(Stage::Role, &spec.name);
        let result = self.define(authority, spec).await;
        finish(self.reporter, Stage::Role, &spec.name, result)
    }

    async fn define(&self, authority: &Authority, spec: &RoleSpec) -> Result<Role> {
        let fail = |reason: String| ProvisionError::RoleDefinitionFailed {
            role: spec.name.clone(),
            reason,
        };

        if !authority.is_provisioned() {
            match self.client.intermediate(authority.mount()).ca_pem().await {
                Ok(Some(_)) => {}
                Ok(None) | Err(PkiError::NotFound { .. }) => {
                    return Err(fail(format!(
                        "authority on mount '{}' is not provisioned",
                        authority.mount()
                    )));
                }
                Err(e) => return Err(fail(e.to_string())),
            }
        }

        let policy = spec.request();
        let warnings = self
            .client
            .roles(authority.mount())
            .write(&spec.name, &policy)
            .await
            .map_err(|e| fail(e.to_string()))?;
        for w in &warnings {
            self.reporter.warning(Stage::Role, w);
        }

        Ok(Role {
            name: spec.name.clone(),
            mount: authority.mount().to_string(),
            policy: Some(policy),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::recording::RecordingReporter;
    use crate::testing;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn spec() -> RoleSpec {
        let mut spec = RoleSpec::new("devices", vec!["devices.example.com".into()]);
        spec.ttl = Some("8760h".into());
        spec
    }

    #[tokio::test]
    async fn writes_policy_with_default_flags() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pki_int/roles/devices"))
            .and(body_json(json!({
                "allowed_domains": ["devices.example.com"],
                "allow_localhost": false,
                "allow_subdomains": true,
                "ttl": "8760h",
                "max_ttl": "8760h"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;
        testing::mount_ca(&server, "pki_int", testing::INTERMEDIATE_PEM).await;

        let client = PkiClient::new(server.uri(), "t").unwrap();
        let reporter = RecordingReporter::default();
        let manager = RoleManager::new(&client, &reporter);
        let authority = Authority::attached("pki_int", "IoT Intermediate CA");

        // Create, then update with the same policy.
        let first = manager.define_role(&authority, &spec()).await.unwrap();
        let second = manager.define_role(&authority, &spec()).await.unwrap();
        assert_eq!(first.policy(), second.policy());
        assert_eq!(first.mount(), "pki_int");
        assert_eq!(reporter.events().last().unwrap(), "done Role devices");
    }

    #[tokio::test]
    async fn unprovisioned_authority_fails_before_writing() {
        let server = MockServer::start().await;
        testing::mount_ca(&server, "pki_int", "").await;
        Mock::given(method("POST"))
            .and(path("/v1/pki_int/roles/devices"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let client = PkiClient::new(server.uri(), "t").unwrap();
        let manager = RoleManager::new(&client, &crate::TracingReporter);
        let authority = Authority::attached("pki_int", "IoT Intermediate CA");

        let err = manager.define_role(&authority, &spec()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::RoleDefinitionFailed { .. }));
        assert!(err.to_string().contains("not provisioned"));
    }

    #[tokio::test]
    async fn engine_rejection_is_role_failure() {
        let server = MockServer::start().await;
        testing::mount_ca(&server, "pki_int", testing::INTERMEDIATE_PEM).await;
        Mock::given(method("POST"))
            .and(path("/v1/pki_int/roles/devices"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "errors": ["invalid ttl"] })),
            )
            .mount(&server)
            .await;

        let client = PkiClient::new(server.uri(), "t").unwrap();
        let manager = RoleManager::new(&client, &crate::TracingReporter);
        let authority = Authority::attached("pki_int", "IoT Intermediate CA");

        let err = manager.define_role(&authority, &spec()).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Role);
        assert!(err.to_string().contains("invalid ttl"));
    }

    #[test]
    fn spec_flags_default_from_toml_style_input() {
        let spec: RoleSpec = serde_json::from_value(json!({
            "name": "devices",
            "allowed_domains": []
        }))
        .unwrap();
        assert!(!spec.allow_localhost);
        assert!(spec.allow_subdomains);
        assert!(spec.allowed_domains.is_empty());
    }
}
