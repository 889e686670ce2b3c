//! Root and intermediate authority provisioning.
//!
//! An [`Authority`] for a freshly provisioned root can only come out of
//! [`AuthorityProvisioner::provision_root`], and
//! [`AuthorityProvisioner::provision_intermediate`] needs an [`Authority`]
//! as its parent. [`crate::Orchestrator`] sequences the stages so the
//! intermediate is only requested once the root stage has succeeded.

use chrono::{DateTime, Utc};
use iotca_client::PkiClient;
use iotca_core::{
    expiration_time, CrlConfig, GenerateAuthorityRequest, PkiError, SignIntermediateRequest,
    UrlsConfig, Warned,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::ArtifactStore;
use crate::error::{ProvisionError, Result, Stage};
use crate::reporter::{finish, Reporter};

/// What to request for one authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritySpec {
    /// Common name of the authority certificate
    pub common_name: String,
    /// Lifetime in engine duration syntax; engine default when `None`
    #[serde(default)]
    pub ttl: Option<String>,
}

impl AuthoritySpec {
    /// Authority with the engine's default lifetime
    #[must_use]
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ttl: None,
        }
    }
}

/// Issuer and CRL locations written to the root mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerUrls {
    /// Issuing certificate URL
    pub issuing_certificates: String,
    /// CRL distribution point
    pub crl_distribution: String,
    /// CRL lifetime
    #[serde(default)]
    pub crl_expiry: Option<String>,
}

/// Position of an authority in the hierarchy
#[derive(Debug, Clone)]
pub enum AuthorityKind {
    /// Self-signed root generated in this run
    Root,
    /// Signed by `parent` in this run
    Intermediate {
        /// The signing authority
        parent: Box<Authority>,
    },
    /// Provisioned by an earlier run; not yet confirmed to exist
    Attached,
}

/// Handle to a certificate authority on an engine mount
#[derive(Clone)]
pub struct Authority {
    kind: AuthorityKind,
    common_name: String,
    mount: String,
    certificate_pem: Option<String>,
    private_key: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    warnings: Vec<String>,
}

impl std::fmt::Debug for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authority")
            .field("kind", &self.kind)
            .field("common_name", &self.common_name)
            .field("mount", &self.mount)
            .field("expires_at", &self.expires_at)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl Authority {
    /// Refer to an authority that an earlier run provisioned on `mount`
    #[must_use]
    pub fn attached(mount: impl Into<String>, common_name: impl Into<String>) -> Self {
        Self {
            kind: AuthorityKind::Attached,
            common_name: common_name.into(),
            mount: mount.into(),
            certificate_pem: None,
            private_key: None,
            expires_at: None,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &AuthorityKind {
        &self.kind
    }

    #[must_use]
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    #[must_use]
    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Signing authority, for an intermediate
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        match &self.kind {
            AuthorityKind::Intermediate { parent } => Some(parent),
            _ => None,
        }
    }

    /// Whether this handle was produced by provisioning in this run
    #[must_use]
    pub const fn is_provisioned(&self) -> bool {
        !matches!(self.kind, AuthorityKind::Attached)
    }

    /// PEM certificate, when provisioned in this run
    #[must_use]
    pub fn certificate_pem(&self) -> Option<&str> {
        self.certificate_pem.as_deref()
    }

    /// Exported private key, when the engine returned one
    #[must_use]
    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref()
    }

    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Engine advisories collected while provisioning
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Creates roots and intermediates and persists their certificates
pub struct AuthorityProvisioner<'a> {
    client: &'a PkiClient,
    artifacts: &'a ArtifactStore,
    reporter: &'a dyn Reporter,
}

impl<'a> AuthorityProvisioner<'a> {
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

    /// Replace the root on `mount`, configure its issuer URLs and CRL, and
    /// write `rootCA.pem`.
    ///
    /// Any existing root on the mount is deleted first.
    pub async fn provision_root(
        &self,
        mount: &str,
        spec: &AuthoritySpec,
        urls: &IssuerUrls,
    ) -> Result<Authority> {
        self.reporter.stage_started(Stage::Root, &spec.common_name);
        let result = self.root_steps(mount, spec, urls).await;
        finish(self.reporter, Stage::Root, &spec.common_name, result)
    }

    async fn root_steps(
        &self,
        mount: &str,
        spec: &AuthoritySpec,
        urls: &IssuerUrls,
    ) -> Result<Authority> {
        let fail = ProvisionError::RootProvisioningFailed;
        let root = self.client.root(mount);

        match root.delete().await {
            Ok(()) => debug!(mount, "previous root deleted"),
            Err(PkiError::NotFound { .. }) => debug!(mount, "no previous root"),
            Err(e) => return Err(fail(e)),
        }

        let request = GenerateAuthorityRequest::new(&spec.common_name).ttl(spec.ttl.clone());
        let Warned {
            value: generated,
            mut warnings,
        } = root.generate_exported(&request).await.map_err(fail)?;

        let settings = self.client.settings(mount);
        let url_config = UrlsConfig {
            issuing_certificates: vec![urls.issuing_certificates.clone()],
            crl_distribution_points: vec![urls.crl_distribution.clone()],
        };
        warnings.extend(settings.set_urls(&url_config).await.map_err(fail)?);
        let crl_config = CrlConfig {
            expiry: urls.crl_expiry.clone(),
            disable: false,
        };
        warnings.extend(settings.set_crl(&crl_config).await.map_err(fail)?);

        self.surface(Stage::Root, &warnings);
        let path = self.artifacts.write_root(&generated.certificate).await?;
        self.reporter.artifact_written(Stage::Root, &path);

        Ok(Authority {
            kind: AuthorityKind::Root,
            common_name: spec.common_name.clone(),
            mount: mount.to_string(),
            certificate_pem: Some(generated.certificate),
            private_key: generated.private_key,
            expires_at: expiration_time(generated.expiration),
            warnings,
        })
    }

    /// Generate an intermediate on `mount`, have `parent` sign it, import the
    /// signed certificate and write `intermediateCA.pem`.
    ///
    /// Engine warnings are reported and kept on the returned handle; they
    /// never fail the stage.
    pub async fn provision_intermediate(
        &self,
        parent: &Authority,
        mount: &str,
        spec: &AuthoritySpec,
    ) -> Result<Authority> {
        self.reporter
            .stage_started(Stage::Intermediate, &spec.common_name);
        let result = self.intermediate_steps(parent, mount, spec).await;
        finish(self.reporter, Stage::Intermediate, &spec.common_name, result)
    }

    async fn intermediate_steps(
        &self,
        parent: &Authority,
        mount: &str,
        spec: &AuthoritySpec,
    ) -> Result<Authority> {
        let fail = ProvisionError::IntermediateProvisioningFailed;
        let intermediate = self.client.intermediate(mount);

        let request = GenerateAuthorityRequest::new(&spec.common_name).ttl(spec.ttl.clone());
        let Warned {
            value: csr,
            mut warnings,
        } = intermediate.generate_csr(&request).await.map_err(fail)?;

        let sign = SignIntermediateRequest {
            csr: csr.csr,
            common_name: spec.common_name.clone(),
            format: "pem".to_string(),
            ttl: spec.ttl.clone(),
        };
        let signed = self
            .client
            .root(parent.mount())
            .sign_intermediate(&sign)
            .await
            .map_err(fail)?;
        warnings.extend(signed.warnings);
        let signed = signed.value;

        warnings.extend(
            intermediate
                .set_signed(&signed.certificate)
                .await
                .map_err(fail)?,
        );

        self.surface(Stage::Intermediate, &warnings);
        let path = self.artifacts.write_intermediate(&signed.certificate).await?;
        self.reporter.artifact_written(Stage::Intermediate, &path);

        Ok(Authority {
            kind: AuthorityKind::Intermediate {
                parent: Box::new(parent.clone()),
            },
            common_name: spec.common_name.clone(),
            mount: mount.to_string(),
            certificate_pem: Some(signed.certificate),
            private_key: csr.private_key,
            expires_at: expiration_time(signed.expiration),
            warnings,
        })
    }

    fn surface(&self, stage: Stage, warnings: &[String]) {
        for w in warnings {
            self.reporter.warning(stage, w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::recording::RecordingReporter;
    use crate::testing::{self, INTERMEDIATE_PEM, ROOT_PEM};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn urls() -> IssuerUrls {
        IssuerUrls {
            issuing_certificates: "http://pki.example.com/v1/pki/ca".into(),
            crl_distribution: "http://pki.example.com/v1/pki/crl".into(),
            crl_expiry: Some("72h".into()),
        }
    }

    #[tokio::test]
    async fn root_is_rotated_configured_and_persisted() {
        let server = MockServer::start().await;
        // Body-matching mocks go first so the catch-all settings mocks don't shadow them.
        Mock::given(method("POST"))
            .and(path("/v1/pki/config/urls"))
            .and(body_json(json!({
                "issuing_certificates": ["http://pki.example.com/v1/pki/ca"],
                "crl_distribution_points": ["http://pki.example.com/v1/pki/crl"]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/pki/config/crl"))
            .and(body_json(json!({ "expiry": "72h", "disable": false })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        testing::mount_root(&server, "pki").await;

        let dir = tempfile::tempdir().unwrap();
        let client = PkiClient::new(server.uri(), "t").unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let reporter = RecordingReporter::default();
        let provisioner = AuthorityProvisioner::new(&client, &artifacts, &reporter);

        let root = provisioner
            .provision_root("pki", &AuthoritySpec::new("IoT Root CA"), &urls())
            .await
            .unwrap();

        assert!(matches!(root.kind(), AuthorityKind::Root));
        assert_eq!(root.certificate_pem(), Some(ROOT_PEM));
        assert_eq!(root.private_key(), Some("ROOT-KEY"));
        assert!(root.expires_at().is_some());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("rootCA.pem")).unwrap(),
            format!("{ROOT_PEM}\n")
        );
        assert_eq!(
            reporter.events(),
            [
                "start Root IoT Root CA",
                "file Root rootCA.pem",
                "done Root IoT Root CA"
            ]
        );
    }

    #[tokio::test]
    async fn missing_previous_root_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/pki/root"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": [] })))
            .expect(1)
            .mount(&server)
            .await;
        testing::mount_root(&server, "pki").await;

        let dir = tempfile::tempdir().unwrap();
        let client = PkiClient::new(server.uri(), "t").unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let provisioner = AuthorityProvisioner::new(&client, &artifacts, &crate::TracingReporter);

        assert!(provisioner
            .provision_root("pki", &AuthoritySpec::new("IoT Root CA"), &urls())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn root_conflict_fails_without_writing() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/pki/root"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/pki/root/generate/exported"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "errors": ["root already exists"] })),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = PkiClient::new(server.uri(), "t").unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let reporter = RecordingReporter::default();
        let provisioner = AuthorityProvisioner::new(&client, &artifacts, &reporter);

        let err = provisioner
            .provision_root("pki", &AuthoritySpec::new("IoT Root CA"), &urls())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::RootProvisioningFailed(_)));
        assert!(err.to_string().contains("root already exists"));
        assert!(!dir.path().join("rootCA.pem").exists());
        assert_eq!(reporter.events().last().unwrap(), "fail Root");
    }

    #[tokio::test]
    async fn intermediate_is_signed_by_parent_and_surfaces_warnings() {
        let server = MockServer::start().await;
        testing::mount_root(&server, "pki").await;
        testing::mount_intermediate(&server, "pki_int", "pki").await;

        let dir = tempfile::tempdir().unwrap();
        let client = PkiClient::new(server.uri(), "t").unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let reporter = RecordingReporter::default();
        let provisioner = AuthorityProvisioner::new(&client, &artifacts, &reporter);

        let root = provisioner
            .provision_root("pki", &AuthoritySpec::new("IoT Root CA"), &urls())
            .await
            .unwrap();
        let intermediate = provisioner
            .provision_intermediate(&root, "pki_int", &AuthoritySpec::new("IoT Intermediate CA"))
            .await
            .unwrap();

        assert_eq!(intermediate.parent().unwrap().common_name(), "IoT Root CA");
        assert_eq!(intermediate.mount(), "pki_int");
        assert_eq!(intermediate.private_key(), Some("INT-KEY"));
        assert_eq!(
            intermediate.warnings(),
            ["common name is similar to an existing issuer"]
        );
        assert!(reporter
            .events()
            .contains(&"warn Intermediate common name is similar to an existing issuer".to_string()));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("intermediateCA.pem")).unwrap(),
            format!("{INTERMEDIATE_PEM}\n")
        );
    }

    #[tokio::test]
    async fn failed_signature_leaves_no_intermediate_file() {
        let server = MockServer::start().await;
        testing::mount_root(&server, "pki").await;
        Mock::given(method("POST"))
            .and(path("/v1/pki_int/intermediate/generate/exported"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "csr": "CSR" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/pki/root/sign-intermediate"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "errors": ["internal error"]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = PkiClient::new(server.uri(), "t").unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let provisioner = AuthorityProvisioner::new(&client, &artifacts, &crate::TracingReporter);

        let root = provisioner
            .provision_root("pki", &AuthoritySpec::new("IoT Root CA"), &urls())
            .await
            .unwrap();
        let err = provisioner
            .provision_intermediate(&root, "pki_int", &AuthoritySpec::new("IoT Intermediate CA"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Intermediate);
        assert_eq!(err.engine_error().and_then(PkiError::status_code), Some(500));
        assert!(!dir.path().join("intermediateCA.pem").exists());
    }
}
