//! Leaf certificate issuance under a role.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use iotca_client::PkiClient;
use iotca_core::{expiration_time, IssueRequest, Warned};
use tracing::debug;

use crate::artifacts::{ArtifactStore, LeafPaths};
use crate::error::{ProvisionError, Result, Stage};
use crate::reporter::{finish, Reporter};
use crate::role::Role;

/// A parsed issuance descriptor and where it came from
#[derive(Debug, Clone)]
pub struct Payload {
    source: PathBuf,
    request: IssueRequest,
}

impl Payload {
    /// Read and parse a JSON descriptor.
    ///
    /// An unreadable file is `PayloadUnreadable`; anything that does not
    /// parse to a descriptor with a common name is `PayloadMalformed`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProvisionError::PayloadUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(path, &raw)
    }

    /// Parse a descriptor already in memory; `source` is used in errors
    pub fn parse(source: impl Into<PathBuf>, raw: &str) -> Result<Self> {
        let source = source.into();
        let request: IssueRequest =
            serde_json::from_str(raw).map_err(|e| ProvisionError::PayloadMalformed {
                path: source.clone(),
                reason: e.to_string(),
            })?;
        if request.common_name.trim().is_empty() {
            return Err(ProvisionError::PayloadMalformed {
                path: source,
                reason: "common_name is empty".to_string(),
            });
        }
        Ok(Self { source, request })
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub const fn request(&self) -> &IssueRequest {
        &self.request
    }
}

/// An issued and persisted leaf credential
#[derive(Clone)]
pub struct Certificate {
    common_name: String,
    role: String,
    certificate_pem: String,
    private_key: String,
    serial_number: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    paths: LeafPaths,
    warnings: Vec<String>,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("common_name", &self.common_name)
            .field("role", &self.role)
            .field("serial_number", &self.serial_number)
            .field("expires_at", &self.expires_at)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl Certificate {
    #[must_use]
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// Role the certificate was issued under
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    #[must_use]
    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    #[must_use]
    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    #[must_use]
    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Where the certificate and key were written
    #[must_use]
    pub const fn paths(&self) -> &LeafPaths {
        &self.paths
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Requests leaf certificates from a role-scoped endpoint
pub struct IssuanceClient<'a> {
    client: &'a PkiClient,
    endpoint: &'a str,
    artifacts: &'a ArtifactStore,
    reporter: &'a dyn Reporter,
}

impl<'a> IssuanceClient<'a> {
    /// `endpoint` is the issuance base URL; requests go to `<endpoint>/<role>`
    #[must_use]
    pub fn new(
        client: &'a PkiClient,
        endpoint: &'a str,
        artifacts: &'a ArtifactStore,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            client,
            endpoint,
            artifacts,
            reporter,
        }
    }

    /// Read the descriptor at `payload` and issue under `role`
    pub async fn issue(&self, role: &Role, payload: impl AsRef<Path>) -> Result<Certificate> {
        let payload = payload.as_ref();
        self.reporter
            .stage_started(Stage::Issuance, &payload.display().to_string());
        let result = match Payload::load(payload).await {
            Ok(loaded) => self.submit(role, &loaded).await,
            Err(e) => Err(e),
        };
        let subject = result
            .as_ref()
            .map_or_else(|_| role.name().to_string(), |c| c.common_name.clone());
        finish(self.reporter, Stage::Issuance, &subject, result)
    }

    /// Issue under `role` from an already-loaded descriptor
    pub async fn issue_payload(&self, role: &Role, payload: &Payload) -> Result<Certificate> {
        let cn = &payload.request.common_name;
        self.reporter.stage_started(Stage::Issuance, cn);
        let result = self.submit(role, payload).await;
        finish(self.reporter, Stage::Issuance, cn, result)
    }

    async fn submit(&self, role: &Role, payload: &Payload) -> Result<Certificate> {
        let request = &payload.request;
        let paths = self
            .artifacts
            .leaf_paths(&request.common_name)
            .ok_or_else(|| ProvisionError::PayloadMalformed {
                path: payload.source.clone(),
                reason: format!(
                    "common_name '{}' cannot be used as a file name",
                    request.common_name
                ),
            })?;

        debug!(role = role.name(), common_name = %request.common_name, "requesting leaf");
        let Warned {
            value: issued,
            warnings,
        } = self
            .client
            .issue(self.endpoint)
            .by_role(role.name(), request)
            .await
            .map_err(|source| ProvisionError::IssuanceRequestFailed {
                role: role.name().to_string(),
                source,
            })?;
        for w in &warnings {
            self.reporter.warning(Stage::Issuance, w);
        }

        self.artifacts
            .write_leaf(&paths, &issued.certificate, &issued.private_key)
            .await?;
        self.reporter
            .artifact_written(Stage::Issuance, &paths.certificate);
        self.reporter
            .artifact_written(Stage::Issuance, &paths.private_key);

        Ok(Certificate {
            common_name: request.common_name.clone(),
            role: role.name().to_string(),
            certificate_pem: issued.certificate,
            private_key: issued.private_key,
            serial_number: issued.serial_number,
            expires_at: expiration_time(issued.expiration),
            paths,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::recording::RecordingReporter;
    use crate::testing::{self, LEAF_KEY, LEAF_PEM};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map_or(0, Iterator::count)
    }

    #[tokio::test]
    async fn issues_and_persists_cert_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pki_int/issue/devices"))
            .and(header("authorization", "Bearer s.token"))
            .and(body_json(json!({
                "common_name": "sensor-1",
                "alt_names": "sensor.devices.example.com"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "certificate": LEAF_PEM, "private_key": LEAF_KEY, "serial_number": "05:06" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let workdir = tempfile::tempdir().unwrap();
        let out = workdir.path().join("out");
        let payload = testing::write_payload(workdir.path(), "sensor-1");
        let client = PkiClient::new(server.uri(), "s.token").unwrap();
        let artifacts = ArtifactStore::new(&out);
        let reporter = RecordingReporter::default();
        let endpoint = format!("{}/v1/pki_int/issue", server.uri());
        let issuer = IssuanceClient::new(&client, &endpoint, &artifacts, &reporter);

        let cert = issuer
            .issue(&Role::attached("devices", "pki_int"), &payload)
            .await
            .unwrap();

        assert_eq!(cert.common_name(), "sensor-1");
        assert_eq!(cert.serial_number(), Some("05:06"));
        assert_eq!(
            std::fs::read_to_string(out.join("sensor-1.pem")).unwrap(),
            format!("{LEAF_PEM}\n")
        );
        assert_eq!(
            std::fs::read_to_string(out.join("sensor-1.key")).unwrap(),
            format!("{LEAF_KEY}\n")
        );
        let events = reporter.events();
        assert!(events.contains(&"file Issuance sensor-1.pem".to_string()));
        assert!(events.contains(&"file Issuance sensor-1.key".to_string()));
        assert_eq!(events.last().unwrap(), "done Issuance sensor-1");
    }

    #[tokio::test]
    async fn unknown_role_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pki_int/issue/ghost"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "errors": ["unknown role: ghost"] })),
            )
            .mount(&server)
            .await;

        let workdir = tempfile::tempdir().unwrap();
        let out = workdir.path().join("out");
        let payload = testing::write_payload(workdir.path(), "sensor-1");
        let client = PkiClient::new(server.uri(), "t").unwrap();
        let artifacts = ArtifactStore::new(&out);
        let endpoint = format!("{}/v1/pki_int/issue", server.uri());
        let issuer = IssuanceClient::new(&client, &endpoint, &artifacts, &crate::TracingReporter);

        let err = issuer
            .issue(&Role::attached("ghost", "pki_int"), &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::IssuanceRequestFailed { ref role, .. } if role == "ghost"));
        assert_eq!(count_files(&out), 0);
    }

    #[tokio::test]
    async fn unreadable_payload_never_reaches_engine() {
        let server = MockServer::start().await;
        testing::mount_issue(&server, "pki_int", "devices").await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let workdir = tempfile::tempdir().unwrap();
        let client = PkiClient::new(server.uri(), "t").unwrap();
        let artifacts = ArtifactStore::new(workdir.path());
        let endpoint = format!("{}/v1/pki_int/issue", server.uri());
        let issuer = IssuanceClient::new(&client, &endpoint, &artifacts, &crate::TracingReporter);

        let err = issuer
            .issue(&Role::attached("devices", "pki_int"), workdir.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::PayloadUnreadable { .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for raw in ["{", r#"{"alt_names": ["x"]}"#, r#"{"common_name": "  "}"#] {
            let err = Payload::parse("payload.json", raw).unwrap_err();
            assert!(matches!(err, ProvisionError::PayloadMalformed { .. }), "{raw}");
        }
        let ok = Payload::parse("payload.json", r#"{"common_name": "sensor-1"}"#).unwrap();
        assert_eq!(ok.request().common_name, "sensor-1");
    }

    #[tokio::test]
    async fn path_like_common_name_is_malformed() {
        let server = MockServer::start().await;
        testing::mount_issue(&server, "pki_int", "devices").await;

        let workdir = tempfile::tempdir().unwrap();
        let client = PkiClient::new(server.uri(), "t").unwrap();
        let artifacts = ArtifactStore::new(workdir.path());
        let endpoint = format!("{}/v1/pki_int/issue", server.uri());
        let issuer = IssuanceClient::new(&client, &endpoint, &artifacts, &crate::TracingReporter);
        let payload = Payload::parse("payload.json", r#"{"common_name": "../escape"}"#).unwrap();

        let err = issuer
            .issue_payload(&Role::attached("devices", "pki_int"), &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::PayloadMalformed { .. }));
    }
}
