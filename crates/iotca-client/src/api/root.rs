//! Root authority endpoints.

use crate::PkiClient;
use iotca_core::{
    GenerateAuthorityRequest, Result, RootCertificate, SignIntermediateRequest, SignedCertificate,
    Warned,
};

/// Root authority endpoints of one mount
pub struct RootApi<'a> {
    client: &'a PkiClient,
    mount: &'a str,
}

impl<'a> RootApi<'a> {
    pub(crate) const fn new(client: &'a PkiClient, mount: &'a str) -> Self {
        Self { client, mount }
    }

    /// Delete the mount's current root and its key
    pub async fn delete(&self) -> Result<()> {
        self.client.delete(&format!("/v1/{}/root", self.mount)).await
    }

    /// Generate a self-signed root with an exported private key
    pub async fn generate_exported(
        &self,
        request: &GenerateAuthorityRequest,
    ) -> Result<Warned<RootCertificate>> {
        let (value, warnings) = self
            .client
            .post(&format!("/v1/{}/root/generate/exported", self.mount), request)
            .await?
            .into_parts()?;
        Ok(Warned { value, warnings })
    }

    /// Sign an intermediate CSR with this root
    pub async fn sign_intermediate(
        &self,
        request: &SignIntermediateRequest,
    ) -> Result<Warned<SignedCertificate>> {
        let (value, warnings) = self
            .client
            .post(&format!("/v1/{}/root/sign-intermediate", self.mount), request)
            .await?
            .into_parts()?;
        Ok(Warned { value, warnings })
    }
}

#[cfg(test)]
mod tests {
    use crate::PkiClient;
    use iotca_core::GenerateAuthorityRequest;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_returns_certificate_and_warnings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pki/root/generate/exported"))
            .and(body_json(json!({ "common_name": "IoT CA", "ttl": "87600h" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "certificate": "ROOT-PEM",
                    "issuing_ca": "ROOT-PEM",
                    "serial_number": "3a:01",
                    "expiration": 2_000_000_000i64,
                    "private_key": "KEY",
                    "private_key_type": "rsa"
                },
                "warnings": ["common name looks like a duplicate"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PkiClient::new(server.uri(), "t").unwrap();
        let request = GenerateAuthorityRequest::new("IoT CA").ttl(Some("87600h".into()));
        let root = client.root("pki").generate_exported(&request).await.unwrap();

        assert_eq!(root.value.certificate, "ROOT-PEM");
        assert_eq!(root.value.private_key.as_deref(), Some("KEY"));
        assert_eq!(root.warnings, ["common name looks like a duplicate"]);
    }

    #[tokio::test]
    async fn delete_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/pki/root"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = PkiClient::new(server.uri(), "t").unwrap();
        client.root("pki").delete().await.unwrap();
    }
}
