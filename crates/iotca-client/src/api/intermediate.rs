//! Intermediate authority endpoints.

use crate::PkiClient;
use iotca_core::{GenerateAuthorityRequest, IntermediateCsr, Result, SetSignedRequest, Warned};

/// Intermediate authority endpoints of one mount
pub struct IntermediateApi<'a> {
    client: &'a PkiClient,
    mount: &'a str,
}

impl<'a> IntermediateApi<'a> {
    pub(crate) const fn new(client: &'a PkiClient, mount: &'a str) -> Self {
        Self { client, mount }
    }

    /// Generate a key and CSR for a new intermediate, exporting the key
    pub async fn generate_csr(
        &self,
        request: &GenerateAuthorityRequest,
    ) -> Result<Warned<IntermediateCsr>> {
        let (value, warnings) = self
            .client
            .post(
                &format!("/v1/{}/intermediate/generate/exported", self.mount),
                request,
            )
            .await?
            .into_parts()?;
        Ok(Warned { value, warnings })
    }

    /// Import the root-signed certificate so the mount can issue from it
    pub async fn set_signed(&self, certificate: &str) -> Result<Vec<String>> {
        let request = SetSignedRequest {
            certificate: certificate.to_string(),
        };
        self.client
            .post_unit(&format!("/v1/{}/intermediate/set-signed", self.mount), &request)
            .await
    }

    /// Read the mount's CA certificate; `None` when nothing has been imported
    pub async fn ca_pem(&self) -> Result<Option<String>> {
        let pem = self
            .client
            .get_text(&format!("/v1/{}/ca/pem", self.mount))
            .await?;
        Ok(Some(pem).filter(|p| !p.trim().is_empty()))
    }
}
