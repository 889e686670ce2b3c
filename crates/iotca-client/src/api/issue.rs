//! Role-scoped certificate issuance.

use crate::PkiClient;
use iotca_core::{IssueRequest, IssuedCertificate, PkiError, Result, Warned};

/// Issuance endpoint; each role lives at `<endpoint>/<role>`
pub struct IssueApi<'a> {
    client: &'a PkiClient,
    endpoint: &'a str,
}

impl<'a> IssueApi<'a> {
    pub(crate) const fn new(client: &'a PkiClient, endpoint: &'a str) -> Self {
        Self { client, endpoint }
    }

    /// URL requests for `role` are sent to
    #[must_use]
    pub fn role_url(&self, role: &str) -> String {
        format!("{}/{role}", self.endpoint.trim_end_matches('/'))
    }

    /// Request a leaf certificate and key under `role`
    pub async fn by_role(
        &self,
        role: &str,
        request: &IssueRequest,
    ) -> Result<Warned<IssuedCertificate>> {
        let url = self.role_url(role);
        if url::Url::parse(&url).is_err() {
            return Err(PkiError::InvalidUrl(url));
        }

        let (value, warnings) = self.client.post_url(&url, request).await?.into_parts()?;
        Ok(Warned { value, warnings })
    }
}
