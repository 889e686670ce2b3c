//! Issuer URL and CRL settings.

use crate::PkiClient;
use iotca_core::{CrlConfig, Result, UrlsConfig};

/// Mount-level settings endpoints
pub struct SettingsApi<'a> {
    client: &'a PkiClient,
    mount: &'a str,
}

impl<'a> SettingsApi<'a> {
    pub(crate) const fn new(client: &'a PkiClient, mount: &'a str) -> Self {
        Self { client, mount }
    }

    /// Set issuing-certificate and CRL distribution URLs
    pub async fn set_urls(&self, urls: &UrlsConfig) -> Result<Vec<String>> {
        self.client
            .post_unit(&format!("/v1/{}/config/urls", self.mount), urls)
            .await
    }

    /// Set CRL expiry and enablement
    pub async fn set_crl(&self, crl: &CrlConfig) -> Result<Vec<String>> {
        self.client
            .post_unit(&format!("/v1/{}/config/crl", self.mount), crl)
            .await
    }
}
