//! Role endpoints.

use crate::PkiClient;
use iotca_core::{Result, RoleRequest};

/// Role endpoints of one mount
pub struct RoleApi<'a> {
    client: &'a PkiClient,
    mount: &'a str,
}

impl<'a> RoleApi<'a> {
    pub(crate) const fn new(client: &'a PkiClient, mount: &'a str) -> Self {
        Self { client, mount }
    }

    /// Create or update a role; the engine treats both the same
    pub async fn write(&self, name: &str, role: &RoleRequest) -> Result<Vec<String>> {
        self.client
            .post_unit(&format!("/v1/{}/roles/{name}", self.mount), role)
            .await
    }
}
