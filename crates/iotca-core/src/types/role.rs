use serde::{Deserialize, Serialize};

/// Issuance policy written to `roles/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRequest {
    /// Domains the role may certify
    pub allowed_domains: Vec<String>,

    /// Permit `localhost` as a subject
    pub allow_localhost: bool,

    /// Permit subdomains of `allowed_domains`
    pub allow_subdomains: bool,

    /// Default and maximum lifetime of issued certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    /// Upper bound on requested lifetimes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ttl: Option<String>,
}

impl RoleRequest {
    /// Policy with the default flags: no localhost, subdomains allowed
    #[must_use]
    pub fn new(allowed_domains: Vec<String>) -> Self {
        Self {
            allowed_domains,
            allow_localhost: false,
            allow_subdomains: true,
            ttl: None,
            max_ttl: None,
        }
    }
}
