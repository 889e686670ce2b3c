use serde::{Deserialize, Serialize};

/// Request body for root generation and intermediate CSR generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateAuthorityRequest {
    /// Common name of the authority
    pub common_name: String,

    /// Requested lifetime (engine duration syntax, e.g. `87600h`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

impl GenerateAuthorityRequest {
    /// Create a request for the given common name
    #[must_use]
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ttl: None,
        }
    }

    /// Set the requested lifetime
    #[must_use]
    pub fn ttl(mut self, ttl: Option<String>) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Root certificate returned by `root/generate/exported`
#[derive(Clone, Serialize, Deserialize)]
pub struct RootCertificate {
    /// PEM-encoded self-signed certificate
    pub certificate: String,

    /// Issuing CA (identical to `certificate` for a root)
    #[serde(default)]
    pub issuing_ca: Option<String>,

    /// Serial number, colon-separated hex
    #[serde(default)]
    pub serial_number: Option<String>,

    /// Not-after as unix seconds
    #[serde(default)]
    pub expiration: Option<i64>,

    /// Exported private key (only for `exported` generation)
    #[serde(default)]
    pub private_key: Option<String>,

    /// Private key algorithm
    #[serde(default)]
    pub private_key_type: Option<String>,
}

impl std::fmt::Debug for RootCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootCertificate")
            .field("serial_number", &self.serial_number)
            .field("expiration", &self.expiration)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// CSR returned by `intermediate/generate/exported`
#[derive(Clone, Serialize, Deserialize)]
pub struct IntermediateCsr {
    /// PEM-encoded certificate signing request
    pub csr: String,

    /// Exported private key for the intermediate
    #[serde(default)]
    pub private_key: Option<String>,

    /// Private key algorithm
    #[serde(default)]
    pub private_key_type: Option<String>,
}

impl std::fmt::Debug for IntermediateCsr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntermediateCsr")
            .field("private_key_type", &self.private_key_type)
            .finish_non_exhaustive()
    }
}

/// Request body for `root/sign-intermediate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignIntermediateRequest {
    /// PEM CSR produced by the intermediate mount
    pub csr: String,

    /// Common name to place in the signed certificate
    pub common_name: String,

    /// Output format; `pem` returns only the signed certificate
    pub format: String,

    /// Requested lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

/// Certificate produced by `root/sign-intermediate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedCertificate {
    /// PEM-encoded certificate signed by the root
    pub certificate: String,

    /// Certificate of the signer
    #[serde(default)]
    pub issuing_ca: Option<String>,

    /// Full chain above the signed certificate
    #[serde(default)]
    pub ca_chain: Option<Vec<String>>,

    /// Serial number
    #[serde(default)]
    pub serial_number: Option<String>,

    /// Not-after as unix seconds
    #[serde(default)]
    pub expiration: Option<i64>,
}

/// Request body for `intermediate/set-signed`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSignedRequest {
    /// Signed intermediate certificate (PEM)
    pub certificate: String,
}

/// Request body for `config/urls`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlsConfig {
    /// Where relying parties can fetch the issuing certificate
    pub issuing_certificates: Vec<String>,

    /// CRL distribution points embedded in issued certificates
    pub crl_distribution_points: Vec<String>,
}

/// Request body for `config/crl`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrlConfig {
    /// CRL lifetime (e.g. `72h`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,

    /// Disable CRL building entirely
    #[serde(default)]
    pub disable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_omits_unset_fields() {
        let body = serde_json::to_value(GenerateAuthorityRequest::new("IoT CA")).unwrap();
        assert_eq!(body, serde_json::json!({ "common_name": "IoT CA" }));
    }

    #[test]
    fn root_debug_redacts_private_key() {
        let root = RootCertificate {
            certificate: "-----BEGIN CERTIFICATE-----".into(),
            issuing_ca: None,
            serial_number: Some("01:02".into()),
            expiration: None,
            private_key: Some("super secret".into()),
            private_key_type: Some("rsa".into()),
        };
        let shown = format!("{root:?}");
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains("super secret"));
    }
}
