use serde::{Deserialize, Serialize};

use super::comma_list;

/// Leaf certificate descriptor submitted to `issue/{role}`.
///
/// The same shape is read from payload files, so it derives both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Subject common name (device or service identity)
    pub common_name: String,

    /// DNS subject alternative names
    #[serde(default, with = "comma_list", skip_serializing_if = "Vec::is_empty")]
    pub alt_names: Vec<String>,

    /// IP subject alternative names
    #[serde(default, with = "comma_list", skip_serializing_if = "Vec::is_empty")]
    pub ip_sans: Vec<String>,

    /// Requested lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

impl IssueRequest {
    /// Descriptor with only a common name
    #[must_use]
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            alt_names: Vec::new(),
            ip_sans: Vec::new(),
            ttl: None,
        }
    }
}

/// Leaf certificate and key returned by `issue/{role}`
#[derive(Clone, Serialize, Deserialize)]
pub struct IssuedCertificate {
    /// PEM-encoded leaf certificate
    pub certificate: String,

    /// PEM-encoded private key
    pub private_key: String,

    /// Private key algorithm
    #[serde(default)]
    pub private_key_type: Option<String>,

    /// Certificate of the issuing authority
    #[serde(default)]
    pub issuing_ca: Option<String>,

    /// Chain above the leaf
    #[serde(default)]
    pub ca_chain: Option<Vec<String>>,

    /// Serial number
    #[serde(default)]
    pub serial_number: Option<String>,

    /// Not-after as unix seconds
    #[serde(default)]
    pub expiration: Option<i64>,
}

impl std::fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("serial_number", &self.serial_number)
            .field("expiration", &self.expiration)
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}
