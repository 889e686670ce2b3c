//! Device identifiers derived from hardware attributes.
//!
//! A device identifier is the SHA-256 of the lowercased MAC address,
//! manufacturer and device name concatenated in that order, truncated to
//! 20 hex digits and grouped as `XXXXXXXX-XXXX-XXXX-XXXX`. It is stable for a
//! given device and is what payload files typically use as the leaf
//! certificate's common name.

use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};

/// Hex digits kept from the digest.
const ID_HEX_LEN: usize = 20;

/// Attributes describing a physical device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Hardware MAC address
    #[serde(rename = "MAC_address")]
    pub mac_address: String,

    /// Manufacturer name
    #[serde(rename = "Manufacturer_name")]
    pub manufacturer_name: String,

    /// Model or device name
    #[serde(rename = "Device_name")]
    pub device_name: String,
}

impl DeviceDescriptor {
    /// Parse a descriptor from its JSON form
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Full lowercase hex SHA-256 of the normalized attributes
    #[must_use]
    pub fn digest_hex(&self) -> String {
        let material = format!(
            "{}{}{}",
            self.mac_address.to_lowercase(),
            self.manufacturer_name.to_lowercase(),
            self.device_name.to_lowercase()
        );
        hex::encode(digest(&SHA256, material.as_bytes()).as_ref())
    }

    /// Grouped, upper-case device identifier
    #[must_use]
    pub fn device_id(&self) -> String {
        let hex = self.digest_hex().to_uppercase();
        let id = &hex[..ID_HEX_LEN];
        format!("{}-{}-{}-{}", &id[..8], &id[8..12], &id[12..16], &id[16..])
    }
}
