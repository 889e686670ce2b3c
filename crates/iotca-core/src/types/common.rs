use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{PkiError, Result};

/// Envelope wrapped around every successful engine response.
///
/// The engine reports non-fatal advisories (for example a near-duplicate
/// common name) in `warnings`; they never turn a success into a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineResponse<T> {
    /// Operation payload
    pub data: Option<T>,

    /// Human-readable advisories, `null` when there are none
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

impl<T> EngineResponse<T> {
    /// Warnings attached to the response
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        self.warnings.as_deref().unwrap_or_default()
    }

    /// Split into payload and warnings, failing if the payload is absent
    pub fn into_parts(self) -> Result<(T, Vec<String>)> {
        let data = self.data.ok_or(PkiError::MissingField { field: "data" })?;
        Ok((data, self.warnings.unwrap_or_default()))
    }
}

/// Error body returned by the engine on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineErrors {
    /// Error messages
    #[serde(default)]
    pub errors: Vec<String>,
}

/// A value together with the engine warnings produced while obtaining it
#[derive(Debug, Clone)]
pub struct Warned<T> {
    /// The value
    pub value: T,
    /// Advisories reported by the engine
    pub warnings: Vec<String>,
}

/// Convert an engine `expiration` (unix seconds) into a timestamp
#[must_use]
pub fn expiration_time(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

/// Serde adapter for lists the engine expects as comma-separated strings.
///
/// Deserialization accepts either a JSON array or a comma-separated string
/// so descriptor files can use whichever is more natural.
pub mod comma_list {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrString {
        List(Vec<String>),
        Joined(String),
    }

    pub fn serialize<S: Serializer>(items: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&items.join(","))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match ListOrString::deserialize(deserializer)? {
            ListOrString::List(items) => items,
            ListOrString::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}
