//! Provisioning errors, each tied to the stage that raised it.

use std::fmt;
use std::path::PathBuf;

use iotca_core::PkiError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Stages of a provisioning run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Root rotation, issuer URLs and CRL configuration
    Root,
    /// Intermediate CSR, signing and import
    Intermediate,
    /// Role create-or-update
    Role,
    /// Leaf certificate request and persistence
    Issuance,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Self; 4] = [Self::Root, Self::Intermediate, Self::Role, Self::Issuance];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root authority",
            Self::Intermediate => "intermediate authority",
            Self::Role => "role definition",
            Self::Issuance => "leaf issuance",
        })
    }
}

/// Errors that abort a provisioning run
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Root rotation, generation or its URL/CRL configuration failed
    #[error("root provisioning failed: {0}")]
    RootProvisioningFailed(#[source] PkiError),

    /// The intermediate CSR, its signature or its import failed
    #[error("intermediate provisioning failed: {0}")]
    IntermediateProvisioningFailed(#[source] PkiError),

    /// The role could not be written, or its authority is not provisioned
    #[error("role '{role}' could not be defined: {reason}")]
    RoleDefinitionFailed {
        /// Role name
        role: String,
        /// What went wrong
        reason: String,
    },

    /// The engine refused or failed the issuance request
    #[error("issuance under role '{role}' failed: {source}")]
    IssuanceRequestFailed {
        /// Role name
        role: String,
        /// Engine or transport error
        #[source]
        source: PkiError,
    },

    /// The issuance descriptor could not be parsed or is unusable
    #[error("payload {} is malformed: {reason}", path.display())]
    PayloadMalformed {
        /// Descriptor file
        path: PathBuf,
        /// Parser diagnostic
        reason: String,
    },

    /// The issuance descriptor could not be read
    #[error("payload {} is unreadable: {source}", path.display())]
    PayloadUnreadable {
        /// Descriptor file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A certificate or key file could not be written
    #[error("cannot write {}: {source}", path.display())]
    Artifact {
        /// Stage that produced the artifact
        stage: Stage,
        /// Target file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    /// The stage this error aborted
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::RootProvisioningFailed(_) => Stage::Root,
            Self::IntermediateProvisioningFailed(_) => Stage::Intermediate,
            Self::RoleDefinitionFailed { .. } => Stage::Role,
            Self::IssuanceRequestFailed { .. }
            | Self::PayloadMalformed { .. }
            | Self::PayloadUnreadable { .. } => Stage::Issuance,
            Self::Artifact { stage, .. } => *stage,
        }
    }

    /// The underlying engine error, if any
    #[must_use]
    pub const fn engine_error(&self) -> Option<&PkiError> {
        match self {
            Self::RootProvisioningFailed(e) | Self::IntermediateProvisioningFailed(e) => Some(e),
            Self::IssuanceRequestFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_names_its_stage() {
        let root = ProvisionError::RootProvisioningFailed(PkiError::Timeout);
        assert_eq!(root.stage(), Stage::Root);
        assert!(root.engine_error().is_some());

        let artifact = ProvisionError::Artifact {
            stage: Stage::Intermediate,
            path: "intermediateCA.pem".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(artifact.stage(), Stage::Intermediate);

        let payload = ProvisionError::PayloadUnreadable {
            path: "device.json".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(payload.stage(), Stage::Issuance);
        assert!(payload.engine_error().is_none());
    }

    #[test]
    fn stages_are_ordered() {
        let mut shuffled = [Stage::Issuance, Stage::Root, Stage::Role, Stage::Intermediate];
        shuffled.sort();
        assert_eq!(shuffled, Stage::ALL);
        assert_eq!(Stage::Role.to_string(), "role definition");
    }
}
