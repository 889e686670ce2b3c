//! Configuration management.
//!
//! The file is TOML with four sections. Secrets and common names have no
//! defaults; a command fails up front listing every required key it lacks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use iotca::provision::{AuthoritySpec, IssuerUrls, ProvisionPlan, RoleSpec};
use iotca::PkiClient;
use serde::{Deserialize, Serialize};

const DEFAULT_ROOT_MOUNT: &str = "pki";
const DEFAULT_INTERMEDIATE_MOUNT: &str = "pki_int";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Template written by `iotca config init`.
pub const TEMPLATE: &str = r#"# iotca configuration

[engine]
# PKI secrets engine address
address = "http://127.0.0.1:8200"
# Bearer token; prefer --token or IOTCA_TOKEN over storing it here
# token = ""
# root_mount = "pki"
# intermediate_mount = "pki_int"
# timeout_secs = 30

[authority]
root_common_name = ""
intermediate_common_name = ""
# root_ttl = "87600h"
# intermediate_ttl = "43800h"
issuing_certificates_url = "http://127.0.0.1:8200/v1/pki/ca"
crl_distribution_url = "http://127.0.0.1:8200/v1/pki/crl"
# crl_expiry = "72h"

[role]
name = ""
allowed_domains = []
# ttl = "8760h"
# allow_localhost = false
# allow_subdomains = true

[issuance]
# endpoint = "http://127.0.0.1:8200/v1/pki_int/issue"
# output_dir = "."
"#;

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub authority: AuthoritySection,
    #[serde(default)]
    pub role: RoleSection,
    #[serde(default)]
    pub issuance: IssuanceSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_mount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate_mount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthoritySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate_common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuing_certificates_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crl_distribution_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crl_expiry: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_localhost: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_subdomains: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssuanceSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

/// Resolved engine connection settings.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub address: String,
    pub token: String,
    pub root_mount: String,
    pub intermediate_mount: String,
    pub timeout: Duration,
}

impl EngineSettings {
    /// Build an engine client.
    pub fn client(&self) -> Result<PkiClient> {
        Ok(PkiClient::builder(&self.address, &self.token)
            .timeout(self.timeout)
            .build()?)
    }
}

/// Everything `iotca provision` needs.
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub engine: EngineSettings,
    pub plan: ProvisionPlan,
    pub output_dir: PathBuf,
}

/// Everything `iotca role` needs.
#[derive(Debug, Clone)]
pub struct RoleSettings {
    pub engine: EngineSettings,
    pub authority_common_name: String,
    pub role: RoleSpec,
}

/// Everything `iotca issue` needs.
#[derive(Debug, Clone)]
pub struct IssueSettings {
    pub engine: EngineSettings,
    pub role_name: String,
    pub endpoint: String,
    pub output_dir: PathBuf,
}

/// Collects the names of required keys that are absent or blank.
#[derive(Default)]
struct Missing(Vec<&'static str>);

impl Missing {
    fn take(&mut self, key: &'static str, value: Option<&String>) -> Option<String> {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => Some(v.clone()),
            None => {
                self.0.push(key);
                None
            }
        }
    }

    fn take_list(&mut self, key: &'static str, value: Option<&Vec<String>>) -> Option<Vec<String>> {
        if value.is_none() {
            self.0.push(key);
        }
        value.cloned()
    }

    fn into_error(self) -> anyhow::Error {
        anyhow::anyhow!(
            "missing required config key(s): {}\n\n\
             Edit the file shown by `iotca config path`, or create one with `iotca config init`.",
            self.0.join(", ")
        )
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("org", "iotca", "iotca")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// The explicit path, or the default one.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        explicit.map_or_else(Self::default_path, |p| Ok(p.to_path_buf()))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file yields an empty
    /// configuration so that commands report exactly which keys are needed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;

        if explicit.is_none() && !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Copy with the token masked, for display.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut shown = self.clone();
        shown.engine.token = shown.engine.token.as_deref().map(crate::output::mask);
        shown
    }

    /// Settings for a full provisioning run.
    pub fn provision(
        &self,
        token: Option<&str>,
        payload: Option<PathBuf>,
    ) -> Result<ProvisionSettings> {
        let mut missing = Missing::default();
        let engine = self.engine_settings(token, &mut missing);
        let a = &self.authority;
        let root_cn = missing.take("authority.root_common_name", a.root_common_name.as_ref());
        let intermediate_cn = missing.take(
            "authority.intermediate_common_name",
            a.intermediate_common_name.as_ref(),
        );
        let issuing = missing.take(
            "authority.issuing_certificates_url",
            a.issuing_certificates_url.as_ref(),
        );
        let crl = missing.take("authority.crl_distribution_url", a.crl_distribution_url.as_ref());
        let role = self.role_spec(&mut missing);

        let (Some(engine), Some(root_cn), Some(intermediate_cn), Some(issuing), Some(crl), Some(role)) =
            (engine, root_cn, intermediate_cn, issuing, crl, role)
        else {
            return Err(missing.into_error());
        };

        let plan = ProvisionPlan {
            root_mount: engine.root_mount.clone(),
            intermediate_mount: engine.intermediate_mount.clone(),
            root: AuthoritySpec {
                common_name: root_cn,
                ttl: a.root_ttl.clone(),
            },
            intermediate: AuthoritySpec {
                common_name: intermediate_cn,
                ttl: a.intermediate_ttl.clone(),
            },
            urls: IssuerUrls {
                issuing_certificates: issuing,
                crl_distribution: crl,
                crl_expiry: a.crl_expiry.clone(),
            },
            role,
            issuance_endpoint: self.issuance_endpoint(&engine),
            payload,
        };

        Ok(ProvisionSettings {
            output_dir: self.output_dir(),
            engine,
            plan,
        })
    }

    /// Settings for defining the role on an existing intermediate.
    pub fn role(&self, token: Option<&str>) -> Result<RoleSettings> {
        let mut missing = Missing::default();
        let engine = self.engine_settings(token, &mut missing);
        let role = self.role_spec(&mut missing);

        let (Some(engine), Some(role)) = (engine, role) else {
            return Err(missing.into_error());
        };

        let authority_common_name = self
            .authority
            .intermediate_common_name
            .clone()
            .unwrap_or_else(|| engine.intermediate_mount.clone());
        Ok(RoleSettings {
            engine,
            authority_common_name,
            role,
        })
    }

    /// Settings for issuing one leaf under the configured role.
    pub fn issue(&self, token: Option<&str>) -> Result<IssueSettings> {
        let mut missing = Missing::default();
        let engine = self.engine_settings(token, &mut missing);
        let role_name = missing.take("role.name", self.role.name.as_ref());

        let (Some(engine), Some(role_name)) = (engine, role_name) else {
            return Err(missing.into_error());
        };

        Ok(IssueSettings {
            endpoint: self.issuance_endpoint(&engine),
            output_dir: self.output_dir(),
            engine,
            role_name,
        })
    }

    fn engine_settings(&self, token: Option<&str>, missing: &mut Missing) -> Option<EngineSettings> {
        let e = &self.engine;
        let address = missing.take("engine.address", e.address.as_ref());
        let token = token
            .map(str::to_string)
            .or_else(|| e.token.clone());
        let token = missing.take("engine.token (or --token / IOTCA_TOKEN)", token.as_ref());

        Some(EngineSettings {
            address: address?,
            token: token?,
            root_mount: e
                .root_mount
                .clone()
                .unwrap_or_else(|| DEFAULT_ROOT_MOUNT.to_string()),
            intermediate_mount: e
                .intermediate_mount
                .clone()
                .unwrap_or_else(|| DEFAULT_INTERMEDIATE_MOUNT.to_string()),
            timeout: Duration::from_secs(e.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }

    fn role_spec(&self, missing: &mut Missing) -> Option<RoleSpec> {
        let r = &self.role;
        let name = missing.take("role.name", r.name.as_ref());
        let domains = missing.take_list("role.allowed_domains", r.allowed_domains.as_ref());

        let mut spec = RoleSpec::new(name?, domains?);
        spec.ttl.clone_from(&r.ttl);
        spec.allow_localhost = r.allow_localhost.unwrap_or(false);
        spec.allow_subdomains = r.allow_subdomains.unwrap_or(true);
        Some(spec)
    }

    fn issuance_endpoint(&self, engine: &EngineSettings) -> String {
        self.issuance.endpoint.clone().unwrap_or_else(|| {
            format!(
                "{}/v1/{}/issue",
                engine.address.trim_end_matches('/'),
                engine.intermediate_mount
            )
        })
    }

    fn output_dir(&self) -> PathBuf {
        let dir = self.issuance.output_dir.as_deref().unwrap_or(".");
        PathBuf::from(shellexpand::tilde(dir).into_owned())
    }
}
