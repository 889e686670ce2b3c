//! Command implementations.

pub mod config;
pub mod device_id;
pub mod issue;
pub mod provision;
pub mod role;
pub mod verify;

use crate::config::Config;
use crate::output::OutputFormat;
use iotca::ProvisionError;
use std::path::PathBuf;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// `--config` override
    pub config_path: Option<PathBuf>,

    /// Engine token from `--token` or `IOTCA_TOKEN`
    pub token: Option<String>,

    /// Output format
    pub output_format: OutputFormat,
}

impl Context {
    /// Load the configuration file selected by `--config` or the default path.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        Config::load(self.config_path.as_deref())
    }

    /// Progress reporter for engine-facing commands.
    ///
    /// Stage lines only appear in pretty mode so JSON and YAML stay clean.
    pub fn reporter(&self) -> super::reporter::ConsoleReporter {
        super::reporter::ConsoleReporter::new(self.output_format == OutputFormat::Pretty)
    }
}

/// Wrap a stage failure as `"<action>: <stage>"`, adding a hint when the
/// engine turned the request down.
pub(crate) fn stage_failure(action: &str, err: ProvisionError) -> anyhow::Error {
    let stage = err.stage();
    let hint = err.engine_error().and_then(|engine| {
        if engine.is_auth_error() {
            Some(" (token rejected; check --token, IOTCA_TOKEN or engine.token)".to_string())
        } else {
            engine
                .status_code()
                .map(|code| format!(" (engine answered HTTP {code})"))
        }
    });
    let message = format!("{action}: {stage}{}", hint.unwrap_or_default());
    anyhow::Error::new(err).context(message)
}
