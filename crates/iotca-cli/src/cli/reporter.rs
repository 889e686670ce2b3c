//! Colored progress lines on stderr.

use std::path::Path;

use colored::Colorize;
use iotca::provision::ProvisionError;
use iotca::{Reporter, Stage};

/// Prints provisioning progress for a terminal user.
///
/// Events are also forwarded to `tracing` so `--log-file` keeps a record.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    show: bool,
}

impl ConsoleReporter {
    #[must_use]
    pub const fn new(show: bool) -> Self {
        Self { show }
    }
}

impl Reporter for ConsoleReporter {
    fn stage_started(&self, stage: Stage, subject: &str) {
        tracing::debug!(%stage, subject, "stage started");
        if self.show {
            eprintln!("{} {} {}", "→".cyan(), stage.to_string().bold(), subject.dimmed());
        }
    }

    fn stage_completed(&self, stage: Stage, subject: &str) {
        tracing::info!(%stage, subject, "stage completed");
        if self.show {
            eprintln!("{} {} {}", "✓".green(), stage.to_string().bold(), subject);
        }
    }

    fn warning(&self, stage: Stage, message: &str) {
        tracing::warn!(%stage, message, "engine warning");
        if self.show {
            eprintln!("  {} {}", "Warning:".yellow().bold(), message);
        }
    }

    fn artifact_written(&self, stage: Stage, path: &Path) {
        tracing::info!(%stage, path = %path.display(), "artifact written");
        if self.show {
            eprintln!("  {} {}", "wrote".dimmed(), path.display());
        }
    }

    fn stage_failed(&self, error: &ProvisionError) {
        tracing::error!(stage = %error.stage(), %error, "stage failed");
        if self.show {
            eprintln!("{} {} {}", "✗".red(), error.stage().to_string().bold(), "failed".red());
        }
    }
}
