//! Progress reporting for provisioning runs.
//!
//! Components never print. They report to whatever [`Reporter`] the caller
//! hands them, so a library user can log, render or record progress.

use std::path::Path;

use tracing::{error, info, warn};

use crate::error::{ProvisionError, Result, Stage};

/// Observer for provisioning progress
pub trait Reporter: Send + Sync {
    /// A stage began work on `subject` (a common name or role name)
    fn stage_started(&self, stage: Stage, subject: &str);

    /// A stage finished successfully
    fn stage_completed(&self, stage: Stage, subject: &str);

    /// The engine returned a non-fatal advisory
    fn warning(&self, stage: Stage, message: &str);

    /// A certificate or key was written
    fn artifact_written(&self, stage: Stage, path: &Path);

    /// A stage failed and the run is aborting
    fn stage_failed(&self, error: &ProvisionError);
}

/// Reporter that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn stage_started(&self, stage: Stage, subject: &str) {
        info!(%stage, subject, "stage started");
    }

    fn stage_completed(&self, stage: Stage, subject: &str) {
        info!(%stage, subject, "stage completed");
    }

    fn warning(&self, stage: Stage, message: &str) {
        warn!(%stage, message, "engine warning");
    }

    fn artifact_written(&self, stage: Stage, path: &Path) {
        info!(%stage, path = %path.display(), "artifact written");
    }

    fn stage_failed(&self, error: &ProvisionError) {
        error!(stage = %error.stage(), %error, "stage failed");
    }
}

/// Close out a stage: report completion or failure and pass the result through
pub(crate) fn finish<T>(
    reporter: &dyn Reporter,
    stage: Stage,
    subject: &str,
    result: Result<T>,
) -> Result<T> {
    match &result {
        Ok(_) => reporter.stage_completed(stage, subject),
        Err(e) => reporter.stage_failed(e),
    }
    result
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Records every event as a short string
    #[derive(Default)]
    pub struct RecordingReporter {
        events: Mutex<Vec<String>>,
    }

    impl RecordingReporter {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Reporter for RecordingReporter {
        fn stage_started(&self, stage: Stage, subject: &str) {
            self.push(format!("start {stage:?} {subject}"));
        }

        fn stage_completed(&self, stage: Stage, subject: &str) {
            self.push(format!("done {stage:?} {subject}"));
        }

        fn warning(&self, stage: Stage, message: &str) {
            self.push(format!("warn {stage:?} {message}"));
        }

        fn artifact_written(&self, stage: Stage, path: &Path) {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            self.push(format!("file {stage:?} {}", name.unwrap_or_default()));
        }

        fn stage_failed(&self, error: &ProvisionError) {
            self.push(format!("fail {:?}", error.stage()));
        }
    }
}
