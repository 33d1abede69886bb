use std::path::PathBuf;

use log::{error, warn};
use serde::Serialize;

/// What verification found on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Installed {
    pub path: Option<PathBuf>,
    pub version: Option<String>,
}

/// Aggregate outcome of one installer pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallResult {
    pub tool: String,
    pub success: bool,
    pub message: String,
    pub path: Option<PathBuf>,
    pub version: Option<String>,
    pub already_installed: bool,
    pub interrupted: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Follow-ups for the operator, such as logging out and back in.
    pub notes: Vec<String>,
    /// Actions that would have run, populated in dry-run mode.
    pub planned: Vec<String>,
}

impl InstallResult {
    pub(crate) fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}: {message}", self.tool);
        self.warnings.push(message);
    }

    pub(crate) fn abort(mut self, message: impl Into<String>, cause: impl Into<String>) -> Self {
        let cause = cause.into();
        error!("{}: {cause}", self.tool);
        self.success = false;
        self.message = message.into();
        self.errors.push(cause);
        self
    }

    pub(crate) fn interrupt(mut self, during: &str) -> Self {
        self.interrupted = true;
        self.abort(
            format!("Installation interrupted while {during}"),
            "Interrupted by operator",
        )
    }

    pub(crate) fn record(&mut self, found: Installed) {
        self.path = found.path;
        self.version = found.version;
    }
}

/// Aggregate outcome of one uninstaller pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UninstallResult {
    pub tool: String,
    pub success: bool,
    pub message: String,
    /// Labels of what was actually removed.
    pub removed: Vec<String>,
    pub interrupted: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub notes: Vec<String>,
    pub planned: Vec<String>,
}

impl UninstallResult {
    pub(crate) fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}: {message}", self.tool);
        self.warnings.push(message);
    }

    pub(crate) fn abort(mut self, message: impl Into<String>, cause: impl Into<String>) -> Self {
        let cause = cause.into();
        error!("{}: {cause}", self.tool);
        self.success = false;
        self.message = message.into();
        self.errors.push(cause);
        self
    }

    pub(crate) fn interrupt(mut self, during: &str) -> Self {
        self.interrupted = true;
        self.abort(
            format!("Uninstallation interrupted while {during}"),
            "Interrupted by operator",
        )
    }
}
