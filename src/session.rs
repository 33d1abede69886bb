//! Multi-tool runs.
//!
//! Tools are processed one at a time in the order given. A run stops at the
//! first interrupted pipeline; a failed tool does not stop the ones after it.

use log::{info, warn};
use serde::Serialize;

use crate::config::BootstrapConfig;
use crate::error::BootstrapError;
use crate::pipeline::{Context, InstallResult, UninstallResult, run_install, run_uninstall};
use crate::platform::{Platform, select_installer, select_uninstaller};
use crate::system::SystemInfo;
use crate::tools::{InstallRequest, ToolKind, UninstallRequest};

/// Overall outcome of a run, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Success,
    Failed,
    Interrupted,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failed => 1,
            RunStatus::Interrupted => 130,
        }
    }
}

/// Per-tool results of one run plus the overall status.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport<R> {
    pub status: RunStatus,
    pub results: Vec<R>,
}

/// Refuse hosts no tool module supports before any pipeline starts.
pub fn admit(system: &SystemInfo) -> Result<Platform, BootstrapError> {
    Platform::for_system(system).ok_or_else(|| {
        BootstrapError::UnsupportedPlatform(format!("{} ({})", system.os_name, system.os_family))
    })
}

pub fn install_all(ctx: &Context<'_>, requests: Vec<InstallRequest>) -> SessionReport<InstallResult> {
    let total = requests.len();
    let mut results = Vec::with_capacity(total);
    let mut status = RunStatus::Success;

    for (index, request) in requests.into_iter().enumerate() {
        let kind = request.kind();
        info!("==> [{}/{total}] Installing {kind}", index + 1);
        let result = match select_installer(request, ctx.system) {
            Some(mut installer) => run_install(installer.as_mut(), ctx),
            None => unsupported_install(kind, ctx.system),
        };

        let interrupted = result.interrupted || ctx.exec.interrupted();
        if !result.success {
            status = RunStatus::Failed;
        }
        results.push(result);
        if interrupted {
            warn!("Interrupted; skipping the remaining tools");
            status = RunStatus::Interrupted;
            break;
        }
    }

    SessionReport { status, results }
}

pub fn uninstall_all(
    ctx: &Context<'_>,
    requests: Vec<UninstallRequest>,
) -> SessionReport<UninstallResult> {
    let total = requests.len();
    let mut results = Vec::with_capacity(total);
    let mut status = RunStatus::Success;

    for (index, request) in requests.into_iter().enumerate() {
        let kind = request.kind();
        info!("==> [{}/{total}] Removing {kind}", index + 1);
        let result = match select_uninstaller(request, ctx.system) {
            Some(mut uninstaller) => run_uninstall(uninstaller.as_mut(), ctx),
            None => unsupported_uninstall(kind, ctx.system),
        };

        let interrupted = result.interrupted || ctx.exec.interrupted();
        if !result.success {
            status = RunStatus::Failed;
        }
        results.push(result);
        if interrupted {
            warn!("Interrupted; skipping the remaining tools");
            status = RunStatus::Interrupted;
            break;
        }
    }

    SessionReport { status, results }
}

/// Whether `kind` is present on this host; `None` on unsupported hosts.
pub fn is_installed(ctx: &Context<'_>, kind: ToolKind, config: &BootstrapConfig) -> Option<bool> {
    let mut uninstaller = select_uninstaller(UninstallRequest::from_config(kind, config), ctx.system)?;
    Some(uninstaller.is_installed(ctx))
}

fn unsupported_install(kind: ToolKind, system: &SystemInfo) -> InstallResult {
    InstallResult::new(kind.label()).abort(
        format!("{kind} is not supported on {}", system.os_family),
        format!("No {kind} implementation for {}", system.os_name),
    )
}

fn unsupported_uninstall(kind: ToolKind, system: &SystemInfo) -> UninstallResult {
    UninstallResult::new(kind.label()).abort(
        format!("{kind} is not supported on {}", system.os_family),
        format!("No {kind} implementation for {}", system.os_name),
    )
}
