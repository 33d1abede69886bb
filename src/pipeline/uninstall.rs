use std::path::PathBuf;

use log::{debug, info};

use super::backup::{BackupOutcome, backup_existing};
use super::{Context, StepOutcome, UninstallResult};
use crate::exec::CommandSpec;
use crate::platform::Platform;

/// A group of paths removed together after the primary removal, such as
/// "settings" or "extensions". Tools only return payloads the options enable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub label: String,
    pub paths: Vec<PathBuf>,
    pub elevated: bool,
}

impl Payload {
    pub fn new(label: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            label: label.into(),
            paths,
            elevated: false,
        }
    }

    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }
}

/// Hooks a tool provides to the removal pipeline.
pub trait Uninstaller {
    fn name(&self) -> &str;

    fn binary(&self) -> &str;

    fn platform(&self) -> Platform;

    fn is_installed(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists(self.binary())
    }

    fn backup_targets(&self, _ctx: &Context<'_>) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Work before removal (stop containers, quit the app); returns warnings.
    fn prepare(&mut self, _ctx: &Context<'_>) -> Vec<String> {
        Vec::new()
    }

    /// Remove the tool itself. `Err` aborts the pipeline; `Ok` carries
    /// warnings from sub-steps that failed without stopping the removal.
    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome;

    fn secondary_payloads(&self, _ctx: &Context<'_>) -> Vec<Payload> {
        Vec::new()
    }

    /// Work after payload removal (drop repositories, refresh caches).
    fn cleanup(&mut self, _ctx: &Context<'_>) -> Vec<String> {
        Vec::new()
    }

    fn still_present(&mut self, ctx: &Context<'_>) -> bool {
        self.is_installed(ctx)
    }

    fn notes(&self, _ctx: &Context<'_>) -> Vec<String> {
        Vec::new()
    }
}

/// Run the removal pipeline for one tool.
///
/// Only the primary removal is fatal. A tool still detected afterwards is
/// reported as a warning, not a failure.
pub fn run_uninstall(uninstaller: &mut dyn Uninstaller, ctx: &Context<'_>) -> UninstallResult {
    let mut result = uninstall_steps(uninstaller, ctx);
    result.planned = ctx.exec.take_planned();
    result
}

fn uninstall_steps(uninstaller: &mut dyn Uninstaller, ctx: &Context<'_>) -> UninstallResult {
    let name = uninstaller.name().to_string();
    let mut result = UninstallResult::new(&name);

    if !uninstaller.is_installed(ctx) {
        result.success = true;
        result.message = format!("{name} is not installed");
        result.warn(format!("Nothing to uninstall: {name} was not found"));
        return result;
    }

    for target in uninstaller.backup_targets(ctx) {
        match backup_existing(ctx, &target) {
            BackupOutcome::Absent => debug!("Nothing to back up at {}", target.display()),
            BackupOutcome::Created(path) => result.notes.push(format!("Backup saved to {}", path.display())),
            BackupOutcome::Failed(message) => result.warn(message),
        }
    }
    if ctx.exec.interrupted() {
        return result.interrupt("backing up files");
    }

    for warning in uninstaller.prepare(ctx) {
        result.warn(warning);
    }
    if ctx.exec.interrupted() {
        return result.interrupt(&format!("preparing to remove {name}"));
    }

    info!("Removing {name}");
    match uninstaller.remove_primary(ctx) {
        Ok(warnings) => {
            for warning in warnings {
                result.warn(warning);
            }
        }
        Err(_) if ctx.exec.interrupted() => {
            return result.interrupt(&format!("removing {name}"));
        }
        Err(error) => return result.abort(format!("{name} uninstallation failed"), error),
    }
    result.removed.push(name.clone());
    if ctx.exec.interrupted() {
        return result.interrupt(&format!("removing {name}"));
    }

    for payload in uninstaller.secondary_payloads(ctx) {
        remove_payload(ctx, &payload, &mut result);
        if ctx.exec.interrupted() {
            return result.interrupt(&format!("removing {}", payload.label));
        }
    }

    for warning in uninstaller.cleanup(ctx) {
        result.warn(warning);
    }
    if ctx.exec.interrupted() {
        return result.interrupt("cleaning up");
    }

    if ctx.exec.is_dry_run() {
        result.success = true;
        result.message = format!("{name} removal simulated (dry run)");
        return result;
    }

    if uninstaller.still_present(ctx) {
        result.warn(format!(
            "{name} is still detected after removal; a manual cleanup may be needed"
        ));
    }
    result.success = true;
    result.message = format!("{name} uninstalled");
    result.notes.extend(uninstaller.notes(ctx));
    result
}

fn remove_payload(ctx: &Context<'_>, payload: &Payload, result: &mut UninstallResult) {
    let present: Vec<&PathBuf> = payload
        .paths
        .iter()
        .filter(|path| path.symlink_metadata().is_ok())
        .collect();
    if present.is_empty() {
        debug!("No {} to remove", payload.label);
        return;
    }

    let mut complete = true;
    for path in present {
        let removal = ctx.exec.run(
            &CommandSpec::new("rm")
                .arg("-rf")
                .path_arg(path)
                .elevated_if(payload.elevated)
                .describe(format!("Removing {}", path.display())),
        );
        if !removal.is_success() {
            complete = false;
            result.warn(format!(
                "Could not remove {} ({}): {}",
                payload.label,
                path.display(),
                removal.summary()
            ));
        }
    }
    if complete {
        result.removed.push(payload.label.clone());
    }
}
