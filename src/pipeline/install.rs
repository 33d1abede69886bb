use std::path::PathBuf;

use log::{debug, info};

use super::backup::{BackupOutcome, backup_existing};
use super::{Context, Dependency, InstallResult, Installed, StepOutcome};
use crate::platform::Platform;

/// Outcome of the post-install activation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The tool has nothing to start.
    NotApplicable,
    Started,
    Failed(String),
}

/// Hooks a tool provides to the installation pipeline.
///
/// Only [`install_primary`](Installer::install_primary) is mandatory; every
/// other step has a neutral default.
pub trait Installer {
    /// Human readable tool name.
    fn name(&self) -> &str;

    /// Executable that proves the tool is present.
    fn binary(&self) -> &str;

    fn platform(&self) -> Platform;

    fn version_flag(&self) -> &str {
        "--version"
    }

    fn check_existing(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists(self.binary())
    }

    /// Make the package manager available. Failure aborts the pipeline.
    fn ensure_package_manager(&mut self, _ctx: &Context<'_>) -> bool {
        true
    }

    fn refresh_package_manager(&mut self, _ctx: &Context<'_>) -> bool {
        true
    }

    fn dependencies(&self) -> &'static [Dependency] {
        &[]
    }

    fn install_dependency(&mut self, _ctx: &Context<'_>, _dependency: &Dependency) -> bool {
        false
    }

    /// Existing paths to copy aside before the primary install.
    fn backup_targets(&self, _ctx: &Context<'_>) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Install the tool itself. `Err` aborts the pipeline; `Ok` carries
    /// warnings from sub-steps that failed without stopping the install.
    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome;

    /// Post-install configuration; each returned string is one warning.
    fn configure(&mut self, _ctx: &Context<'_>) -> Vec<String> {
        Vec::new()
    }

    fn activate(&mut self, _ctx: &Context<'_>) -> Activation {
        Activation::NotApplicable
    }

    /// Re-probe the installation. `None` means the tool was not found.
    fn verify(&mut self, ctx: &Context<'_>) -> Option<Installed> {
        let path = ctx.exec.resolve_path(self.binary())?;
        Some(Installed {
            path: Some(path),
            version: ctx.exec.get_version(self.binary(), self.version_flag()),
        })
    }

    /// Follow-up instructions shown after a successful run.
    fn notes(&self, _ctx: &Context<'_>) -> Vec<String> {
        Vec::new()
    }
}

/// Run the installation pipeline for one tool.
///
/// Package manager bootstrap, primary install and verification are fatal;
/// every other step degrades to a warning.
pub fn run_install(installer: &mut dyn Installer, ctx: &Context<'_>) -> InstallResult {
    let mut result = install_steps(installer, ctx);
    result.planned = ctx.exec.take_planned();
    result
}

fn install_steps(installer: &mut dyn Installer, ctx: &Context<'_>) -> InstallResult {
    let name = installer.name().to_string();
    let mut result = InstallResult::new(&name);

    info!("Checking for an existing {name} installation");
    if installer.check_existing(ctx) {
        let question = format!("{name} is already installed. Reinstall or update it?");
        if !ctx.confirm(&question, false) {
            if let Some(found) = installer.verify(ctx) {
                result.record(found);
            }
            result.success = true;
            result.already_installed = true;
            result.message = format!("{name} is already installed");
            return result;
        }
    }
    if ctx.exec.interrupted() {
        return result.interrupt("checking for an existing installation");
    }

    info!("Preparing the package manager");
    if !installer.ensure_package_manager(ctx) {
        return result.abort(
            format!("{name} installation failed: package manager unavailable"),
            "The package manager could not be installed or located",
        );
    }
    if ctx.exec.interrupted() {
        return result.interrupt("preparing the package manager");
    }

    info!("Refreshing package information");
    if !installer.refresh_package_manager(ctx) {
        result.warn("Package index refresh failed; continuing with cached package information");
    }
    if ctx.exec.interrupted() {
        return result.interrupt("refreshing package information");
    }

    for dependency in installer.dependencies() {
        if ctx.exec.check_exists(dependency.check_command) {
            debug!("Dependency {} already present", dependency.name);
            continue;
        }
        info!("Installing {} ({})", dependency.name, dependency.description);
        if !installer.install_dependency(ctx, dependency) {
            let kind = if dependency.required { "required" } else { "optional" };
            result.warn(format!(
                "Failed to install {kind} dependency {}",
                dependency.name
            ));
        }
        if ctx.exec.interrupted() {
            return result.interrupt("installing dependencies");
        }
    }

    for target in installer.backup_targets(ctx) {
        match backup_existing(ctx, &target) {
            BackupOutcome::Absent => debug!("Nothing to back up at {}", target.display()),
            BackupOutcome::Created(_) => {}
            BackupOutcome::Failed(message) => result.warn(message),
        }
    }
    if ctx.exec.interrupted() {
        return result.interrupt("backing up existing files");
    }

    info!("Installing {name}");
    match installer.install_primary(ctx) {
        Ok(warnings) => {
            for warning in warnings {
                result.warn(warning);
            }
        }
        Err(_) if ctx.exec.interrupted() => {
            return result.interrupt(&format!("installing {name}"));
        }
        Err(error) => return result.abort(format!("{name} installation failed"), error),
    }
    if ctx.exec.interrupted() {
        return result.interrupt(&format!("installing {name}"));
    }

    info!("Configuring {name}");
    for warning in installer.configure(ctx) {
        result.warn(warning);
    }
    if ctx.exec.interrupted() {
        return result.interrupt(&format!("configuring {name}"));
    }

    info!("Starting {name}");
    if let Activation::Failed(message) = installer.activate(ctx) {
        result.warn(message);
    }
    if ctx.exec.interrupted() {
        return result.interrupt(&format!("starting {name}"));
    }

    if ctx.exec.is_dry_run() {
        result.success = true;
        result.message = format!("{name} installation simulated (dry run)");
        return result;
    }

    info!("Verifying {name}");
    match installer.verify(ctx) {
        Some(found) => {
            result.success = true;
            result.message = match &found.version {
                Some(version) => format!("{name} installed successfully ({version})"),
                None => format!("{name} installed successfully"),
            };
            result.record(found);
            result.notes.extend(installer.notes(ctx));
            result
        }
        None => result.abort(
            format!("{name} installation could not be verified"),
            format!("{name} was not found after installation"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::exec::scripted::ScriptedExecutor;
    use crate::exec::{CommandSpec, Executor};
    use crate::pipeline::AssumeDefaults;
    use crate::pipeline::testing::FixedAnswer;
    use crate::system::{OsFamily, SystemInfo, test_system};

    const DEPS: &[Dependency] = &[
        Dependency::required("git", "git", "version control"),
        Dependency::optional("ripgrep", "rg", "search"),
    ];

    /// Drives every hook through the executor so tests can observe order.
    struct Probe {
        configure_warnings: Vec<String>,
        activation: Activation,
        backups: Vec<PathBuf>,
    }

    impl Probe {
        fn new() -> Self {
            Self {
                configure_warnings: Vec::new(),
                activation: Activation::NotApplicable,
                backups: Vec::new(),
            }
        }
    }

    impl Installer for Probe {
        fn name(&self) -> &str {
            "Probe"
        }

        fn binary(&self) -> &str {
            "probe"
        }

        fn platform(&self) -> Platform {
            Platform::Debian
        }

        fn ensure_package_manager(&mut self, ctx: &Context<'_>) -> bool {
            ctx.exec.run(&CommandSpec::new("pm-bootstrap")).is_success()
        }

        fn refresh_package_manager(&mut self, ctx: &Context<'_>) -> bool {
            ctx.exec.run(&CommandSpec::new("pm-refresh")).is_success()
        }

        fn dependencies(&self) -> &'static [Dependency] {
            DEPS
        }

        fn install_dependency(&mut self, ctx: &Context<'_>, dependency: &Dependency) -> bool {
            ctx.exec
                .run(&CommandSpec::new("pm-install").arg(dependency.name))
                .is_success()
        }

        fn backup_targets(&self, _ctx: &Context<'_>) -> Vec<PathBuf> {
            self.backups.clone()
        }

        fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
            let install = ctx.exec.run(&CommandSpec::new("primary-install"));
            if !install.is_success() {
                return Err(format!("primary-install failed: {}", install.summary()));
            }
            let mut warnings = Vec::new();
            if !ctx.exec.run(&CommandSpec::new("primary-tidy")).is_success() {
                warnings.push("primary-tidy failed".to_string());
            }
            Ok(warnings)
        }

        fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
            ctx.exec.run(&CommandSpec::new("configure"));
            self.configure_warnings.clone()
        }

        fn activate(&mut self, ctx: &Context<'_>) -> Activation {
            ctx.exec.run(&CommandSpec::new("activate"));
            self.activation.clone()
        }
    }

    fn system() -> SystemInfo {
        test_system(OsFamily::Ubuntu, PathBuf::from("/home/dev"))
    }

    fn installing_executor() -> ScriptedExecutor {
        let exec = ScriptedExecutor::new();
        exec.installs_binary("primary-install", "probe");
        exec.respond("probe --version", crate::exec::CommandResult::completed(0, "probe 1.2.3\n", ""));
        exec
    }

    #[test]
    fn full_run_succeeds_with_version() {
        let exec = installing_executor();
        let system = system();
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut Probe::new(), &ctx);
        assert!(result.success, "{result:?}");
        assert_eq!(result.version.as_deref(), Some("probe 1.2.3"));
        assert_eq!(result.path, Some(PathBuf::from("/usr/bin/probe")));
        assert!(result.warnings.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(
            exec.calls(),
            vec![
                "pm-bootstrap",
                "pm-refresh",
                "pm-install git",
                "pm-install ripgrep",
                "primary-install",
                "primary-tidy",
                "configure",
                "activate",
                "probe --version",
            ]
        );
    }

    #[test]
    fn failed_primary_install_stops_before_configuration() {
        let exec = installing_executor();
        exec.fail("primary-install");
        let system = system();
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut Probe::new(), &ctx);
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("primary-install failed"), "{:?}", result.errors);
        assert!(!exec.ran("primary-tidy"));
        assert!(!exec.ran("configure"));
        assert!(!exec.ran("activate"));
        assert!(!exec.ran("probe --version"));
    }

    #[test]
    fn package_manager_failure_is_fatal() {
        let exec = installing_executor();
        exec.fail("pm-bootstrap");
        let system = system();
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut Probe::new(), &ctx);
        assert!(!result.success);
        assert_eq!(exec.calls(), vec!["pm-bootstrap"]);
    }

    #[test]
    fn non_fatal_failures_accumulate_one_warning_each() {
        let exec = installing_executor();
        exec.fail("pm-refresh");
        exec.fail("pm-install git");
        exec.fail("pm-install ripgrep");
        let system = system();
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let mut probe = Probe::new();
        probe.configure_warnings = vec!["a".into(), "b".into()];
        probe.activation = Activation::Failed("service did not start".into());

        let result = run_install(&mut probe, &ctx);
        assert!(result.success);
        assert_eq!(result.warnings.len(), 6, "{:?}", result.warnings);
        assert!(result.errors.is_empty());
        assert!(exec.ran("primary-install"));
    }

    #[test]
    fn primary_sub_step_failure_is_a_warning() {
        let exec = installing_executor();
        exec.fail("primary-tidy");
        let system = system();
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut Probe::new(), &ctx);
        assert!(result.success);
        assert_eq!(result.warnings, vec!["primary-tidy failed"]);
        assert!(exec.ran("configure"));
    }

    #[test]
    fn present_dependencies_are_skipped() {
        let exec = installing_executor().with_binary("git").with_binary("rg");
        let system = system();
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        run_install(&mut Probe::new(), &ctx);
        assert!(!exec.ran("pm-install"));
    }

    #[test]
    fn missing_binary_after_install_fails_verification() {
        let exec = ScriptedExecutor::new();
        let system = system();
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut Probe::new(), &ctx);
        assert!(!result.success);
        assert!(exec.ran("configure"));
        assert_eq!(result.errors, vec!["Probe was not found after installation"]);
    }

    #[test]
    fn existing_installation_short_circuits_when_declined() {
        let exec = installing_executor().with_binary("probe");
        let system = system();
        let prompter = FixedAnswer::new(false);
        let ctx = Context::new(&exec, &system, &prompter);

        let result = run_install(&mut Probe::new(), &ctx);
        assert!(result.success);
        assert!(result.already_installed);
        assert_eq!(prompter.asked.borrow().len(), 1);
        assert_eq!(exec.calls(), vec!["probe --version"]);
    }

    #[test]
    fn existing_installation_is_reinstalled_when_confirmed() {
        let exec = installing_executor().with_binary("probe");
        let system = system();
        let prompter = FixedAnswer::new(true);
        let ctx = Context::new(&exec, &system, &prompter);

        let result = run_install(&mut Probe::new(), &ctx);
        assert!(result.success);
        assert!(!result.already_installed);
        assert!(exec.ran("primary-install"));
    }

    #[test]
    fn dry_run_skips_verification_and_reports_plan() {
        let exec = ScriptedExecutor::dry_run();
        let system = system();
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut Probe::new(), &ctx);
        assert!(result.success, "{result:?}");
        assert!(result.path.is_none());
        assert_eq!(result.planned.len(), 8);
        assert!(exec.take_planned().is_empty());
    }

    #[test]
    fn interrupt_stops_at_next_checkpoint() {
        let exec = installing_executor();
        exec.interrupt_on("pm-refresh");
        let system = system();
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut Probe::new(), &ctx);
        assert!(!result.success);
        assert!(result.interrupted);
        assert!(!exec.ran("pm-install"));
        assert!(!exec.ran("primary-install"));
    }

    #[test]
    fn failed_backup_warns_and_continues() {
        let home = tempfile::tempdir().expect("tempdir");
        let config = home.path().join("config");
        std::fs::create_dir(&config).expect("mkdir");

        let exec = installing_executor();
        exec.fail("cp -Rp");
        let system = test_system(OsFamily::Ubuntu, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let mut probe = Probe::new();
        probe.backups = vec![config.clone(), Path::new("/nonexistent/thing").to_path_buf()];
        let result = run_install(&mut probe, &ctx);
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert!(config.is_dir());
    }
}
