//! Live executor backed by real child processes.
//!
//! The public surface is blocking. Internally each command is supervised on a
//! private current-thread tokio runtime so a deadline and the Ctrl-C flag can
//! be raced against the child without threads of our own.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use tokio::runtime::Runtime;

use super::{CommandFailure, CommandResult, CommandSpec, Executor, render_argv};
use crate::error::BootstrapError;
use crate::signal;
use crate::system::SystemInfo;

const INTERRUPT_POLL: Duration = Duration::from_millis(100);

pub struct ShellExecutor {
    dry_run: bool,
    privileged: bool,
    elevation_wrapper: String,
    default_timeout: Option<Duration>,
    show_progress: bool,
    runtime: Runtime,
    planned: RefCell<Vec<String>>,
    extra_paths: RefCell<Vec<PathBuf>>,
}

impl ShellExecutor {
    pub fn new(system: &SystemInfo, dry_run: bool) -> Result<Self, BootstrapError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(BootstrapError::Runtime)?;

        Ok(Self {
            dry_run,
            privileged: system.is_root,
            elevation_wrapper: "sudo".to_string(),
            default_timeout: None,
            show_progress: std::io::stderr().is_terminal(),
            runtime,
            planned: RefCell::new(Vec::new()),
            extra_paths: RefCell::new(Vec::new()),
        })
    }

    /// Program prepended to elevated commands when not running as root.
    pub fn with_elevation_wrapper(mut self, wrapper: impl Into<String>) -> Self {
        self.elevation_wrapper = wrapper.into();
        self
    }

    /// Deadline for commands that do not carry their own.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn search_path(&self) -> Option<OsString> {
        let extra = self.extra_paths.borrow();
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let entries = extra
            .iter()
            .cloned()
            .chain(std::env::split_paths(&inherited));
        std::env::join_paths(entries).ok()
    }

    fn elevate(&self, spec: &CommandSpec) -> Result<Vec<String>, CommandFailure> {
        let argv = spec.argv();
        if !spec.is_elevated() || self.privileged {
            return Ok(argv);
        }
        if !self.dry_run && self.resolve_path(&self.elevation_wrapper).is_none() {
            return Err(CommandFailure::ElevationUnavailable(
                self.elevation_wrapper.clone(),
            ));
        }
        Ok(std::iter::once(self.elevation_wrapper.clone())
            .chain(argv)
            .collect())
    }

    fn spinner(&self, spec: &CommandSpec) -> Option<ProgressBar> {
        let description = spec.description()?;
        if !self.show_progress || spec.is_interactive() {
            return None;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
            bar.set_style(style);
        }
        bar.set_message(description.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Some(bar)
    }

    async fn supervise(
        &self,
        argv: Vec<String>,
        spec: &CommandSpec,
        timeout: Option<Duration>,
    ) -> CommandResult {
        let Some((program, args)) = argv.split_first() else {
            return CommandResult::failed(CommandFailure::Launch("empty command".to_string()));
        };

        let executable = if program.contains('/') {
            PathBuf::from(program)
        } else {
            match self.resolve_path(program) {
                Some(path) => path,
                None => return CommandResult::failed(CommandFailure::NotFound(program.clone())),
            }
        };

        let mut command = tokio::process::Command::new(executable);
        command.args(args).kill_on_drop(true);
        if let Some(path) = self.search_path() {
            command.env("PATH", path);
        }
        for (key, value) in spec.env_overlay() {
            command.env(key, value);
        }
        if let Some(dir) = spec.working_dir() {
            command.current_dir(dir);
        }
        if spec.is_interactive() {
            command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return CommandResult::failed(CommandFailure::NotFound(program.clone()));
            }
            Err(e) => return CommandResult::failed(CommandFailure::Launch(e.to_string())),
        };

        let completion = async {
            let output = child.wait_with_output();
            match timeout {
                Some(limit) => tokio::time::timeout(limit, output)
                    .await
                    .map_err(|_| CommandFailure::TimedOut(limit)),
                None => Ok(output.await),
            }
        };

        tokio::select! {
            outcome = completion => match outcome {
                Ok(Ok(output)) => match output.status.code() {
                    Some(code) => CommandResult::completed(
                        code,
                        String::from_utf8_lossy(&output.stdout),
                        String::from_utf8_lossy(&output.stderr),
                    ),
                    None => CommandResult::failed(CommandFailure::Signalled),
                },
                Ok(Err(e)) => CommandResult::failed(CommandFailure::Launch(e.to_string())),
                Err(failure) => CommandResult::failed(failure),
            },
            () = wait_for_interrupt() => CommandResult::failed(CommandFailure::Interrupted),
        }
    }
}

async fn wait_for_interrupt() {
    while !signal::interrupted() {
        tokio::time::sleep(INTERRUPT_POLL).await;
    }
}

impl Executor for ShellExecutor {
    fn run(&self, spec: &CommandSpec) -> CommandResult {
        let argv = match self.elevate(spec) {
            Ok(argv) => argv,
            Err(failure) => {
                warn!("Cannot run `{spec}`: {failure}");
                return CommandResult::failed(failure);
            }
        };
        let line = render_argv(&argv);

        if self.dry_run {
            if spec.is_probe() {
                debug!("[DRY RUN] probe {line}");
            } else {
                info!("[DRY RUN] {line}");
                self.planned.borrow_mut().push(line);
            }
            return CommandResult::simulated();
        }

        if signal::interrupted() {
            return CommandResult::failed(CommandFailure::Interrupted);
        }

        debug!("$ {line}");
        let timeout = spec.timeout_limit().or(self.default_timeout);
        let spinner = self.spinner(spec);
        let result = self.runtime.block_on(self.supervise(argv, spec, timeout));
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }

        if !result.is_success() && !spec.is_probe() {
            debug!("`{line}` failed: {}", result.summary());
        }
        result
    }

    fn resolve_path(&self, name: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        which::which_in(name, self.search_path(), cwd).ok()
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn ensure_directory(&self, path: &Path) -> bool {
        if path.is_dir() {
            return true;
        }
        if self.dry_run {
            let action = format!("mkdir -p {}", path.display());
            info!("[DRY RUN] {action}");
            self.planned.borrow_mut().push(action);
            return true;
        }
        match std::fs::create_dir_all(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to create {}: {e}", path.display());
                false
            }
        }
    }

    fn extend_search_path(&self, dir: &Path) {
        let mut extra = self.extra_paths.borrow_mut();
        if !extra.iter().any(|known| known == dir) {
            debug!("Adding {} to the search path", dir.display());
            extra.insert(0, dir.to_path_buf());
        }
    }

    fn note_planned(&self, action: &str) {
        if self.dry_run {
            info!("[DRY RUN] {action}");
            self.planned.borrow_mut().push(action.to_string());
        }
    }

    fn take_planned(&self) -> Vec<String> {
        std::mem::take(&mut *self.planned.borrow_mut())
    }

    fn interrupted(&self) -> bool {
        signal::interrupted()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;
    use crate::system::{OsFamily, test_system};

    fn executor(dry_run: bool) -> ShellExecutor {
        let system = test_system(OsFamily::Ubuntu, PathBuf::from("/tmp"));
        ShellExecutor::new(&system, dry_run)
            .expect("runtime")
            .with_progress(false)
    }

    #[test]
    fn captures_output_and_exit_code() {
        let exec = executor(false);
        let ok = exec.run(&CommandSpec::shell("echo out; echo err >&2"));
        assert!(ok.is_success());
        assert_eq!(ok.stdout().trim(), "out");
        assert_eq!(ok.stderr().trim(), "err");

        let bad = exec.run(&CommandSpec::shell("exit 3"));
        assert!(!bad.is_success());
        assert_eq!(bad.exit_code(), Some(3));
        assert_eq!(bad.failure(), Some(&CommandFailure::NonZeroExit(3)));
    }

    #[test]
    fn missing_program_is_reported_not_raised() {
        let exec = executor(false);
        let result = exec.run(&CommandSpec::new("definitely-not-a-real-program-4821"));
        assert!(!result.is_success());
        assert_eq!(
            result.failure(),
            Some(&CommandFailure::NotFound(
                "definitely-not-a-real-program-4821".to_string()
            ))
        );
    }

    #[test]
    fn deadline_kills_slow_command() {
        let exec = executor(false);
        let result = exec.run(&CommandSpec::new("sleep").arg("5").timeout(Duration::from_millis(200)));
        assert!(!result.is_success());
        assert_eq!(
            result.failure(),
            Some(&CommandFailure::TimedOut(Duration::from_millis(200)))
        );
    }

    #[test]
    fn elevation_without_wrapper_fails_before_spawning() {
        let exec = executor(false).with_elevation_wrapper("no-such-elevation-wrapper-31");
        let result = exec.run(&CommandSpec::new("true").elevated());
        assert!(!result.is_success());
        assert_eq!(
            result.failure(),
            Some(&CommandFailure::ElevationUnavailable(
                "no-such-elevation-wrapper-31".to_string()
            ))
        );
    }

    #[test]
    fn dry_run_plans_mutations_and_skips_probes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("marker");
        let exec = executor(true);

        let result = exec.run(&CommandSpec::new("touch").path_arg(&marker).elevated());
        assert!(result.is_success());
        assert_eq!(result.stdout(), "");
        assert!(exec.run(&CommandSpec::new("dpkg").args(["-s", "zsh"]).probe()).is_success());
        assert!(exec.ensure_directory(&dir.path().join("nested/dir")));

        assert!(!marker.exists());
        assert!(!dir.path().join("nested").exists());
        let planned = exec.take_planned();
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0], format!("sudo touch {}", marker.display()));
        assert!(exec.take_planned().is_empty());
    }

    #[test]
    fn extra_search_path_is_consulted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = dir.path().join("bootstrap-probe-tool");
        std::fs::write(&tool, "#!/bin/sh\necho probe-ok\n").expect("write");
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let exec = executor(false);
        assert!(!exec.check_exists("bootstrap-probe-tool"));
        exec.extend_search_path(dir.path());
        assert_eq!(exec.resolve_path("bootstrap-probe-tool"), Some(tool));
    }
}
