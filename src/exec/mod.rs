//! Command execution.
//!
//! Every external effect the bootstrapper has goes through an [`Executor`]:
//! package managers, downloads, directory creation, copies and removals.
//! That is what makes `--dry-run` trustworthy and what lets the pipelines be
//! driven by an in-memory executor in tests.

mod shell;

#[cfg(test)]
pub(crate) mod scripted;

pub use shell::ShellExecutor;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use thiserror::Error;

/// Upper bound for a single download.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);
/// Upper bound for `<tool> --version` style queries.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a command did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandFailure {
    #[error("command not found: {0}")]
    NotFound(String),
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("exited with status {0}")]
    NonZeroExit(i32),
    #[error("terminated by a signal")]
    Signalled,
    #[error("elevation unavailable: {0} not found")]
    ElevationUnavailable(String),
    #[error("interrupted")]
    Interrupted,
    #[error("failed to launch: {0}")]
    Launch(String),
}

/// Outcome of one command. Built once by the executor and then read only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    success: bool,
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
    failure: Option<CommandFailure>,
}

impl CommandResult {
    /// The process ran to completion with `exit_code`.
    pub fn completed(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: exit_code == 0,
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            failure: (exit_code != 0).then_some(CommandFailure::NonZeroExit(exit_code)),
        }
    }

    /// The process never produced an exit status.
    pub fn failed(failure: CommandFailure) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            failure: Some(failure),
        }
    }

    /// Stand-in result for a command that was only planned.
    pub fn simulated() -> Self {
        Self {
            success: true,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn failure(&self) -> Option<&CommandFailure> {
        self.failure.as_ref()
    }

    /// One-line explanation suitable for a warning.
    pub fn summary(&self) -> String {
        let reason = match &self.failure {
            Some(failure) => failure.to_string(),
            None => return "ok".to_string(),
        };
        match self.stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
            Some(detail) => format!("{reason}: {detail}"),
            None => reason,
        }
    }
}

/// A command to run, built fluently.
///
/// ```
/// use devbootstrap::exec::CommandSpec;
/// let spec = CommandSpec::new("apt-get")
///     .args(["install", "-y", "zsh"])
///     .elevated()
///     .describe("Installing zsh");
/// assert_eq!(spec.command_line(), "apt-get install -y zsh");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    description: Option<String>,
    elevated: bool,
    timeout: Option<Duration>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    probe: bool,
    interactive: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// `sh -c <script>`; extra positional arguments become `$1..`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script).arg("sh")
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Run with administrator privileges (wrapped in `sudo` unless root).
    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    pub fn elevated_if(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Read-only query. Answered without spawning in dry-run mode and never
    /// recorded as a planned action.
    pub fn probe(mut self) -> Self {
        self.probe = true;
        self
    }

    /// Inherit the terminal instead of capturing output.
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    pub fn timeout_limit(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env_overlay(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Shell-quoted rendering used for logs and dry-run plans.
    pub fn command_line(&self) -> String {
        render_argv(&self.argv())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

pub(crate) fn render_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@+,%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// The single gateway for side effects.
pub trait Executor {
    /// Run a command. Never panics; every failure is described by the result.
    fn run(&self, spec: &CommandSpec) -> CommandResult;

    /// Locate an executable on the search path.
    fn resolve_path(&self, name: &str) -> Option<PathBuf>;

    fn is_dry_run(&self) -> bool;

    /// `mkdir -p` semantics. Only planned in dry-run mode.
    fn ensure_directory(&self, path: &Path) -> bool;

    fn check_exists(&self, name: &str) -> bool {
        self.resolve_path(name).is_some()
    }

    /// First line of `<name> <flag>` output: stdout, or stderr when stdout is
    /// empty. `None` when the tool is missing or the query fails.
    fn get_version(&self, name: &str, flag: &str) -> Option<String> {
        let result = self.run(
            &CommandSpec::new(name)
                .arg(flag)
                .probe()
                .timeout(PROBE_TIMEOUT),
        );
        if !result.is_success() {
            return None;
        }
        first_line(result.stdout()).or_else(|| first_line(result.stderr()))
    }

    /// Fetch `url` into `destination`, trying curl and then wget.
    fn download(&self, url: &str, destination: &Path) -> bool {
        let target = destination.to_string_lossy().into_owned();
        let transfers = [
            CommandSpec::new("curl").args(["-fsSL", "-o", target.as_str(), url]),
            CommandSpec::new("wget").args(["-q", "-O", target.as_str(), url]),
        ];

        let mut attempted = false;
        for transfer in transfers {
            let tool = transfer.program().to_string();
            if !self.is_dry_run() && !self.check_exists(&tool) {
                continue;
            }
            attempted = true;
            let result = self.run(
                &transfer
                    .describe(format!("Downloading {url}"))
                    .timeout(DOWNLOAD_TIMEOUT),
            );
            if result.is_success() {
                return true;
            }
            warn!("{tool} could not download {url}: {}", result.summary());
        }

        if !attempted {
            warn!("Neither curl nor wget is available to download {url}");
        }
        false
    }

    /// Make `dir` visible to [`resolve_path`](Self::resolve_path) and to
    /// spawned commands for the rest of the run.
    fn extend_search_path(&self, _dir: &Path) {}

    /// Record a side effect performed outside [`run`](Self::run), such as a
    /// file write, so dry-run output stays complete.
    fn note_planned(&self, _action: &str) {}

    /// Drain the actions recorded in dry-run mode.
    fn take_planned(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether the operator asked to stop.
    fn interrupted(&self) -> bool {
        false
    }
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::scripted::ScriptedExecutor;
    use super::*;

    #[test]
    fn completed_result_classifies_exit_code() {
        let ok = CommandResult::completed(0, "out", "");
        assert!(ok.is_success());
        assert_eq!(ok.failure(), None);

        let bad = CommandResult::completed(3, "", "boom\n");
        assert!(!bad.is_success());
        assert_eq!(bad.exit_code(), Some(3));
        assert_eq!(bad.failure(), Some(&CommandFailure::NonZeroExit(3)));
        assert_eq!(bad.summary(), "exited with status 3: boom");
    }

    #[test]
    fn command_line_quotes_only_when_needed() {
        let spec = CommandSpec::shell("echo 'hi' > /tmp/x").arg("/path with space");
        assert_eq!(
            spec.command_line(),
            r#"sh -c 'echo '\''hi'\'' > /tmp/x' sh '/path with space'"#
        );
    }

    #[test]
    fn version_is_first_stdout_line_then_stderr() {
        let exec = ScriptedExecutor::new();
        exec.respond("nvim --version", CommandResult::completed(0, "NVIM v0.10.1\nBuild type: Release\n", ""));
        exec.respond("java -version", CommandResult::completed(0, "", "openjdk 21\n"));
        exec.respond("broken --version", CommandResult::completed(1, "x", ""));

        assert_eq!(exec.get_version("nvim", "--version").as_deref(), Some("NVIM v0.10.1"));
        assert_eq!(exec.get_version("java", "-version").as_deref(), Some("openjdk 21"));
        assert_eq!(exec.get_version("broken", "--version"), None);
    }

    #[test]
    fn download_falls_back_to_wget() {
        let exec = ScriptedExecutor::new().with_binary("curl").with_binary("wget");
        exec.respond("curl", CommandResult::completed(22, "", "404"));

        assert!(exec.download("https://example.invalid/a.zip", Path::new("/tmp/a.zip")));
        let calls = exec.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("curl -fsSL -o /tmp/a.zip"));
        assert!(calls[1].starts_with("wget -q -O /tmp/a.zip"));
    }

    #[test]
    fn download_without_transfer_tools_fails() {
        let exec = ScriptedExecutor::new();
        assert!(!exec.download("https://example.invalid/a.zip", Path::new("/tmp/a.zip")));
        assert!(exec.calls().is_empty());
    }
}
