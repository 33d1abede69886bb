//! Installer and uninstaller pipelines.
//!
//! A tool plugs into a fixed sequence of steps by implementing [`Installer`]
//! or [`Uninstaller`]; [`run_install`] and [`run_uninstall`] own the order,
//! the fatal/non-fatal policy of each step and the aggregate result.

mod backup;
mod files;
mod install;
mod result;
mod uninstall;

pub use backup::{BACKUP_TIMESTAMP_FORMAT, BackupOutcome, backup_existing, backup_path};
pub use files::{Scratch, append_to_file, scratch_dir, write_file};
pub use install::{Activation, Installer, run_install};
pub use result::{InstallResult, Installed, UninstallResult};
pub use uninstall::{Payload, Uninstaller, run_uninstall};

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};

use crate::exec::Executor;
use crate::system::SystemInfo;

/// Outcome of a primary install or removal: the warnings gathered on the way,
/// or the error that stopped the step.
pub type StepOutcome = Result<Vec<String>, String>;

/// A step without sub-steps: no warnings when `done`, `error()` otherwise.
pub fn completed(done: bool, error: impl FnOnce() -> String) -> StepOutcome {
    if done { Ok(Vec::new()) } else { Err(error()) }
}

/// Yes/no questions asked while a pipeline runs.
pub trait Prompter {
    fn confirm(&self, question: &str, default: bool) -> bool;
}

/// Non-interactive prompter: every question gets its default answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeDefaults;

impl Prompter for AssumeDefaults {
    fn confirm(&self, question: &str, default: bool) -> bool {
        log::debug!("{question} -> {}", if default { "yes" } else { "no" });
        default
    }
}

/// Everything a pipeline step may touch.
pub struct Context<'a> {
    pub exec: &'a dyn Executor,
    pub system: &'a SystemInfo,
    pub prompter: &'a dyn Prompter,
    clock: Option<NaiveDateTime>,
}

impl<'a> Context<'a> {
    pub fn new(exec: &'a dyn Executor, system: &'a SystemInfo, prompter: &'a dyn Prompter) -> Self {
        Self {
            exec,
            system,
            prompter,
            clock: None,
        }
    }

    /// Pin the clock used for backup names.
    pub fn at(mut self, time: NaiveDateTime) -> Self {
        self.clock = Some(time);
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.unwrap_or_else(|| Local::now().naive_local())
    }

    pub fn home(&self, relative: &str) -> PathBuf {
        self.system.home(relative)
    }

    pub fn confirm(&self, question: &str, default: bool) -> bool {
        self.prompter.confirm(question, default)
    }
}

/// A prerequisite installed before the tool itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// Package name handed to the package manager.
    pub name: &'static str,
    /// Executable whose presence means the dependency is satisfied.
    pub check_command: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl Dependency {
    pub const fn required(name: &'static str, check_command: &'static str, description: &'static str) -> Self {
        Self {
            name,
            check_command,
            description,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, check_command: &'static str, description: &'static str) -> Self {
        Self {
            name,
            check_command,
            description,
            required: false,
        }
    }
}
