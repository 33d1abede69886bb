//! In-memory executor for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{CommandResult, CommandSpec, Executor};

/// Answers commands from canned responses and records every call.
///
/// Unmatched commands succeed with empty output. Responses match on the
/// rendered command line prefix; the most recent registration wins.
#[derive(Default)]
pub struct ScriptedExecutor {
    dry_run: bool,
    responses: RefCell<Vec<(String, CommandResult)>>,
    binaries: RefCell<BTreeMap<String, PathBuf>>,
    installs: RefCell<Vec<(String, String)>>,
    interrupt_on: RefCell<Option<String>>,
    interrupted: Cell<bool>,
    calls: RefCell<Vec<String>>,
    elevated: RefCell<Vec<String>>,
    planned: RefCell<Vec<String>>,
    search_path: RefCell<Vec<PathBuf>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn with_binary(self, name: &str) -> Self {
        self.add_binary(name);
        self
    }

    pub fn add_binary(&self, name: &str) {
        self.binaries
            .borrow_mut()
            .insert(name.to_string(), PathBuf::from("/usr/bin").join(name));
    }

    pub fn remove_binary(&self, name: &str) {
        self.binaries.borrow_mut().remove(name);
    }

    /// Make `binary` resolvable once a command starting with `prefix` ran.
    pub fn installs_binary(&self, prefix: &str, binary: &str) {
        self.installs
            .borrow_mut()
            .push((prefix.to_string(), binary.to_string()));
    }

    pub fn respond(&self, prefix: &str, result: CommandResult) {
        self.responses
            .borrow_mut()
            .push((prefix.to_string(), result));
    }

    pub fn fail(&self, prefix: &str) {
        self.respond(prefix, CommandResult::completed(1, "", "scripted failure"));
    }

    /// Raise the interrupt flag when a command starting with `prefix` runs.
    pub fn interrupt_on(&self, prefix: &str) {
        *self.interrupt_on.borrow_mut() = Some(prefix.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn elevated_calls(&self) -> Vec<String> {
        self.elevated.borrow().clone()
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|call| call.starts_with(prefix))
    }

    pub fn search_path(&self) -> Vec<PathBuf> {
        self.search_path.borrow().clone()
    }

    fn record(&self, line: &str) {
        self.calls.borrow_mut().push(line.to_string());
        if let Some(prefix) = self.interrupt_on.borrow().as_deref()
            && line.starts_with(prefix)
        {
            self.interrupted.set(true);
        }
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, spec: &CommandSpec) -> CommandResult {
        let line = spec.command_line();
        self.record(&line);
        if spec.is_elevated() {
            self.elevated.borrow_mut().push(line.clone());
        }

        if self.dry_run && !spec.is_probe() {
            self.planned.borrow_mut().push(line);
            return CommandResult::simulated();
        }

        let installed: Vec<String> = self
            .installs
            .borrow()
            .iter()
            .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, binary)| binary.clone())
            .collect();
        for binary in installed {
            self.add_binary(&binary);
        }

        self.responses
            .borrow()
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| CommandResult::completed(0, "", ""))
    }

    fn resolve_path(&self, name: &str) -> Option<PathBuf> {
        self.binaries.borrow().get(name).cloned()
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn ensure_directory(&self, path: &Path) -> bool {
        let line = format!("mkdir -p {}", path.display());
        self.record(&line);
        if self.dry_run {
            self.planned.borrow_mut().push(line);
        }
        true
    }

    fn extend_search_path(&self, dir: &Path) {
        self.search_path.borrow_mut().push(dir.to_path_buf());
    }

    fn note_planned(&self, action: &str) {
        if self.dry_run {
            self.planned.borrow_mut().push(action.to_string());
        }
    }

    fn take_planned(&self) -> Vec<String> {
        std::mem::take(&mut *self.planned.borrow_mut())
    }

    fn interrupted(&self) -> bool {
        self.interrupted.get()
    }
}
