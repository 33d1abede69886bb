//! Homebrew, the macOS package manager.

use std::path::PathBuf;
use std::time::Duration;

use log::{info, warn};

use crate::exec::{CommandResult, CommandSpec};
use crate::pipeline::{Context, StepOutcome, completed};

pub const HOMEBREW_INSTALL_URL: &str =
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

/// Apple Silicon prefix first, then the Intel prefix.
const HOMEBREW_LOCATIONS: [&str; 2] = ["/opt/homebrew/bin/brew", "/usr/local/bin/brew"];

const BREW_TIMEOUT: Duration = Duration::from_secs(1800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrewKind {
    Formula,
    Cask,
}

/// Handle on the `brew` executable. The location is resolved on first use and
/// kept for the lifetime of the owning installer.
#[derive(Debug, Default)]
pub struct Homebrew {
    path: Option<PathBuf>,
}

impl Homebrew {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locate(&mut self, ctx: &Context<'_>) -> Option<PathBuf> {
        if self.path.is_none() {
            self.path = HOMEBREW_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.is_file())
                .or_else(|| ctx.exec.resolve_path("brew"));
            if let Some(dir) = self.path.as_deref().and_then(|path| path.parent()) {
                ctx.exec.extend_search_path(dir);
            }
        }
        self.path.clone()
    }

    /// Locate Homebrew, running the official install script when missing.
    pub fn ensure(&mut self, ctx: &Context<'_>) -> bool {
        if self.locate(ctx).is_some() {
            return true;
        }

        info!("Homebrew not found, running the Homebrew installer");
        let result = ctx.exec.run(
            &CommandSpec::shell(format!(
                "/bin/bash -c \"$(curl -fsSL {HOMEBREW_INSTALL_URL})\""
            ))
            .interactive()
            .timeout(BREW_TIMEOUT),
        );
        if !result.is_success() {
            warn!("Homebrew installation failed: {}", result.summary());
            return false;
        }
        if ctx.exec.is_dry_run() {
            return true;
        }
        self.locate(ctx).is_some()
    }

    pub fn update(&mut self, ctx: &Context<'_>) -> bool {
        self.brew(ctx, &["update"], Some("Updating Homebrew"))
            .is_success()
    }

    pub fn is_installed(&mut self, ctx: &Context<'_>, name: &str, kind: BrewKind) -> bool {
        let Some(brew) = self.locate(ctx) else {
            return false;
        };
        let mut spec = CommandSpec::new(brew.to_string_lossy()).arg("list");
        if kind == BrewKind::Cask {
            spec = spec.arg("--cask");
        }
        ctx.exec.run(&spec.arg(name).probe()).is_success()
    }

    pub fn install(&mut self, ctx: &Context<'_>, name: &str, kind: BrewKind) -> bool {
        self.install_with(ctx, name, kind, &[])
    }

    pub fn install_with(
        &mut self,
        ctx: &Context<'_>,
        name: &str,
        kind: BrewKind,
        extra: &[&str],
    ) -> bool {
        let mut args = vec!["install"];
        if kind == BrewKind::Cask {
            args.push("--cask");
        }
        args.extend_from_slice(extra);
        args.push(name);
        self.brew(ctx, &args, Some(&format!("Installing {name}")))
            .is_success()
    }

    pub fn upgrade(&mut self, ctx: &Context<'_>, name: &str, kind: BrewKind) -> bool {
        let args: &[&str] = match kind {
            BrewKind::Formula => &["upgrade", name],
            BrewKind::Cask => &["upgrade", "--cask", name],
        };
        self.brew(ctx, args, Some(&format!("Upgrading {name}")))
            .is_success()
    }

    /// Install, or upgrade when Homebrew already manages the package. A failed
    /// upgrade of an installed package is a warning.
    pub fn install_or_upgrade(&mut self, ctx: &Context<'_>, name: &str, kind: BrewKind) -> StepOutcome {
        if self.is_installed(ctx, name, kind) {
            if self.upgrade(ctx, name, kind) {
                return Ok(Vec::new());
            }
            return Ok(vec![format!(
                "{name} is installed but could not be upgraded; kept the current version"
            )]);
        }
        completed(self.install(ctx, name, kind), || format!("brew install {name} failed"))
    }

    pub fn uninstall(&mut self, ctx: &Context<'_>, name: &str, kind: BrewKind) -> bool {
        let args: &[&str] = match kind {
            BrewKind::Formula => &["uninstall", name],
            BrewKind::Cask => &["uninstall", "--cask", name],
        };
        self.brew(ctx, args, Some(&format!("Uninstalling {name}")))
            .is_success()
    }

    fn brew(&mut self, ctx: &Context<'_>, args: &[&str], description: Option<&str>) -> CommandResult {
        let Some(brew) = self.locate(ctx) else {
            return CommandResult::failed(crate::exec::CommandFailure::NotFound("brew".to_string()));
        };
        let mut spec = CommandSpec::new(brew.to_string_lossy())
            .args(args.iter().copied())
            .timeout(BREW_TIMEOUT);
        if let Some(description) = description {
            spec = spec.describe(description);
        }
        ctx.exec.run(&spec)
    }
}
