//! Zsh from Homebrew. macOS ships zsh as the login shell; Homebrew provides a
//! current release and the system copy is never touched.

use std::path::PathBuf;

use super::{
    DEPENDENCIES, InstallOptions, UninstallOptions, backup_targets, configure_shell,
    oh_my_zsh_dir, restore_login_shell, user_payloads, zshrc,
};
use crate::pipeline::{Context, Dependency, Installer, Payload, StepOutcome, Uninstaller, completed};
use crate::platform::Platform;
use crate::platform::homebrew::{BrewKind, Homebrew};

const FORMULA: &str = "zsh";

pub struct ZshBrewInstaller {
    options: InstallOptions,
    brew: Homebrew,
}

impl ZshBrewInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self {
            options,
            brew: Homebrew::new(),
        }
    }
}

impl Installer for ZshBrewInstaller {
    fn name(&self) -> &str {
        "Zsh"
    }

    fn binary(&self) -> &str {
        "zsh"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    /// The system zsh alone does not count; the framework must be there too.
    fn check_existing(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists("zsh")
            && (!self.options.install_oh_my_zsh || oh_my_zsh_dir(ctx).exists())
    }

    fn ensure_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        self.brew.ensure(ctx)
    }

    fn refresh_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        self.brew.update(ctx)
    }

    fn dependencies(&self) -> &'static [Dependency] {
        DEPENDENCIES
    }

    fn install_dependency(&mut self, ctx: &Context<'_>, dependency: &Dependency) -> bool {
        self.brew.install(ctx, dependency.name, BrewKind::Formula)
    }

    fn backup_targets(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        if self.options.backup_existing {
            vec![zshrc(ctx)]
        } else {
            Vec::new()
        }
    }

    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        self.brew.install_or_upgrade(ctx, FORMULA, BrewKind::Formula)
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        configure_shell(ctx, &self.options)
    }

    fn notes(&self, _ctx: &Context<'_>) -> Vec<String> {
        vec!["Open a new terminal to start using the new shell configuration".to_string()]
    }
}

pub struct ZshBrewUninstaller {
    options: UninstallOptions,
    brew: Homebrew,
}

impl ZshBrewUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self {
            options,
            brew: Homebrew::new(),
        }
    }
}

impl Uninstaller for ZshBrewUninstaller {
    fn name(&self) -> &str {
        "Zsh"
    }

    fn binary(&self) -> &str {
        "zsh"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn is_installed(&mut self, ctx: &Context<'_>) -> bool {
        oh_my_zsh_dir(ctx).exists() || self.brew.is_installed(ctx, FORMULA, BrewKind::Formula)
    }

    fn backup_targets(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        backup_targets(ctx, &self.options)
    }

    fn prepare(&mut self, ctx: &Context<'_>) -> Vec<String> {
        if self.options.restore_default_shell {
            restore_login_shell(ctx)
        } else {
            Vec::new()
        }
    }

    /// Only the Homebrew formula is removed; `/bin/zsh` belongs to the OS.
    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let installed = self.brew.is_installed(ctx, FORMULA, BrewKind::Formula);
        completed(!installed || self.brew.uninstall(ctx, FORMULA, BrewKind::Formula), || {
            format!("brew uninstall {FORMULA} failed")
        })
    }

    fn secondary_payloads(&self, ctx: &Context<'_>) -> Vec<Payload> {
        user_payloads(ctx, &self.options)
    }

    fn still_present(&mut self, ctx: &Context<'_>) -> bool {
        self.brew.is_installed(ctx, FORMULA, BrewKind::Formula)
            || (self.options.remove_oh_my_zsh && oh_my_zsh_dir(ctx).exists())
    }
}
