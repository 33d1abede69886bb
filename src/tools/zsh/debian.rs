//! Zsh from the distribution archive.

use std::path::PathBuf;

use log::info;

use super::{
    DEPENDENCIES, InstallOptions, UninstallOptions, backup_targets, configure_shell,
    oh_my_zsh_dir, restore_login_shell, user_payloads, zshrc,
};
use crate::pipeline::{Context, Dependency, Installer, Payload, StepOutcome, Uninstaller, completed};
use crate::platform::{Platform, apt};

const PACKAGE: &str = "zsh";

pub struct ZshAptInstaller {
    options: InstallOptions,
}

impl ZshAptInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self { options }
    }
}

impl Installer for ZshAptInstaller {
    fn name(&self) -> &str {
        "Zsh"
    }

    fn binary(&self) -> &str {
        "zsh"
    }

    fn platform(&self) -> Platform {
        Platform::Debian
    }

    fn check_existing(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists("zsh")
            && (!self.options.install_oh_my_zsh || oh_my_zsh_dir(ctx).exists())
    }

    fn ensure_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        apt::available(ctx)
    }

    fn refresh_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        apt::update(ctx)
    }

    fn dependencies(&self) -> &'static [Dependency] {
        DEPENDENCIES
    }

    fn install_dependency(&mut self, ctx: &Context<'_>, dependency: &Dependency) -> bool {
        apt::install(ctx, &[dependency.name])
    }

    fn backup_targets(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        if self.options.backup_existing {
            vec![zshrc(ctx)]
        } else {
            Vec::new()
        }
    }

    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        completed(apt::install(ctx, &[PACKAGE]), || {
            format!("apt-get install {PACKAGE} failed")
        })
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        configure_shell(ctx, &self.options)
    }

    fn notes(&self, _ctx: &Context<'_>) -> Vec<String> {
        if self.options.set_default_shell {
            vec!["Log out and back in for the new login shell to take effect".to_string()]
        } else {
            Vec::new()
        }
    }
}

pub struct ZshAptUninstaller {
    options: UninstallOptions,
}

impl ZshAptUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self { options }
    }
}

impl Uninstaller for ZshAptUninstaller {
    fn name(&self) -> &str {
        "Zsh"
    }

    fn binary(&self) -> &str {
        "zsh"
    }

    fn platform(&self) -> Platform {
        Platform::Debian
    }

    fn is_installed(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists("zsh") || oh_my_zsh_dir(ctx).exists()
    }

    fn backup_targets(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        backup_targets(ctx, &self.options)
    }

    /// The login shell must point at bash before the package goes away.
    fn prepare(&mut self, ctx: &Context<'_>) -> Vec<String> {
        if self.options.restore_default_shell {
            restore_login_shell(ctx)
        } else {
            Vec::new()
        }
    }

    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        if !apt::is_installed(ctx, PACKAGE) {
            info!("The zsh package is not installed; removing the user configuration only");
            return Ok(Vec::new());
        }
        if !apt::remove(ctx, &[PACKAGE], true) {
            return Err(format!("apt-get purge {PACKAGE} failed"));
        }
        let mut warnings = Vec::new();
        if !apt::autoremove(ctx) {
            warnings.push("apt-get autoremove failed; unused dependencies were left installed".to_string());
        }
        Ok(warnings)
    }

    fn secondary_payloads(&self, ctx: &Context<'_>) -> Vec<Payload> {
        user_payloads(ctx, &self.options)
    }
}
