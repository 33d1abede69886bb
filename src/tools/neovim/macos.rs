//! Neovim from Homebrew.

use std::path::PathBuf;

use log::info;

use super::{
    Channel, InstallOptions, UninstallOptions, config_backup, config_dir, install_providers,
    remove_providers, user_payloads,
};
use crate::pipeline::{Context, Dependency, Installer, Payload, StepOutcome, Uninstaller, completed};
use crate::platform::Platform;
use crate::platform::homebrew::{BrewKind, Homebrew};

const FORMULA: &str = "neovim";

const DEPENDENCIES: &[Dependency] = &[
    Dependency::required("git", "git", "plugin managers clone over git"),
    Dependency::optional("node", "node", "language servers and plugins"),
    Dependency::required("python@3.12", "python3", "Python plugins"),
    Dependency::required("ripgrep", "rg", "live grep"),
    Dependency::optional("fd", "fd", "file finder"),
    Dependency::optional("fzf", "fzf", "fuzzy finder"),
    Dependency::optional("lazygit", "lazygit", "terminal git UI"),
    Dependency::optional("lua", "lua", "Lua runtime"),
    Dependency::optional("luarocks", "luarocks", "Lua package manager"),
];

pub struct NeovimBrewInstaller {
    options: InstallOptions,
    brew: Homebrew,
}

impl NeovimBrewInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self {
            options,
            brew: Homebrew::new(),
        }
    }
}

impl Installer for NeovimBrewInstaller {
    fn name(&self) -> &str {
        "Neovim"
    }

    fn binary(&self) -> &str {
        "nvim"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn ensure_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        self.brew.ensure(ctx)
    }

    fn refresh_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        self.brew.update(ctx)
    }

    fn dependencies(&self) -> &'static [Dependency] {
        if self.options.install_dependencies {
            DEPENDENCIES
        } else {
            &[]
        }
    }

    fn install_dependency(&mut self, ctx: &Context<'_>, dependency: &Dependency) -> bool {
        self.brew.install(ctx, dependency.name, BrewKind::Formula)
    }

    fn backup_targets(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        if self.options.backup_existing {
            vec![config_dir(ctx)]
        } else {
            Vec::new()
        }
    }

    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        match self.options.channel {
            Channel::Stable => self.brew.install_or_upgrade(ctx, FORMULA, BrewKind::Formula),
            Channel::Nightly => {
                if self.brew.is_installed(ctx, FORMULA, BrewKind::Formula) {
                    info!("Replacing the installed neovim formula with a HEAD build");
                    if !self.brew.uninstall(ctx, FORMULA, BrewKind::Formula) {
                        return Err("Could not remove the released neovim formula".to_string());
                    }
                }
                completed(
                    self.brew
                        .install_with(ctx, FORMULA, BrewKind::Formula, &["--HEAD"]),
                    || "brew install --HEAD neovim failed".to_string(),
                )
            }
        }
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        if self.options.install_providers {
            install_providers(ctx)
        } else {
            Vec::new()
        }
    }
}

pub struct NeovimBrewUninstaller {
    options: UninstallOptions,
    brew: Homebrew,
}

impl NeovimBrewUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self {
            options,
            brew: Homebrew::new(),
        }
    }
}

impl Uninstaller for NeovimBrewUninstaller {
    fn name(&self) -> &str {
        "Neovim"
    }

    fn binary(&self) -> &str {
        "nvim"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn backup_targets(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        config_backup(ctx, &self.options)
    }

    fn prepare(&mut self, ctx: &Context<'_>) -> Vec<String> {
        if self.options.remove_providers {
            remove_providers(ctx)
        } else {
            Vec::new()
        }
    }

    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        if !self.brew.is_installed(ctx, FORMULA, BrewKind::Formula) {
            return Err("nvim is on the PATH but Homebrew does not manage it; remove it manually".to_string());
        }
        completed(self.brew.uninstall(ctx, FORMULA, BrewKind::Formula), || {
            "brew uninstall neovim failed".to_string()
        })
    }

    fn secondary_payloads(&self, ctx: &Context<'_>) -> Vec<Payload> {
        user_payloads(ctx, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::scripted::ScriptedExecutor;
    use crate::pipeline::{AssumeDefaults, run_install, run_uninstall};
    use crate::system::{OsFamily, test_system};

    #[test]
    fn dependencies_follow_the_option() {
        let with = NeovimBrewInstaller::new(InstallOptions::default());
        assert_eq!(with.dependencies().len(), DEPENDENCIES.len());
        let without = NeovimBrewInstaller::new(InstallOptions {
            install_dependencies: false,
            ..InstallOptions::default()
        });
        assert!(without.dependencies().is_empty());
    }

    #[test]
    fn backs_up_config_when_asked() {
        let exec = ScriptedExecutor::new();
        let system = test_system(OsFamily::MacOs, PathBuf::from("/Users/dev"));
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let installer = NeovimBrewInstaller::new(InstallOptions::default());
        assert_eq!(installer.backup_targets(&ctx), vec![PathBuf::from("/Users/dev/.config/nvim")]);
    }

    #[test]
    fn dry_run_install_and_uninstall_only_plan() {
        let home = tempfile::tempdir().expect("tempdir");
        let exec = ScriptedExecutor::dry_run().with_binary("brew");
        let system = test_system(OsFamily::MacOs, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let mut installer = NeovimBrewInstaller::new(InstallOptions {
            install_dependencies: false,
            install_providers: false,
            ..InstallOptions::default()
        });
        if installer.brew.locate(&ctx) != Some(PathBuf::from("/usr/bin/brew")) {
            return;
        }
        installer.brew = Homebrew::new();
        let result = run_install(&mut installer, &ctx);
        assert!(result.success, "{result:?}");
        assert!(result.planned.iter().any(|p| p.starts_with("/usr/bin/brew upgrade neovim")));

        exec.add_binary("nvim");
        let result = run_uninstall(&mut NeovimBrewUninstaller::new(UninstallOptions::default()), &ctx);
        assert!(result.success, "{result:?}");
        assert!(result.planned.contains(&"/usr/bin/brew uninstall neovim".to_string()));
        assert_eq!(std::fs::read_dir(home.path()).expect("read_dir").count(), 0);
    }

    #[test]
    fn unmanaged_binary_fails_removal() {
        let exec = ScriptedExecutor::new().with_binary("brew").with_binary("nvim");
        exec.fail("/usr/bin/brew list");
        let system = test_system(OsFamily::MacOs, PathBuf::from("/Users/dev"));
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let mut uninstaller = NeovimBrewUninstaller::new(UninstallOptions::default());
        if uninstaller.brew.locate(&ctx) != Some(PathBuf::from("/usr/bin/brew")) {
            return;
        }
        let error = uninstaller.remove_primary(&ctx).expect_err("unmanaged");
        assert!(error.contains("Homebrew does not manage it"));
        assert!(!exec.ran("/usr/bin/brew uninstall"));
    }
}
