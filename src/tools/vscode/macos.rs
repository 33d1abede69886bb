//! Visual Studio Code from the Homebrew cask.

use std::path::{Path, PathBuf};

use log::debug;

use super::{InstallOptions, UninstallOptions, install_extensions};
use crate::exec::CommandSpec;
use crate::pipeline::{Context, Installed, Installer, Payload, StepOutcome, Uninstaller};
use crate::platform::Platform;
use crate::platform::homebrew::{BrewKind, Homebrew};

const CASK: &str = "visual-studio-code";
const APP_PATH: &str = "/Applications/Visual Studio Code.app";
const APP_CLI_DIR: &str = "/Applications/Visual Studio Code.app/Contents/Resources/app/bin";
const CLI_LINK: &str = "/usr/local/bin/code";

fn app_locations(ctx: &Context<'_>) -> [PathBuf; 2] {
    [
        PathBuf::from(APP_PATH),
        ctx.home("Applications/Visual Studio Code.app"),
    ]
}

fn installed_app(ctx: &Context<'_>) -> Option<PathBuf> {
    app_locations(ctx).into_iter().find(|app| app.exists())
}

pub struct VscodeCaskInstaller {
    options: InstallOptions,
    brew: Homebrew,
}

impl VscodeCaskInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self {
            options,
            brew: Homebrew::new(),
        }
    }

    fn link_cli(&self, ctx: &Context<'_>) -> Result<(), String> {
        if ctx.exec.resolve_path("code").is_some_and(|path| path == Path::new(CLI_LINK)) {
            return Ok(());
        }
        let cli = Path::new(APP_CLI_DIR).join("code");
        if !ctx.exec.is_dry_run() && !cli.exists() {
            return Err(
                "The code command was not found in the application bundle; run \"Shell Command: Install 'code' command in PATH\" from VS Code".to_string(),
            );
        }
        let bin = ctx.exec.run(
            &CommandSpec::new("mkdir")
                .args(["-p", "/usr/local/bin"])
                .elevated(),
        );
        if !bin.is_success() {
            return Err(format!("Could not create /usr/local/bin: {}", bin.summary()));
        }
        let link = ctx.exec.run(
            &CommandSpec::new("ln")
                .arg("-sf")
                .path_arg(&cli)
                .arg(CLI_LINK)
                .elevated()
                .describe("Linking the code command"),
        );
        if link.is_success() {
            Ok(())
        } else {
            Err(format!("Could not link the code command: {}", link.summary()))
        }
    }
}

impl Installer for VscodeCaskInstaller {
    fn name(&self) -> &str {
        "Visual Studio Code"
    }

    fn binary(&self) -> &str {
        "code"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn check_existing(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists("code") || installed_app(ctx).is_some()
    }

    fn ensure_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        self.brew.ensure(ctx)
    }

    fn refresh_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        self.brew.update(ctx)
    }

    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        self.brew.install_or_upgrade(ctx, CASK, BrewKind::Cask)
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        let mut warnings = Vec::new();
        ctx.exec.extend_search_path(Path::new(APP_CLI_DIR));
        if let Err(e) = self.link_cli(ctx) {
            warnings.push(e);
        }

        if self.options.install_extensions && !self.options.extensions.is_empty() {
            let code = ctx
                .exec
                .resolve_path("code")
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_else(|| "code".to_string());
            warnings.extend(install_extensions(ctx, &code, &self.options.extensions));
        }
        warnings
    }

    /// The bundle counts as installed even when the CLI link is missing.
    fn verify(&mut self, ctx: &Context<'_>) -> Option<Installed> {
        if let Some(path) = ctx.exec.resolve_path("code") {
            return Some(Installed {
                version: ctx.exec.get_version("code", "--version"),
                path: Some(path),
            });
        }
        installed_app(ctx).map(|app| Installed {
            path: Some(app),
            version: None,
        })
    }
}

pub struct VscodeCaskUninstaller {
    options: UninstallOptions,
    brew: Homebrew,
}

impl VscodeCaskUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self {
            options,
            brew: Homebrew::new(),
        }
    }

    fn remove_cli_link(&self, ctx: &Context<'_>) -> Option<String> {
        let points_into_app = std::fs::read_link(CLI_LINK)
            .map(|target| target.to_string_lossy().contains("Visual Studio Code.app"))
            .unwrap_or(false);
        if !points_into_app {
            return None;
        }
        let removal = ctx
            .exec
            .run(&CommandSpec::new("rm").args(["-f", CLI_LINK]).elevated());
        (!removal.is_success()).then(|| format!("Could not remove {CLI_LINK}: {}", removal.summary()))
    }
}

impl Uninstaller for VscodeCaskUninstaller {
    fn name(&self) -> &str {
        "Visual Studio Code"
    }

    fn binary(&self) -> &str {
        "code"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn is_installed(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists("code") || installed_app(ctx).is_some()
    }

    fn backup_targets(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        if self.options.backup_settings && self.options.remove_settings {
            vec![ctx.home("Library/Application Support/Code/User")]
        } else {
            Vec::new()
        }
    }

    fn prepare(&mut self, ctx: &Context<'_>) -> Vec<String> {
        let quit = ctx.exec.run(
            &CommandSpec::new("osascript").args(["-e", "quit app \"Visual Studio Code\""]),
        );
        if !quit.is_success() {
            debug!("VS Code was not running: {}", quit.summary());
        }
        Vec::new()
    }

    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let mut warnings = Vec::new();
        if self.brew.is_installed(ctx, CASK, BrewKind::Cask) {
            if self.brew.uninstall(ctx, CASK, BrewKind::Cask) {
                warnings.extend(self.remove_cli_link(ctx));
                return Ok(warnings);
            }
            warnings.push(format!("Homebrew could not remove {CASK}; removed the application manually"));
        }

        for app in app_locations(ctx) {
            if !app.exists() {
                continue;
            }
            let removal = ctx
                .exec
                .run(&CommandSpec::new("rm").arg("-rf").path_arg(&app).elevated());
            if !removal.is_success() {
                return Err(format!("Could not remove {}: {}", app.display(), removal.summary()));
            }
        }
        warnings.extend(self.remove_cli_link(ctx));
        Ok(warnings)
    }

    fn secondary_payloads(&self, ctx: &Context<'_>) -> Vec<Payload> {
        let mut payloads = Vec::new();
        if self.options.remove_extensions {
            payloads.push(Payload::new("extensions", vec![ctx.home(".vscode/extensions")]));
        }
        if self.options.remove_settings {
            payloads.push(Payload::new(
                "settings",
                vec![
                    ctx.home("Library/Application Support/Code"),
                    ctx.home("Library/Preferences/com.microsoft.VSCode.plist"),
                ],
            ));
        }
        if self.options.remove_cache {
            payloads.push(Payload::new(
                "cache",
                vec![
                    ctx.home("Library/Caches/com.microsoft.VSCode"),
                    ctx.home("Library/Caches/com.microsoft.VSCode.ShipIt"),
                    ctx.home("Library/Saved Application State/com.microsoft.VSCode.savedState"),
                    ctx.home("Library/Logs/Code"),
                ],
            ));
        }
        payloads
    }

    fn still_present(&mut self, ctx: &Context<'_>) -> bool {
        installed_app(ctx).is_some()
    }
}
