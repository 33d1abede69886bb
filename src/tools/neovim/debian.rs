//! Neovim on Ubuntu and Debian.
//!
//! Distribution packages lag far behind upstream, so installation walks a
//! fallback chain: the upstream AppImage (x86_64 only), the Neovim PPA
//! (Ubuntu only), the snap, and finally the distribution package.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};

use super::{
    Channel, InstallOptions, UninstallOptions, config_backup, config_dir, install_providers,
    remove_providers, user_payloads,
};
use crate::exec::CommandSpec;
use crate::pipeline::{Context, Dependency, Installer, Payload, StepOutcome, Uninstaller};
use crate::platform::{Platform, apt};
use crate::system::{Architecture, OsFamily, SystemInfo};

const PACKAGE: &str = "neovim";
const SNAP: &str = "nvim";
const APPIMAGE_STABLE_URL: &str =
    "https://github.com/neovim/neovim/releases/latest/download/nvim-linux-x86_64.appimage";
const APPIMAGE_NIGHTLY_URL: &str =
    "https://github.com/neovim/neovim/releases/download/nightly/nvim-linux-x86_64.appimage";
/// Extracted AppImage contents, kept apart from Neovim's own data directory.
const APPIMAGE_DIR: &str = ".local/lib/nvim-appimage";
const SNAP_TIMEOUT: Duration = Duration::from_secs(300);

const DEPENDENCIES: &[Dependency] = &[
    Dependency::required("git", "git", "plugin managers clone over git"),
    Dependency::required("curl", "curl", "downloads"),
    Dependency::required("build-essential", "gcc", "compiles tree-sitter parsers"),
    Dependency::optional("nodejs", "node", "language servers and plugins"),
    Dependency::optional("npm", "npm", "Node.js packages"),
    Dependency::required("python3", "python3", "Python plugins"),
    Dependency::required("python3-pip", "pip3", "Python packages"),
    Dependency::required("ripgrep", "rg", "live grep"),
    Dependency::optional("fd-find", "fdfind", "file finder"),
    Dependency::optional("fzf", "fzf", "fuzzy finder"),
    Dependency::required("unzip", "unzip", "language server archives"),
    Dependency::optional("xclip", "xclip", "system clipboard"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    AppImage,
    Ppa,
    Snap,
    Apt,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::AppImage => f.write_str("AppImage"),
            Method::Ppa => f.write_str("PPA"),
            Method::Snap => f.write_str("snap"),
            Method::Apt => f.write_str("apt"),
        }
    }
}

/// Installation methods to try, in order.
fn install_methods(system: &SystemInfo) -> Vec<Method> {
    let mut methods = Vec::with_capacity(4);
    if system.architecture == Architecture::X86_64 {
        methods.push(Method::AppImage);
    }
    if system.os_family == OsFamily::Ubuntu {
        methods.push(Method::Ppa);
    }
    methods.push(Method::Snap);
    methods.push(Method::Apt);
    methods
}

fn ppa(channel: Channel) -> &'static str {
    match channel {
        Channel::Stable => "ppa:neovim-ppa/stable",
        Channel::Nightly => "ppa:neovim-ppa/unstable",
    }
}

fn snap_channel(channel: Channel) -> &'static str {
    match channel {
        Channel::Stable => "stable",
        Channel::Nightly => "edge",
    }
}

fn local_bin(ctx: &Context<'_>) -> PathBuf {
    ctx.home(".local/bin")
}

fn appimage_link(ctx: &Context<'_>) -> PathBuf {
    local_bin(ctx).join("nvim")
}

fn appimage_installed(ctx: &Context<'_>) -> bool {
    ctx.home(APPIMAGE_DIR).exists()
        || std::fs::read_link(appimage_link(ctx))
            .map(|target| target.starts_with(ctx.home(APPIMAGE_DIR)))
            .unwrap_or(false)
}

fn snap_installed(ctx: &Context<'_>) -> bool {
    ctx.exec.check_exists("snap")
        && ctx
            .exec
            .run(&CommandSpec::new("snap").args(["list", SNAP]).probe())
            .is_success()
}

pub struct NeovimDebianInstaller {
    options: InstallOptions,
    method: Option<Method>,
}

impl NeovimDebianInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self {
            options,
            method: None,
        }
    }

    /// Downloads the AppImage into its own directory and links `nvim` into
    /// `~/.local/bin`. Extraction failure is not fatal: the image is linked
    /// directly, which then needs FUSE.
    fn install_appimage(&self, ctx: &Context<'_>) -> Result<Vec<String>, String> {
        let url = match self.options.channel {
            Channel::Stable => APPIMAGE_STABLE_URL,
            Channel::Nightly => APPIMAGE_NIGHTLY_URL,
        };
        let dir = ctx.home(APPIMAGE_DIR);
        let bin = local_bin(ctx);
        if !ctx.exec.ensure_directory(&dir) || !ctx.exec.ensure_directory(&bin) {
            return Err(format!("could not create {} or {}", dir.display(), bin.display()));
        }

        let image = dir.join("nvim.appimage");
        if !ctx.exec.download(url, &image) {
            return Err(format!("could not download {url}"));
        }
        let chmod = ctx
            .exec
            .run(&CommandSpec::new("chmod").arg("+x").path_arg(&image));
        if !chmod.is_success() {
            return Err(format!("could not make the AppImage executable: {}", chmod.summary()));
        }

        // Extraction avoids the FUSE requirement of running the image directly.
        let mut warnings = Vec::new();
        let extracted = dir.join("squashfs-root");
        ctx.exec
            .run(&CommandSpec::new("rm").arg("-rf").path_arg(&extracted));
        let extract = ctx.exec.run(
            &CommandSpec::new(image.to_string_lossy())
                .arg("--appimage-extract")
                .current_dir(&dir)
                .describe("Extracting the Neovim AppImage"),
        );
        let extracted_nvim = extracted.join("usr/bin/nvim");
        let target = if extract.is_success() && (ctx.exec.is_dry_run() || extracted_nvim.exists()) {
            ctx.exec
                .run(&CommandSpec::new("rm").arg("-f").path_arg(&image));
            extracted_nvim
        } else {
            warnings.push("AppImage extraction failed; linked the image itself, which requires FUSE".to_string());
            image
        };

        let link = ctx.exec.run(
            &CommandSpec::new("ln")
                .arg("-sf")
                .path_arg(&target)
                .path_arg(&appimage_link(ctx)),
        );
        if !link.is_success() {
            return Err(format!("could not link nvim into {}: {}", bin.display(), link.summary()));
        }
        ctx.exec.extend_search_path(&bin);
        Ok(warnings)
    }

    fn install_ppa(&self, ctx: &Context<'_>) -> Result<Vec<String>, String> {
        if !ctx.exec.check_exists("add-apt-repository")
            && !apt::install(ctx, &["software-properties-common"])
        {
            return Err("add-apt-repository is unavailable".to_string());
        }
        let added = ctx.exec.run(
            &CommandSpec::new("add-apt-repository")
                .args(["-y", ppa(self.options.channel)])
                .elevated()
                .describe("Adding the Neovim PPA"),
        );
        if !added.is_success() {
            return Err(format!("could not add {}: {}", ppa(self.options.channel), added.summary()));
        }
        if !apt::update(ctx) {
            return Err("apt-get update failed".to_string());
        }
        apt_package(ctx)
    }

    fn install_snap(&self, ctx: &Context<'_>) -> Result<Vec<String>, String> {
        if !ctx.exec.check_exists("snap") {
            return Err("snapd is not installed".to_string());
        }
        let installed = ctx.exec.run(
            &CommandSpec::new("snap")
                .args(["install", SNAP, "--classic"])
                .arg(format!("--channel={}", snap_channel(self.options.channel)))
                .elevated()
                .timeout(SNAP_TIMEOUT)
                .describe("Installing the Neovim snap"),
        );
        if !installed.is_success() {
            return Err(format!("snap install failed: {}", installed.summary()));
        }
        ctx.exec.extend_search_path(Path::new("/snap/bin"));
        Ok(Vec::new())
    }
}

fn apt_package(ctx: &Context<'_>) -> Result<Vec<String>, String> {
    if apt::install(ctx, &[PACKAGE]) {
        Ok(Vec::new())
    } else {
        Err(format!("apt-get install {PACKAGE} failed"))
    }
}

impl Installer for NeovimDebianInstaller {
    fn name(&self) -> &str {
        "Neovim"
    }

    fn binary(&self) -> &str {
        "nvim"
    }

    fn platform(&self) -> Platform {
        Platform::Debian
    }

    fn ensure_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        apt::available(ctx)
    }

    fn refresh_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        apt::update(ctx)
    }

    fn dependencies(&self) -> &'static [Dependency] {
        if self.options.install_dependencies {
            DEPENDENCIES
        } else {
            &[]
        }
    }

    fn install_dependency(&mut self, ctx: &Context<'_>, dependency: &Dependency) -> bool {
        apt::install(ctx, &[dependency.name])
    }

    fn backup_targets(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        if self.options.backup_existing {
            vec![config_dir(ctx)]
        } else {
            Vec::new()
        }
    }

    /// Walks the fallback chain. Failed methods before the one that worked
    /// become warnings; if none works, every failure is reported.
    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let mut failures = Vec::new();
        for method in install_methods(ctx.system) {
            if ctx.exec.interrupted() {
                break;
            }
            info!("Trying to install Neovim via {method}");
            let attempt = match method {
                Method::AppImage => self.install_appimage(ctx),
                Method::Ppa => self.install_ppa(ctx),
                Method::Snap => self.install_snap(ctx),
                Method::Apt => apt_package(ctx),
            };
            match attempt {
                Ok(mut warnings) => {
                    self.method = Some(method);
                    failures.append(&mut warnings);
                    return Ok(failures);
                }
                Err(e) => {
                    warn!("Neovim could not be installed via {method}: {e}");
                    failures.push(format!("{method}: {e}"));
                }
            }
        }
        Err(failures.join("; "))
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        if self.options.install_providers {
            install_providers(ctx)
        } else {
            Vec::new()
        }
    }

    fn notes(&self, ctx: &Context<'_>) -> Vec<String> {
        let mut notes = Vec::new();
        if let Some(method) = self.method {
            notes.push(format!("Neovim was installed via {method}"));
        }
        if self.method == Some(Method::AppImage) {
            let bin = local_bin(ctx);
            let on_path = std::env::var_os("PATH")
                .map(|path| std::env::split_paths(&path).any(|dir| dir == bin))
                .unwrap_or(false);
            if !on_path {
                notes.push(format!(
                    "Add {} to your PATH (the alias tool does this for you)",
                    bin.display()
                ));
            }
        }
        notes
    }
}

pub struct NeovimDebianUninstaller {
    options: UninstallOptions,
}

impl NeovimDebianUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self { options }
    }

    fn remove_appimage(&self, ctx: &Context<'_>) -> bool {
        ctx.exec
            .run(
                &CommandSpec::new("rm")
                    .arg("-rf")
                    .path_arg(&appimage_link(ctx))
                    .path_arg(&ctx.home(APPIMAGE_DIR))
                    .describe("Removing the Neovim AppImage"),
            )
            .is_success()
    }
}

impl Uninstaller for NeovimDebianUninstaller {
    fn name(&self) -> &str {
        "Neovim"
    }

    fn binary(&self) -> &str {
        "nvim"
    }

    fn platform(&self) -> Platform {
        Platform::Debian
    }

    fn is_installed(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists("nvim") || appimage_installed(ctx)
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

    /// Removes every installation found, since fallbacks may have left more
    /// than one behind.
    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let mut found = false;
        let mut failures = Vec::new();
        let mut warnings = Vec::new();

        if appimage_installed(ctx) {
            found = true;
            if !self.remove_appimage(ctx) {
                failures.push("could not remove the AppImage");
            }
        }
        if snap_installed(ctx) {
            found = true;
            let removed = ctx
                .exec
                .run(
                    &CommandSpec::new("snap")
                        .args(["remove", SNAP])
                        .elevated()
                        .timeout(SNAP_TIMEOUT),
                )
                .is_success();
            if !removed {
                failures.push("snap remove nvim failed");
            }
        }
        if apt::is_installed(ctx, PACKAGE) {
            found = true;
            if !apt::remove(ctx, &[PACKAGE], true) {
                failures.push("apt-get purge neovim failed");
            } else if !apt::autoremove(ctx) {
                warnings.push("apt-get autoremove failed; unused dependencies were left installed".to_string());
            }
        }

        if !found {
            return Err("nvim is on the PATH but was not installed by AppImage, snap or apt".to_string());
        }
        if !failures.is_empty() {
            return Err(failures.join("; "));
        }
        Ok(warnings)
    }

    fn secondary_payloads(&self, ctx: &Context<'_>) -> Vec<Payload> {
        user_payloads(ctx, &self.options)
    }

    fn cleanup(&mut self, ctx: &Context<'_>) -> Vec<String> {
        let sources = ppa_sources(Path::new(apt::SOURCES_DIR));
        if sources.is_empty() {
            return Vec::new();
        }
        let removal = ctx.exec.run(
            &CommandSpec::new("rm")
                .arg("-f")
                .args(sources.iter().map(|path| path.to_string_lossy().into_owned()))
                .elevated()
                .describe("Removing the Neovim PPA"),
        );
        if removal.is_success() {
            Vec::new()
        } else {
            vec![format!("Could not remove the Neovim PPA: {}", removal.summary())]
        }
    }
}

/// Source list files registered by `add-apt-repository` for the Neovim PPA.
fn ppa_sources(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut sources: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with("neovim-ppa"))
                .unwrap_or(false)
        })
        .collect();
    sources.sort();
    sources
}
