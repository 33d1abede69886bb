//! Neovim with the search tools and language providers common plugin
//! setups expect.

pub mod debian;
pub mod macos;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::exec::CommandSpec;
use crate::pipeline::{Context, Payload};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Stable,
    Nightly,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Stable => f.write_str("stable"),
            Channel::Nightly => f.write_str("nightly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    pub install_dependencies: bool,
    /// Copy `~/.config/nvim` aside before installing.
    pub backup_existing: bool,
    pub channel: Channel,
    /// pynvim and the `neovim` npm package.
    pub install_providers: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            install_dependencies: true,
            backup_existing: true,
            channel: Channel::Stable,
            install_providers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UninstallOptions {
    pub remove_config: bool,
    pub remove_data: bool,
    pub remove_cache: bool,
    pub backup_config: bool,
    /// Uninstall pynvim and the `neovim` npm package as well.
    pub remove_providers: bool,
}

impl Default for UninstallOptions {
    fn default() -> Self {
        Self {
            remove_config: false,
            remove_data: true,
            remove_cache: true,
            backup_config: true,
            remove_providers: false,
        }
    }
}

fn config_dir(ctx: &Context<'_>) -> PathBuf {
    ctx.home(".config/nvim")
}

fn data_dirs(ctx: &Context<'_>) -> Vec<PathBuf> {
    vec![ctx.home(".local/share/nvim"), ctx.home(".local/state/nvim")]
}

fn cache_dir(ctx: &Context<'_>) -> PathBuf {
    ctx.home(".cache/nvim")
}

/// Python and Node.js providers. A missing npm skips the Node provider
/// silently; every other failure is one warning.
fn install_providers(ctx: &Context<'_>) -> Vec<String> {
    let mut warnings = Vec::new();

    if ctx.exec.check_exists("pip3") {
        // PEP 668 distributions refuse user installs without the override.
        let managed = ctx.exec.run(
            &CommandSpec::new("pip3")
                .args(["install", "--user", "--break-system-packages", "pynvim"])
                .describe("Installing the Python provider"),
        );
        if !managed.is_success() {
            let plain = ctx.exec.run(
                &CommandSpec::new("pip3").args(["install", "--user", "pynvim"]),
            );
            if !plain.is_success() {
                warnings.push(format!("Python provider not installed: {}", plain.summary()));
            }
        }
    } else {
        warnings.push("Python provider not installed: pip3 is missing".to_string());
    }

    if ctx.exec.check_exists("npm") {
        let node = ctx.exec.run(
            &CommandSpec::new("npm")
                .args(["install", "-g", "neovim"])
                .elevated_if(!ctx.system.is_macos())
                .describe("Installing the Node.js provider"),
        );
        if !node.is_success() {
            warnings.push(format!("Node.js provider not installed: {}", node.summary()));
        }
    }
    warnings
}

fn remove_providers(ctx: &Context<'_>) -> Vec<String> {
    let mut warnings = Vec::new();
    if ctx.exec.check_exists("pip3") {
        let python = ctx
            .exec
            .run(&CommandSpec::new("pip3").args(["uninstall", "-y", "pynvim"]));
        if !python.is_success() {
            warnings.push(format!("Could not remove the Python provider: {}", python.summary()));
        }
    }
    if ctx.exec.check_exists("npm") {
        let node = ctx.exec.run(
            &CommandSpec::new("npm")
                .args(["uninstall", "-g", "neovim"])
                .elevated_if(!ctx.system.is_macos()),
        );
        if !node.is_success() {
            warnings.push(format!("Could not remove the Node.js provider: {}", node.summary()));
        }
    }
    warnings
}

/// Payloads shared by both platforms, filtered by the options.
fn user_payloads(ctx: &Context<'_>, options: &UninstallOptions) -> Vec<Payload> {
    let mut payloads = Vec::new();
    if options.remove_config {
        payloads.push(Payload::new("configuration", vec![config_dir(ctx)]));
    }
    if options.remove_data {
        payloads.push(Payload::new("plugin data", data_dirs(ctx)));
    }
    if options.remove_cache {
        payloads.push(Payload::new("cache", vec![cache_dir(ctx)]));
    }
    payloads
}

fn config_backup(ctx: &Context<'_>, options: &UninstallOptions) -> Vec<PathBuf> {
    if options.backup_config && options.remove_config {
        vec![config_dir(ctx)]
    } else {
        Vec::new()
    }
}
