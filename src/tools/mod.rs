//! Concrete tool modules.
//!
//! Every tool has a macOS and a Debian-family implementation of the installer
//! and uninstaller hooks. The closed set of tools and their options lives in
//! [`ToolKind`], [`InstallRequest`] and [`UninstallRequest`].

pub mod alias;
pub mod docker;
pub mod fonts;
pub mod neovim;
pub mod vscode;
pub mod zsh;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::BootstrapConfig;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Docker,
    #[value(alias = "code")]
    Vscode,
    #[value(alias = "nvim")]
    Neovim,
    #[value(alias = "oh-my-zsh")]
    Zsh,
    #[value(alias = "nerd-fonts")]
    Fonts,
    Alias,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Docker,
        ToolKind::Vscode,
        ToolKind::Neovim,
        ToolKind::Zsh,
        ToolKind::Fonts,
        ToolKind::Alias,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolKind::Docker => "Docker",
            ToolKind::Vscode => "Visual Studio Code",
            ToolKind::Neovim => "Neovim",
            ToolKind::Zsh => "Zsh + Oh My Zsh",
            ToolKind::Fonts => "Nerd Fonts",
            ToolKind::Alias => "Command alias",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            ToolKind::Docker => "Container runtime (Docker Desktop or Docker Engine)",
            ToolKind::Vscode => "Code editor with a starter set of extensions",
            ToolKind::Neovim => "Terminal editor with language providers and search tools",
            ToolKind::Zsh => "Shell, Oh My Zsh framework, plugins and theme",
            ToolKind::Fonts => "Patched programming fonts with terminal glyphs",
            ToolKind::Alias => "Put this tool on your PATH as a shell command",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What to install, with the options for that tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallRequest {
    Docker(docker::InstallOptions),
    Vscode(vscode::InstallOptions),
    Neovim(neovim::InstallOptions),
    Zsh(zsh::InstallOptions),
    Fonts(fonts::InstallOptions),
    Alias(alias::InstallOptions),
}

impl InstallRequest {
    /// Request for `kind` carrying the configured default options.
    pub fn from_config(kind: ToolKind, config: &BootstrapConfig) -> Self {
        let defaults = &config.install;
        match kind {
            ToolKind::Docker => InstallRequest::Docker(defaults.docker.clone()),
            ToolKind::Vscode => InstallRequest::Vscode(defaults.vscode.clone()),
            ToolKind::Neovim => InstallRequest::Neovim(defaults.neovim.clone()),
            ToolKind::Zsh => InstallRequest::Zsh(defaults.zsh.clone()),
            ToolKind::Fonts => InstallRequest::Fonts(defaults.fonts.clone()),
            ToolKind::Alias => InstallRequest::Alias(defaults.alias.clone()),
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            InstallRequest::Docker(_) => ToolKind::Docker,
            InstallRequest::Vscode(_) => ToolKind::Vscode,
            InstallRequest::Neovim(_) => ToolKind::Neovim,
            InstallRequest::Zsh(_) => ToolKind::Zsh,
            InstallRequest::Fonts(_) => ToolKind::Fonts,
            InstallRequest::Alias(_) => ToolKind::Alias,
        }
    }
}

/// What to remove, with the options for that tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallRequest {
    Docker(docker::UninstallOptions),
    Vscode(vscode::UninstallOptions),
    Neovim(neovim::UninstallOptions),
    Zsh(zsh::UninstallOptions),
    Fonts(fonts::UninstallOptions),
    Alias(alias::UninstallOptions),
}

impl UninstallRequest {
    pub fn from_config(kind: ToolKind, config: &BootstrapConfig) -> Self {
        let defaults = &config.uninstall;
        match kind {
            ToolKind::Docker => UninstallRequest::Docker(defaults.docker.clone()),
            ToolKind::Vscode => UninstallRequest::Vscode(defaults.vscode.clone()),
            ToolKind::Neovim => UninstallRequest::Neovim(defaults.neovim.clone()),
            ToolKind::Zsh => UninstallRequest::Zsh(defaults.zsh.clone()),
            ToolKind::Fonts => UninstallRequest::Fonts(defaults.fonts.clone()),
            ToolKind::Alias => UninstallRequest::Alias(defaults.alias.clone()),
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            UninstallRequest::Docker(_) => ToolKind::Docker,
            UninstallRequest::Vscode(_) => ToolKind::Vscode,
            UninstallRequest::Neovim(_) => ToolKind::Neovim,
            UninstallRequest::Zsh(_) => ToolKind::Zsh,
            UninstallRequest::Fonts(_) => ToolKind::Fonts,
            UninstallRequest::Alias(_) => ToolKind::Alias,
        }
    }
}
