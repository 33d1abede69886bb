//! Platform selection and the package managers each platform relies on.
//!
//! The selector is an exhaustive match over (request, platform): adding a tool
//! or a platform without wiring every combination fails to compile.

pub mod apt;
pub mod homebrew;
pub mod systemd;

use std::fmt;

use serde::Serialize;

use crate::pipeline::{Installer, Uninstaller};
use crate::system::{OsFamily, SystemInfo};
use crate::tools::{
    InstallRequest, UninstallRequest, alias, docker, fonts, neovim, vscode, zsh,
};

/// Implementation family a tool module provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    MacOs,
    /// Ubuntu and Debian.
    Debian,
}

impl Platform {
    pub fn for_system(system: &SystemInfo) -> Option<Self> {
        match system.os_family {
            OsFamily::MacOs => Some(Platform::MacOs),
            OsFamily::Ubuntu | OsFamily::Debian => Some(Platform::Debian),
            OsFamily::OtherLinux | OsFamily::Unsupported => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MacOs => f.write_str("macOS"),
            Platform::Debian => f.write_str("Ubuntu/Debian"),
        }
    }
}

/// Installer for `request` on this host, or `None` when the host is not
/// supported.
pub fn select_installer(request: InstallRequest, system: &SystemInfo) -> Option<Box<dyn Installer>> {
    let platform = Platform::for_system(system)?;
    let installer: Box<dyn Installer> = match (request, platform) {
        (InstallRequest::Docker(options), Platform::MacOs) => {
            Box::new(docker::macos::DockerDesktopInstaller::new(options))
        }
        (InstallRequest::Docker(options), Platform::Debian) => {
            Box::new(docker::debian::DockerEngineInstaller::new(options))
        }
        (InstallRequest::Vscode(options), Platform::MacOs) => {
            Box::new(vscode::macos::VscodeCaskInstaller::new(options))
        }
        (InstallRequest::Vscode(options), Platform::Debian) => {
            Box::new(vscode::debian::VscodeAptInstaller::new(options))
        }
        (InstallRequest::Neovim(options), Platform::MacOs) => {
            Box::new(neovim::macos::NeovimBrewInstaller::new(options))
        }
        (InstallRequest::Neovim(options), Platform::Debian) => {
            Box::new(neovim::debian::NeovimDebianInstaller::new(options))
        }
        (InstallRequest::Zsh(options), Platform::MacOs) => {
            Box::new(zsh::macos::ZshBrewInstaller::new(options))
        }
        (InstallRequest::Zsh(options), Platform::Debian) => {
            Box::new(zsh::debian::ZshAptInstaller::new(options))
        }
        (InstallRequest::Fonts(options), Platform::MacOs) => {
            Box::new(fonts::macos::FontCaskInstaller::new(options))
        }
        (InstallRequest::Fonts(options), Platform::Debian) => {
            Box::new(fonts::debian::FontArchiveInstaller::new(options))
        }
        (InstallRequest::Alias(options), platform) => {
            Box::new(alias::AliasInstaller::new(options, platform))
        }
    };
    Some(installer)
}

/// Uninstaller for `request` on this host, or `None` when the host is not
/// supported.
pub fn select_uninstaller(
    request: UninstallRequest,
    system: &SystemInfo,
) -> Option<Box<dyn Uninstaller>> {
    let platform = Platform::for_system(system)?;
    let uninstaller: Box<dyn Uninstaller> = match (request, platform) {
        (UninstallRequest::Docker(options), Platform::MacOs) => {
            Box::new(docker::macos::DockerDesktopUninstaller::new(options))
        }
        (UninstallRequest::Docker(options), Platform::Debian) => {
            Box::new(docker::debian::DockerEngineUninstaller::new(options))
        }
        (UninstallRequest::Vscode(options), Platform::MacOs) => {
            Box::new(vscode::macos::VscodeCaskUninstaller::new(options))
        }
        (UninstallRequest::Vscode(options), Platform::Debian) => {
            Box::new(vscode::debian::VscodeAptUninstaller::new(options))
        }
        (UninstallRequest::Neovim(options), Platform::MacOs) => {
            Box::new(neovim::macos::NeovimBrewUninstaller::new(options))
        }
        (UninstallRequest::Neovim(options), Platform::Debian) => {
            Box::new(neovim::debian::NeovimDebianUninstaller::new(options))
        }
        (UninstallRequest::Zsh(options), Platform::MacOs) => {
            Box::new(zsh::macos::ZshBrewUninstaller::new(options))
        }
        (UninstallRequest::Zsh(options), Platform::Debian) => {
            Box::new(zsh::debian::ZshAptUninstaller::new(options))
        }
        (UninstallRequest::Fonts(options), Platform::MacOs) => {
            Box::new(fonts::macos::FontCaskUninstaller::new(options))
        }
        (UninstallRequest::Fonts(options), Platform::Debian) => {
            Box::new(fonts::debian::FontArchiveUninstaller::new(options))
        }
        (UninstallRequest::Alias(options), platform) => {
            Box::new(alias::AliasUninstaller::new(options, platform))
        }
    };
    Some(uninstaller)
}
