//! Default per-tool options, read from an optional TOML file.
//!
//! ```toml
//! command_timeout_secs = 1800
//!
//! [install.neovim]
//! channel = "nightly"
//!
//! [uninstall.vscode]
//! remove_settings = true
//! ```
//!
//! Every key is optional. The file is never written by the tool.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::BootstrapError;
use crate::tools::{alias, docker, fonts, neovim, vscode, zsh};

const APP_DIR: &str = "devbootstrap";
const FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Cap for commands that do not set their own timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
    pub install: InstallDefaults,
    pub uninstall: UninstallDefaults,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallDefaults {
    pub docker: docker::InstallOptions,
    pub vscode: vscode::InstallOptions,
    pub neovim: neovim::InstallOptions,
    pub zsh: zsh::InstallOptions,
    pub fonts: fonts::InstallOptions,
    pub alias: alias::InstallOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UninstallDefaults {
    pub docker: docker::UninstallOptions,
    pub vscode: vscode::UninstallOptions,
    pub neovim: neovim::UninstallOptions,
    pub zsh: zsh::UninstallOptions,
    pub fonts: fonts::UninstallOptions,
    pub alias: alias::UninstallOptions,
}

impl BootstrapConfig {
    /// `$XDG_CONFIG_HOME/devbootstrap/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Load `path`, or the default location when `None`.
    ///
    /// An explicit path must exist; a missing file at the default location
    /// means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, BootstrapError> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                Some(path) => {
                    debug!("No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
                None => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, BootstrapError> {
        let text = fs::read_to_string(path).map_err(|source| BootstrapError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text).map_err(|source| BootstrapError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Using config from {}", path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml(&self) -> Result<String, BootstrapError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
