//! Visual Studio Code: the Homebrew cask on macOS, Microsoft's apt repository
//! on Ubuntu and Debian.

pub mod debian;
pub mod macos;

use serde::{Deserialize, Serialize};

use crate::exec::CommandSpec;
use crate::pipeline::Context;

/// Extensions offered by default, with their marketplace names.
pub const DEFAULT_EXTENSIONS: &[(&str, &str)] = &[
    ("ms-python.python", "Python"),
    ("esbenp.prettier-vscode", "Prettier - Code formatter"),
    ("dbaeumer.vscode-eslint", "ESLint"),
    ("ms-vscode.vscode-typescript-next", "TypeScript"),
    ("bradlc.vscode-tailwindcss", "Tailwind CSS IntelliSense"),
    ("eamodio.gitlens", "GitLens"),
    ("pkief.material-icon-theme", "Material Icon Theme"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    pub install_extensions: bool,
    /// Marketplace identifiers such as `ms-python.python`.
    pub extensions: Vec<String>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            install_extensions: true,
            extensions: DEFAULT_EXTENSIONS
                .iter()
                .map(|(id, _)| id.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UninstallOptions {
    pub remove_extensions: bool,
    pub remove_settings: bool,
    pub remove_cache: bool,
    /// Copy the settings directory aside before anything is removed.
    pub backup_settings: bool,
}

impl Default for UninstallOptions {
    fn default() -> Self {
        Self {
            remove_extensions: false,
            remove_settings: false,
            remove_cache: true,
            backup_settings: true,
        }
    }
}

/// Install each extension through the `code` CLI. One warning per failure.
fn install_extensions(ctx: &Context<'_>, code: &str, extensions: &[String]) -> Vec<String> {
    let mut warnings = Vec::new();
    for extension in extensions {
        if ctx.exec.interrupted() {
            break;
        }
        let result = ctx.exec.run(
            &CommandSpec::new(code)
                .args(["--install-extension", extension.as_str(), "--force"])
                .describe(format!("Installing extension {extension}")),
        );
        if !result.is_success() {
            warnings.push(format!(
                "Could not install extension {extension}: {}",
                result.summary()
            ));
        }
    }
    warnings
}
