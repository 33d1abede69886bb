//! Visual Studio Code from Microsoft's apt repository.

use std::path::PathBuf;

use log::info;

use super::{InstallOptions, UninstallOptions, install_extensions};
use crate::exec::CommandSpec;
use crate::pipeline::{Context, Dependency, Installer, Payload, StepOutcome, Uninstaller, completed};
use crate::platform::{Platform, apt};

const PACKAGE: &str = "code";
const REPOSITORY_NAME: &str = "vscode";
const KEY_URL: &str = "https://packages.microsoft.com/keys/microsoft.asc";

const DEPENDENCIES: &[Dependency] = &[
    Dependency::required("ca-certificates", "update-ca-certificates", "TLS root certificates"),
    Dependency::required("curl", "curl", "downloads the repository key"),
    Dependency::required("gnupg", "gpg", "verifies the repository key"),
];

fn repository(ctx: &Context<'_>) -> apt::AptRepository {
    let keyring = PathBuf::from(apt::KEYRING_DIR).join(format!("{REPOSITORY_NAME}.gpg"));
    apt::AptRepository::new(
        REPOSITORY_NAME,
        KEY_URL,
        format!(
            "deb [arch={} signed-by={}] https://packages.microsoft.com/repos/code stable main",
            apt::dpkg_architecture(ctx.system),
            keyring.display()
        ),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Snap,
    Apt,
}

fn detect_source(ctx: &Context<'_>) -> Option<Source> {
    let snap = ctx.exec.check_exists("snap")
        && ctx
            .exec
            .run(&CommandSpec::new("snap").args(["list", PACKAGE]).probe())
            .is_success();
    if snap {
        return Some(Source::Snap);
    }
    apt::is_installed(ctx, PACKAGE).then_some(Source::Apt)
}

pub struct VscodeAptInstaller {
    options: InstallOptions,
}

impl VscodeAptInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self { options }
    }
}

impl Installer for VscodeAptInstaller {
    fn name(&self) -> &str {
        "Visual Studio Code"
    }

    fn binary(&self) -> &str {
        "code"
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
        DEPENDENCIES
    }

    fn install_dependency(&mut self, ctx: &Context<'_>, dependency: &Dependency) -> bool {
        apt::install(ctx, &[dependency.name])
    }

    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let repo = repository(ctx);
        if repo.is_configured() {
            info!("Microsoft repository already configured");
        } else {
            repo.add(ctx)?;
            if !apt::update(ctx) {
                return Err("apt-get update failed after adding the Microsoft repository".to_string());
            }
        }
        completed(apt::install(ctx, &["apt-transport-https", PACKAGE]), || {
            format!("apt-get install {PACKAGE} failed")
        })
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        if !self.options.install_extensions || self.options.extensions.is_empty() {
            return Vec::new();
        }
        if ctx.system.is_root {
            return vec![
                "Extensions were not installed: the code CLI refuses to run as root".to_string(),
            ];
        }
        install_extensions(ctx, "code", &self.options.extensions)
    }
}

pub struct VscodeAptUninstaller {
    options: UninstallOptions,
}

impl VscodeAptUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self { options }
    }
}

impl Uninstaller for VscodeAptUninstaller {
    fn name(&self) -> &str {
        "Visual Studio Code"
    }

    fn binary(&self) -> &str {
        "code"
    }

    fn platform(&self) -> Platform {
        Platform::Debian
    }

    fn backup_targets(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        if self.options.backup_settings && self.options.remove_settings {
            vec![ctx.home(".config/Code/User")]
        } else {
            Vec::new()
        }
    }

    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        match detect_source(ctx) {
            Some(Source::Snap) => {
                let removal = ctx.exec.run(
                    &CommandSpec::new("snap")
                        .args(["remove", PACKAGE])
                        .elevated()
                        .describe("Removing the code snap"),
                );
                completed(removal.is_success(), || {
                    format!("snap remove {PACKAGE} failed: {}", removal.summary())
                })
            }
            Some(Source::Apt) => {
                if !apt::remove(ctx, &[PACKAGE], true) {
                    return Err(format!("apt-get purge {PACKAGE} failed"));
                }
                let mut warnings = Vec::new();
                if !apt::autoremove(ctx) {
                    warnings.push("apt-get autoremove failed; unused dependencies were left installed".to_string());
                }
                Ok(warnings)
            }
            None => Err("code is on the PATH but neither snap nor dpkg manages it".to_string()),
        }
    }

    fn secondary_payloads(&self, ctx: &Context<'_>) -> Vec<Payload> {
        let mut payloads = Vec::new();
        if self.options.remove_extensions {
            payloads.push(Payload::new("extensions", vec![ctx.home(".vscode")]));
        }
        if self.options.remove_settings {
            payloads.push(Payload::new("settings", vec![ctx.home(".config/Code")]));
        }
        if self.options.remove_cache {
            payloads.push(Payload::new("cache", vec![ctx.home(".cache/Code")]));
        }
        payloads
    }

    fn cleanup(&mut self, ctx: &Context<'_>) -> Vec<String> {
        let repo = apt::AptRepository::named(REPOSITORY_NAME);
        if !repo.is_configured() {
            return Vec::new();
        }
        let mut warnings = Vec::new();
        if let Err(e) = repo.remove(ctx) {
            warnings.push(e);
        } else if !apt::update(ctx) {
            warnings.push("Package lists were not refreshed after removing the Microsoft repository".to_string());
        }
        warnings
    }
}
