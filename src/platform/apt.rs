//! apt/dpkg helpers for Ubuntu and Debian.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;

use crate::exec::CommandSpec;
use crate::pipeline::{Context, scratch_dir};
use crate::system::{Architecture, SystemInfo};

const APT_TIMEOUT: Duration = Duration::from_secs(900);
pub const KEYRING_DIR: &str = "/etc/apt/keyrings";
pub const SOURCES_DIR: &str = "/etc/apt/sources.list.d";

pub fn available(ctx: &Context<'_>) -> bool {
    ctx.exec.check_exists("apt-get")
}

pub fn update(ctx: &Context<'_>) -> bool {
    let result = ctx.exec.run(
        &apt_get(&["update"])
            .describe("Updating package lists")
            .timeout(APT_TIMEOUT),
    );
    if !result.is_success() {
        warn!("apt-get update failed: {}", result.summary());
    }
    result.is_success()
}

/// `dpkg -s` answers whether a package is installed.
pub fn is_installed(ctx: &Context<'_>, package: &str) -> bool {
    ctx.exec
        .run(&CommandSpec::new("dpkg").args(["-s", package]).probe())
        .is_success()
}

pub fn install(ctx: &Context<'_>, packages: &[&str]) -> bool {
    let mut args = vec!["install", "-y"];
    args.extend_from_slice(packages);
    let result = ctx.exec.run(
        &apt_get(&args)
            .describe(format!("Installing {}", packages.join(", ")))
            .timeout(APT_TIMEOUT),
    );
    if !result.is_success() {
        warn!("apt-get install {} failed: {}", packages.join(" "), result.summary());
    }
    result.is_success()
}

pub fn remove(ctx: &Context<'_>, packages: &[&str], purge: bool) -> bool {
    let mut args = vec![if purge { "purge" } else { "remove" }, "-y"];
    args.extend_from_slice(packages);
    ctx.exec
        .run(
            &apt_get(&args)
                .describe(format!("Removing {}", packages.join(", ")))
                .timeout(APT_TIMEOUT),
        )
        .is_success()
}

pub fn autoremove(ctx: &Context<'_>) -> bool {
    ctx.exec
        .run(&apt_get(&["autoremove", "-y"]).timeout(APT_TIMEOUT))
        .is_success()
}

fn apt_get(args: &[&str]) -> CommandSpec {
    CommandSpec::new("env")
        .arg("DEBIAN_FRONTEND=noninteractive")
        .arg("apt-get")
        .args(args.iter().copied())
        .elevated()
}

/// dpkg architecture name for repository entries.
pub fn dpkg_architecture(system: &SystemInfo) -> &'static str {
    match system.architecture {
        Architecture::Arm64 => "arm64",
        Architecture::X86_64 | Architecture::Unknown => "amd64",
    }
}

/// A third-party apt repository signed by its own key.
#[derive(Debug, Clone)]
pub struct AptRepository {
    pub key_url: String,
    pub keyring: PathBuf,
    pub list_file: PathBuf,
    pub entry: String,
}

impl AptRepository {
    pub fn new(name: &str, key_url: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            key_url: key_url.into(),
            keyring: Path::new(KEYRING_DIR).join(format!("{name}.gpg")),
            list_file: Path::new(SOURCES_DIR).join(format!("{name}.list")),
            entry: entry.into(),
        }
    }

    /// Handle for an already configured repository, enough to remove it.
    pub fn named(name: &str) -> Self {
        Self::new(name, String::new(), String::new())
    }

    pub fn is_configured(&self) -> bool {
        self.list_file.exists()
    }

    /// Fetch and dearmor the signing key, then write the sources entry.
    pub fn add(&self, ctx: &Context<'_>) -> Result<(), String> {
        let keyring_dir = self.keyring.parent().unwrap_or(Path::new(KEYRING_DIR));
        run_checked(
            ctx,
            CommandSpec::new("install")
                .args(["-m", "0755", "-d"])
                .path_arg(keyring_dir)
                .elevated(),
            "create the keyring directory",
        )?;

        let scratch = scratch_dir(ctx)
            .map_err(|e| format!("Failed to create a download directory: {e}"))?;
        let downloaded_key = scratch.join("signing-key.asc");
        if !ctx.exec.download(&self.key_url, &downloaded_key) {
            return Err(format!("Failed to download signing key {}", self.key_url));
        }

        run_checked(
            ctx,
            CommandSpec::new("gpg")
                .args(["--dearmor", "--yes", "-o"])
                .path_arg(&self.keyring)
                .path_arg(&downloaded_key)
                .elevated(),
            "install the signing key",
        )?;
        run_checked(
            ctx,
            CommandSpec::new("chmod")
                .arg("a+r")
                .path_arg(&self.keyring)
                .elevated(),
            "make the signing key readable",
        )?;
        run_checked(
            ctx,
            CommandSpec::shell("printf '%s\\n' \"$1\" > \"$2\"")
                .arg(self.entry.as_str())
                .path_arg(&self.list_file)
                .elevated()
                .describe("Adding apt repository"),
            "write the repository entry",
        )
    }

    pub fn remove(&self, ctx: &Context<'_>) -> Result<(), String> {
        run_checked(
            ctx,
            CommandSpec::new("rm")
                .arg("-f")
                .path_arg(&self.list_file)
                .path_arg(&self.keyring)
                .elevated(),
            "remove the apt repository",
        )
    }
}

fn run_checked(ctx: &Context<'_>, spec: CommandSpec, action: &str) -> Result<(), String> {
    let result = ctx.exec.run(&spec);
    if result.is_success() {
        Ok(())
    } else {
        Err(format!("Failed to {action}: {}", result.summary()))
    }
}
