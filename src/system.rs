//! Host detection: operating system family, architecture, privileges.
//!
//! [`SystemInfo::detect`] is called once per run and the result is passed by
//! reference to everything that needs it.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::{debug, warn};
use serde::Serialize;

/// Operating system families the bootstrapper distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OsFamily {
    MacOs,
    Ubuntu,
    Debian,
    OtherLinux,
    Unsupported,
}

impl OsFamily {
    /// Ubuntu and Debian share the apt based implementations.
    pub fn is_debian_family(self) -> bool {
        matches!(self, OsFamily::Ubuntu | OsFamily::Debian)
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OsFamily::MacOs => "macOS",
            OsFamily::Ubuntu => "Ubuntu",
            OsFamily::Debian => "Debian",
            OsFamily::OtherLinux => "Linux (other)",
            OsFamily::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Architecture {
    Arm64,
    X86_64,
    Unknown,
}

impl Architecture {
    /// Normalize a raw machine name (`uname -m` or `std::env::consts::ARCH`).
    pub fn from_machine(machine: &str) -> Self {
        match machine.trim().to_ascii_lowercase().as_str() {
            "arm64" | "aarch64" => Architecture::Arm64,
            "x86_64" | "amd64" => Architecture::X86_64,
            _ => Architecture::Unknown,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::Arm64 => "arm64",
            Architecture::X86_64 => "x86_64",
            Architecture::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Immutable snapshot of the host taken at startup.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os_family: OsFamily,
    pub os_name: String,
    pub os_version: String,
    /// Release codename (`VERSION_CODENAME`), Debian family only.
    pub os_codename: Option<String>,
    pub architecture: Architecture,
    pub home_dir: PathBuf,
    pub is_root: bool,
    /// `sudo` exists and accepts a non-interactive invocation.
    pub has_sudo: bool,
}

impl SystemInfo {
    pub fn detect() -> Self {
        let (os_family, os_name, os_version, os_codename) = match std::env::consts::OS {
            "macos" => (
                OsFamily::MacOs,
                "macOS".to_string(),
                macos_product_version().unwrap_or_else(|| "unknown".to_string()),
                None,
            ),
            "linux" => {
                let release = std::fs::read_to_string("/etc/os-release")
                    .map(|text| OsRelease::parse(&text))
                    .unwrap_or_default();
                (
                    release.family(),
                    release.name.clone().unwrap_or_else(|| "Linux".to_string()),
                    release
                        .version_id
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                    release.version_codename.clone(),
                )
            }
            other => (
                OsFamily::Unsupported,
                other.to_string(),
                "unknown".to_string(),
                None,
            ),
        };

        let home_dir = dirs::home_dir().unwrap_or_else(|| {
            warn!("Could not determine the home directory, falling back to /");
            PathBuf::from("/")
        });

        let info = Self {
            os_family,
            os_name,
            os_version,
            os_codename,
            architecture: Architecture::from_machine(std::env::consts::ARCH),
            home_dir,
            is_root: is_root(),
            has_sudo: has_passwordless_sudo(),
        };
        debug!("Detected system: {info}");
        info
    }

    pub fn is_supported(&self) -> bool {
        matches!(
            self.os_family,
            OsFamily::MacOs | OsFamily::Ubuntu | OsFamily::Debian
        )
    }

    pub fn is_macos(&self) -> bool {
        self.os_family == OsFamily::MacOs
    }

    /// Path below the user's home directory.
    pub fn home(&self, relative: &str) -> PathBuf {
        self.home_dir.join(relative)
    }

    /// Login name of the invoking user, looking through `sudo`.
    pub fn user_name(&self) -> Option<String> {
        ["SUDO_USER", "USER", "LOGNAME"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|name| !name.is_empty() && name != "root")
    }
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {})",
            self.os_name, self.os_version, self.os_family, self.architecture
        )
    }
}

/// Fields of `/etc/os-release` the probe cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version_id: Option<String>,
    pub version_codename: Option<String>,
}

impl OsRelease {
    pub fn parse(text: &str) -> Self {
        let mut release = OsRelease::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
            match key.trim() {
                "ID" => release.id = Some(value),
                "NAME" => release.name = Some(value),
                "VERSION_ID" => release.version_id = Some(value),
                "VERSION_CODENAME" => release.version_codename = Some(value),
                _ => {}
            }
        }
        release
    }

    /// `ID` decides; `NAME` is the fallback for files without an `ID`.
    pub fn family(&self) -> OsFamily {
        let id = self.id.as_deref().unwrap_or_default().to_ascii_lowercase();
        match id.as_str() {
            "ubuntu" => return OsFamily::Ubuntu,
            "debian" => return OsFamily::Debian,
            "" => {}
            _ => return OsFamily::OtherLinux,
        }
        let name = self.name.as_deref().unwrap_or_default().to_ascii_lowercase();
        if name.contains("ubuntu") {
            OsFamily::Ubuntu
        } else if name.contains("debian") {
            OsFamily::Debian
        } else {
            OsFamily::OtherLinux
        }
    }
}

fn macos_product_version() -> Option<String> {
    let output = Command::new("sw_vers")
        .arg("-productVersion")
        .stderr(Stdio::null())
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn is_root() -> bool {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            nix::unistd::geteuid().is_root()
        } else {
            false
        }
    }
}

fn has_passwordless_sudo() -> bool {
    if which::which("sudo").is_err() {
        return false;
    }
    Command::new("sudo")
        .args(["-n", "true"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) fn test_system(os_family: OsFamily, home_dir: PathBuf) -> SystemInfo {
    SystemInfo {
        os_family,
        os_name: os_family.to_string(),
        os_version: "test".to_string(),
        os_codename: None,
        architecture: Architecture::X86_64,
        home_dir,
        is_root: false,
        has_sudo: true,
    }
}
