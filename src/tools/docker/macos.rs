//! Docker Desktop from the official disk image.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;

use super::{InstallOptions, UninstallOptions, clean_docker_objects};
use crate::exec::CommandSpec;
use crate::pipeline::{Activation, Context, Installer, Payload, StepOutcome, Uninstaller, scratch_dir};
use crate::platform::Platform;
use crate::platform::homebrew::{BrewKind, Homebrew};
use crate::system::Architecture;

const DMG_URL_ARM64: &str = "https://desktop.docker.com/mac/main/arm64/Docker.dmg";
const DMG_URL_AMD64: &str = "https://desktop.docker.com/mac/main/amd64/Docker.dmg";
const MOUNT_POINT: &str = "/Volumes/Docker";
const APP_PATH: &str = "/Applications/Docker.app";
const APP_CLI_DIR: &str = "/Applications/Docker.app/Contents/Resources/bin";
const CLI_LINK: &str = "/usr/local/bin/docker";

const DAEMON_POLL_ATTEMPTS: u32 = 24;
const DAEMON_POLL_INTERVAL: Duration = Duration::from_secs(5);

fn dmg_url(architecture: Architecture) -> &'static str {
    match architecture {
        Architecture::Arm64 => DMG_URL_ARM64,
        Architecture::X86_64 | Architecture::Unknown => DMG_URL_AMD64,
    }
}

fn app_locations(ctx: &Context<'_>) -> [PathBuf; 2] {
    [PathBuf::from(APP_PATH), ctx.home("Applications/Docker.app")]
}

fn daemon_ready(ctx: &Context<'_>) -> bool {
    ctx.exec
        .run(
            &CommandSpec::new("docker")
                .arg("info")
                .probe()
                .timeout(Duration::from_secs(20)),
        )
        .is_success()
}

fn detach() -> CommandSpec {
    CommandSpec::new("hdiutil").args(["detach", MOUNT_POINT, "-quiet"])
}

/// Replace `/Applications/Docker.app` with the copy on the mounted image.
fn copy_app(ctx: &Context<'_>) -> Result<(), String> {
    if Path::new(APP_PATH).exists() {
        let removed = ctx
            .exec
            .run(&CommandSpec::new("rm").args(["-rf", APP_PATH]).elevated());
        if !removed.is_success() {
            return Err(format!("Could not replace {APP_PATH}: {}", removed.summary()));
        }
    }
    let copy = ctx.exec.run(
        &CommandSpec::new("cp")
            .arg("-R")
            .arg(format!("{MOUNT_POINT}/Docker.app"))
            .arg(APP_PATH)
            .elevated()
            .describe("Copying Docker.app to /Applications"),
    );
    if copy.is_success() {
        Ok(())
    } else {
        Err(format!("Could not copy Docker.app: {}", copy.summary()))
    }
}

pub struct DockerDesktopInstaller {
    options: InstallOptions,
}

impl DockerDesktopInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self { options }
    }
}

impl Installer for DockerDesktopInstaller {
    fn name(&self) -> &str {
        "Docker Desktop"
    }

    fn binary(&self) -> &str {
        "docker"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn check_existing(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists("docker") || app_locations(ctx).iter().any(|app| app.exists())
    }

    fn ensure_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists("hdiutil")
    }

    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let mut warnings = Vec::new();
        let url = dmg_url(ctx.system.architecture);
        let scratch = scratch_dir(ctx).map_err(|e| format!("Could not create a download directory: {e}"))?;
        let image = scratch.join("Docker.dmg");
        info!("Downloading Docker Desktop for {}", ctx.system.architecture);
        if !ctx.exec.download(url, &image) {
            return Err(format!(
                "Could not download {url}; get Docker Desktop from https://www.docker.com/products/docker-desktop/"
            ));
        }

        if Path::new(MOUNT_POINT).exists() {
            let stale = ctx.exec.run(&detach());
            if !stale.is_success() {
                warnings.push(format!("Could not unmount a stale {MOUNT_POINT}: {}", stale.summary()));
            }
        }
        let attach = ctx.exec.run(
            &CommandSpec::new("hdiutil")
                .arg("attach")
                .path_arg(&image)
                .args(["-nobrowse", "-quiet", "-mountpoint", MOUNT_POINT])
                .describe("Mounting the Docker Desktop image"),
        );
        if !attach.is_success() {
            return Err(format!("Could not mount the Docker Desktop image: {}", attach.summary()));
        }

        let copied = copy_app(ctx);
        let unmounted = ctx.exec.run(&detach());
        if !unmounted.is_success() {
            warnings.push(format!("Could not unmount {MOUNT_POINT}: {}", unmounted.summary()));
        }
        copied.map(|()| warnings)
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        let mut warnings = Vec::new();
        ctx.exec.extend_search_path(Path::new(APP_CLI_DIR));

        if Path::new(CLI_LINK).symlink_metadata().is_err() {
            let link = ctx.exec.run(
                &CommandSpec::new("ln")
                    .arg("-sf")
                    .arg(format!("{APP_CLI_DIR}/docker"))
                    .arg(CLI_LINK)
                    .elevated(),
            );
            if !link.is_success() {
                warnings.push(format!(
                    "Could not link the docker CLI into /usr/local/bin: {}",
                    link.summary()
                ));
            }
        }
        warnings
    }

    fn activate(&mut self, ctx: &Context<'_>) -> Activation {
        if daemon_ready(ctx) {
            return Activation::Started;
        }
        if !self.options.start_on_boot {
            return Activation::NotApplicable;
        }

        let open = ctx
            .exec
            .run(&CommandSpec::new("open").args(["-a", "Docker"]));
        if !open.is_success() {
            return Activation::Failed(format!(
                "Could not launch Docker Desktop: {}",
                open.summary()
            ));
        }

        info!("Waiting for the Docker daemon");
        for _ in 0..DAEMON_POLL_ATTEMPTS {
            if ctx.exec.interrupted() {
                break;
            }
            std::thread::sleep(DAEMON_POLL_INTERVAL);
            if daemon_ready(ctx) {
                return Activation::Started;
            }
        }
        Activation::Failed(
            "Docker Desktop was launched but the daemon is not ready yet; finish the first-run setup in the app".to_string(),
        )
    }
}

pub struct DockerDesktopUninstaller {
    options: UninstallOptions,
    brew: Homebrew,
}

impl DockerDesktopUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self {
            options,
            brew: Homebrew::new(),
        }
    }

    fn remove_cli_links(&self, ctx: &Context<'_>) -> Vec<String> {
        let mut warnings = Vec::new();
        for name in [
            "docker",
            "docker-compose",
            "docker-credential-desktop",
            "docker-credential-osxkeychain",
            "hub-tool",
            "kubectl.docker",
        ] {
            let link = Path::new("/usr/local/bin").join(name);
            let points_into_app = std::fs::read_link(&link)
                .map(|target| target.to_string_lossy().contains("Docker.app"))
                .unwrap_or(false);
            if !points_into_app {
                continue;
            }
            let removal = ctx
                .exec
                .run(&CommandSpec::new("rm").arg("-f").path_arg(&link).elevated());
            if !removal.is_success() {
                warnings.push(format!("Could not remove {}: {}", link.display(), removal.summary()));
            }
        }
        warnings
    }
}

impl Uninstaller for DockerDesktopUninstaller {
    fn name(&self) -> &str {
        "Docker Desktop"
    }

    fn binary(&self) -> &str {
        "docker"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn is_installed(&mut self, ctx: &Context<'_>) -> bool {
        ctx.exec.check_exists("docker") || app_locations(ctx).iter().any(|app| app.exists())
    }

    fn prepare(&mut self, ctx: &Context<'_>) -> Vec<String> {
        let mut warnings = clean_docker_objects(ctx, &self.options);
        let quit = ctx
            .exec
            .run(&CommandSpec::new("osascript").args(["-e", "quit app \"Docker\""]));
        if !quit.is_success() {
            warnings.push(format!("Could not quit Docker Desktop: {}", quit.summary()));
        }
        warnings
    }

    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let mut warnings = Vec::new();
        if self.brew.is_installed(ctx, "docker", BrewKind::Cask) {
            if self.brew.uninstall(ctx, "docker", BrewKind::Cask) {
                warnings.extend(self.remove_cli_links(ctx));
                return Ok(warnings);
            }
            warnings.push("Homebrew could not remove Docker Desktop; removed the application manually".to_string());
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
        warnings.extend(self.remove_cli_links(ctx));
        Ok(warnings)
    }

    fn secondary_payloads(&self, ctx: &Context<'_>) -> Vec<Payload> {
        if !self.options.remove_config {
            return Vec::new();
        }
        let library = [
            "Library/Group Containers/group.com.docker",
            "Library/Containers/com.docker.docker",
            "Library/Application Support/Docker Desktop",
            "Library/Preferences/com.docker.docker.plist",
            "Library/Saved Application State/com.electron.docker-frontend.savedState",
            "Library/Logs/Docker Desktop",
            "Library/Cookies/com.docker.docker.binarycookies",
        ];
        vec![
            Payload::new("configuration", vec![ctx.home(".docker")]),
            Payload::new(
                "application data",
                library.iter().map(|relative| ctx.home(relative)).collect(),
            ),
        ]
    }

    fn still_present(&mut self, ctx: &Context<'_>) -> bool {
        app_locations(ctx).iter().any(|app| app.exists())
    }
}
