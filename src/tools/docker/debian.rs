//! Docker Engine from Docker's apt repository.

use std::path::PathBuf;

use log::{info, warn};

use super::{InstallOptions, UninstallOptions, clean_docker_objects};
use crate::exec::CommandSpec;
use crate::pipeline::{Activation, Context, Dependency, Installer, Payload, StepOutcome, Uninstaller};
use crate::platform::{Platform, apt, systemd};
use crate::system::{OsFamily, SystemInfo};

const DEPENDENCIES: &[Dependency] = &[
    Dependency::required("ca-certificates", "update-ca-certificates", "TLS root certificates"),
    Dependency::required("curl", "curl", "downloads the repository key"),
    Dependency::required("gnupg", "gpg", "verifies the repository key"),
    Dependency::optional("lsb-release", "lsb_release", "reports the release codename"),
];

/// Distribution packages that conflict with Docker's own.
const CONFLICTING_PACKAGES: &[&str] = &[
    "docker.io",
    "docker-doc",
    "docker-compose",
    "podman-docker",
    "containerd",
    "runc",
];

const ENGINE_PACKAGES: &[&str] = &[
    "docker-ce",
    "docker-ce-cli",
    "containerd.io",
    "docker-buildx-plugin",
];
const COMPOSE_PACKAGE: &str = "docker-compose-plugin";
const EXTRA_PACKAGES: &[&str] = &["docker-ce-rootless-extras"];

const UNITS: &[&str] = &["docker.service", "containerd.service"];

fn distro(system: &SystemInfo) -> &'static str {
    if system.os_family == OsFamily::Debian {
        "debian"
    } else {
        "ubuntu"
    }
}

fn codename(ctx: &Context<'_>) -> String {
    if let Some(codename) = ctx.system.os_codename.as_deref().filter(|c| !c.is_empty()) {
        return codename.to_string();
    }
    let probe = ctx
        .exec
        .run(&CommandSpec::new("lsb_release").arg("-cs").probe());
    let reported = probe.stdout().trim();
    if probe.is_success() && !reported.is_empty() {
        return reported.to_string();
    }
    let fallback = if ctx.system.os_family == OsFamily::Debian {
        "bookworm"
    } else {
        "jammy"
    };
    warn!("Could not determine the release codename, assuming {fallback}");
    fallback.to_string()
}

fn repository(ctx: &Context<'_>) -> apt::AptRepository {
    let distro = distro(ctx.system);
    let keyring = PathBuf::from(apt::KEYRING_DIR).join("docker.gpg");
    apt::AptRepository::new(
        "docker",
        format!("https://download.docker.com/linux/{distro}/gpg"),
        format!(
            "deb [arch={} signed-by={}] https://download.docker.com/linux/{distro} {} stable",
            apt::dpkg_architecture(ctx.system),
            keyring.display(),
            codename(ctx)
        ),
    )
}

pub struct DockerEngineInstaller {
    options: InstallOptions,
    group_member: Option<String>,
}

impl DockerEngineInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self {
            options,
            group_member: None,
        }
    }

    fn add_to_docker_group(&mut self, ctx: &Context<'_>) -> Result<(), String> {
        let Some(user) = ctx.system.user_name() else {
            return Err("Could not determine which user to add to the docker group".to_string());
        };
        let group_exists = ctx
            .exec
            .run(&CommandSpec::new("getent").args(["group", "docker"]).probe())
            .is_success();
        if !group_exists {
            let created = ctx
                .exec
                .run(&CommandSpec::new("groupadd").arg("docker").elevated());
            if !created.is_success() {
                return Err(format!("Could not create the docker group: {}", created.summary()));
            }
        }
        let added = ctx.exec.run(
            &CommandSpec::new("usermod")
                .args(["-aG", "docker", user.as_str()])
                .elevated(),
        );
        if !added.is_success() {
            return Err(format!(
                "Could not add {user} to the docker group: {}",
                added.summary()
            ));
        }
        self.group_member = Some(user);
        Ok(())
    }
}

impl Installer for DockerEngineInstaller {
    fn name(&self) -> &str {
        "Docker Engine"
    }

    fn binary(&self) -> &str {
        "docker"
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
        let mut warnings = Vec::new();
        let conflicting: Vec<&str> = CONFLICTING_PACKAGES
            .iter()
            .copied()
            .filter(|package| apt::is_installed(ctx, package))
            .collect();
        if !conflicting.is_empty() {
            info!("Removing conflicting packages: {}", conflicting.join(", "));
            if !apt::remove(ctx, &conflicting, false) {
                warnings.push(format!(
                    "Could not remove {}; the Docker packages may conflict",
                    conflicting.join(", ")
                ));
            }
        }

        repository(ctx).add(ctx)?;
        if !apt::update(ctx) {
            return Err("apt-get update failed after adding the Docker repository".to_string());
        }

        let mut packages = ENGINE_PACKAGES.to_vec();
        if self.options.install_compose {
            packages.push(COMPOSE_PACKAGE);
        }
        if !apt::install(ctx, &packages) {
            return Err(format!("apt-get install {} failed", packages.join(" ")));
        }
        Ok(warnings)
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.options.install_compose {
            let compose = ctx
                .exec
                .run(&CommandSpec::new("docker").args(["compose", "version"]).probe());
            if !compose.is_success() && !apt::install(ctx, &[COMPOSE_PACKAGE]) {
                warnings.push("Docker Compose plugin could not be installed".to_string());
            }
        }

        if self.options.add_user_to_group
            && let Err(e) = self.add_to_docker_group(ctx)
        {
            warnings.push(e);
        }

        if self.options.start_on_boot {
            for unit in UNITS {
                if let Err(e) = systemd::enable(ctx, unit) {
                    warnings.push(e);
                }
            }
        }
        warnings
    }

    fn activate(&mut self, ctx: &Context<'_>) -> Activation {
        if systemd::is_active(ctx, "docker") {
            return Activation::Started;
        }
        match systemd::start(ctx, "docker") {
            Ok(()) => Activation::Started,
            Err(e) => Activation::Failed(e),
        }
    }

    fn notes(&self, _ctx: &Context<'_>) -> Vec<String> {
        match &self.group_member {
            Some(user) => vec![format!(
                "{user} was added to the docker group; log out and back in (or run `newgrp docker`) to use docker without sudo"
            )],
            None => Vec::new(),
        }
    }
}

pub struct DockerEngineUninstaller {
    options: UninstallOptions,
}

impl DockerEngineUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self { options }
    }
}

impl Uninstaller for DockerEngineUninstaller {
    fn name(&self) -> &str {
        "Docker Engine"
    }

    fn binary(&self) -> &str {
        "docker"
    }

    fn platform(&self) -> Platform {
        Platform::Debian
    }

    fn prepare(&mut self, ctx: &Context<'_>) -> Vec<String> {
        let mut warnings = clean_docker_objects(ctx, &self.options);
        for unit in ["docker.socket", "docker.service", "containerd.service"] {
            if systemd::is_active(ctx, unit)
                && let Err(e) = systemd::stop(ctx, unit)
            {
                warnings.push(e);
            }
        }
        for unit in UNITS {
            if let Err(e) = systemd::disable(ctx, unit) {
                warnings.push(e);
            }
        }
        warnings
    }

    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let installed: Vec<&str> = ENGINE_PACKAGES
            .iter()
            .chain([COMPOSE_PACKAGE].iter())
            .chain(EXTRA_PACKAGES)
            .copied()
            .filter(|package| apt::is_installed(ctx, package))
            .collect();
        if installed.is_empty() {
            return Err("No Docker packages are registered with dpkg".to_string());
        }
        if !apt::remove(ctx, &installed, true) {
            return Err(format!("apt-get purge {} failed", installed.join(" ")));
        }
        let mut warnings = Vec::new();
        if !apt::autoremove(ctx) {
            warnings.push("apt-get autoremove failed; unused dependencies were left installed".to_string());
        }
        Ok(warnings)
    }

    fn secondary_payloads(&self, ctx: &Context<'_>) -> Vec<Payload> {
        let mut payloads = Vec::new();
        if self.options.remove_config {
            payloads.push(Payload::new("configuration", vec![ctx.home(".docker")]));
        }
        if self.options.remove_data {
            payloads.push(
                Payload::new(
                    "engine data",
                    vec![
                        PathBuf::from("/var/lib/docker"),
                        PathBuf::from("/var/lib/containerd"),
                    ],
                )
                .elevated(),
            );
        }
        payloads
    }

    fn cleanup(&mut self, ctx: &Context<'_>) -> Vec<String> {
        let repo = apt::AptRepository::named("docker");
        if !repo.is_configured() {
            return Vec::new();
        }
        match repo.remove(ctx) {
            Ok(()) => Vec::new(),
            Err(e) => vec![e],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::scripted::ScriptedExecutor;
    use crate::pipeline::{AssumeDefaults, run_install, run_uninstall};
    use crate::system::test_system;

    fn apt_host() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .with_binary("apt-get")
            .with_binary("curl")
            .with_binary("gpg")
            .with_binary("update-ca-certificates")
            .with_binary("lsb_release")
    }

    #[test]
    fn repository_entry_uses_distro_arch_and_codename() {
        let exec = ScriptedExecutor::new();
        let mut system = test_system(OsFamily::Debian, PathBuf::from("/home/dev"));
        system.os_codename = Some("trixie".to_string());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let repo = repository(&ctx);
        assert_eq!(repo.key_url, "https://download.docker.com/linux/debian/gpg");
        assert_eq!(
            repo.entry,
            "deb [arch=amd64 signed-by=/etc/apt/keyrings/docker.gpg] https://download.docker.com/linux/debian trixie stable"
        );
    }

    #[test]
    fn codename_falls_back_to_lsb_release() {
        let exec = ScriptedExecutor::new();
        exec.respond(
            "lsb_release -cs",
            crate::exec::CommandResult::completed(0, "noble\n", ""),
        );
        let system = test_system(OsFamily::Ubuntu, PathBuf::from("/home/dev"));
        let ctx = Context::new(&exec, &system, &AssumeDefaults);
        assert_eq!(codename(&ctx), "noble");
    }

    #[test]
    fn group_failure_is_a_warning() {
        let exec = ScriptedExecutor::new()
            .with_binary("apt-get")
            .with_binary("curl")
            .with_binary("gpg")
            .with_binary("update-ca-certificates")
            .with_binary("lsb_release");
        exec.installs_binary("env DEBIAN_FRONTEND=noninteractive apt-get install -y docker-ce", "docker");
        exec.fail("dpkg -s");
        exec.fail("usermod");
        let system = test_system(OsFamily::Ubuntu, PathBuf::from("/home/dev"));
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut DockerEngineInstaller::new(InstallOptions::default()), &ctx);
        assert!(result.success, "{result:?}");
        assert_eq!(result.warnings.len(), 1, "{:?}", result.warnings);
        assert!(result.warnings[0].contains("docker group"));
        assert!(result.notes.is_empty());
        assert!(exec.ran("env DEBIAN_FRONTEND=noninteractive apt-get install -y docker-ce docker-ce-cli containerd.io docker-buildx-plugin docker-compose-plugin"));
        assert!(!exec.ran("env DEBIAN_FRONTEND=noninteractive apt-get remove"));
    }

    #[test]
    fn conflicting_package_removal_failure_is_a_warning() {
        let exec = apt_host();
        exec.installs_binary("env DEBIAN_FRONTEND=noninteractive apt-get install -y docker-ce", "docker");
        exec.fail("dpkg -s");
        exec.respond("dpkg -s docker.io", crate::exec::CommandResult::completed(0, "", ""));
        exec.fail("env DEBIAN_FRONTEND=noninteractive apt-get remove -y docker.io");
        let system = test_system(OsFamily::Ubuntu, PathBuf::from("/home/dev"));
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let options = InstallOptions {
            add_user_to_group: false,
            ..InstallOptions::default()
        };
        let result = run_install(&mut DockerEngineInstaller::new(options), &ctx);
        assert!(result.success, "{result:?}");
        assert_eq!(
            result.warnings,
            vec!["Could not remove docker.io; the Docker packages may conflict"]
        );
    }

    #[test]
    fn repository_error_is_reported() {
        let exec = apt_host();
        exec.fail("gpg");
        let system = test_system(OsFamily::Ubuntu, PathBuf::from("/home/dev"));
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut DockerEngineInstaller::new(InstallOptions::default()), &ctx);
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Failed to install the signing key"), "{:?}", result.errors);
        assert!(!exec.ran("env DEBIAN_FRONTEND=noninteractive apt-get install -y docker-ce"));
    }

    #[test]
    fn failed_autoremove_is_a_warning() {
        let exec = ScriptedExecutor::new().with_binary("docker");
        exec.respond("docker ps -aq", crate::exec::CommandResult::completed(0, "", ""));
        exec.fail("env DEBIAN_FRONTEND=noninteractive apt-get autoremove");
        let system = test_system(OsFamily::Ubuntu, PathBuf::from("/home/dev"));
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let options = UninstallOptions {
            remove_config: false,
            remove_data: false,
            ..UninstallOptions::default()
        };
        let result = run_uninstall(&mut DockerEngineUninstaller::new(options), &ctx);
        assert!(result.success, "{result:?}");
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.starts_with("apt-get autoremove failed")),
            "{:?}",
            result.warnings
        );
    }

    #[test]
    fn dry_run_install_and_uninstall_only_plan() {
        let home = tempfile::tempdir().expect("tempdir");
        let exec = ScriptedExecutor::dry_run()
            .with_binary("apt-get")
            .with_binary("curl")
            .with_binary("gpg");
        let system = test_system(OsFamily::Debian, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_install(&mut DockerEngineInstaller::new(InstallOptions::default()), &ctx);
        assert!(result.success, "{result:?}");
        assert!(result.planned.iter().any(|p| p.starts_with("gpg --dearmor")));
        assert!(result.planned.iter().any(|p| p.contains("apt-get install -y docker-ce")));

        exec.add_binary("docker");

        let result = run_uninstall(&mut DockerEngineUninstaller::new(UninstallOptions::default()), &ctx);
        assert!(result.success, "{result:?}");
        assert!(result.planned.iter().any(|p| p.contains("apt-get purge -y docker-ce")));
        assert_eq!(std::fs::read_dir(home.path()).expect("read_dir").count(), 0);
    }
}
