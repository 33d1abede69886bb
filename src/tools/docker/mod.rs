//! Docker: Docker Desktop on macOS, Docker Engine from Docker's apt
//! repository on Ubuntu and Debian.

pub mod debian;
pub mod macos;

use serde::{Deserialize, Serialize};

use crate::exec::CommandSpec;
use crate::pipeline::Context;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    pub install_compose: bool,
    /// Let the invoking user run docker without sudo (Linux).
    pub add_user_to_group: bool,
    pub start_on_boot: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            install_compose: true,
            add_user_to_group: true,
            start_on_boot: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UninstallOptions {
    pub stop_containers: bool,
    pub remove_containers: bool,
    pub remove_images: bool,
    pub remove_volumes: bool,
    /// `~/.docker` and the Docker Desktop preference directories.
    pub remove_config: bool,
    /// `/var/lib/docker` and `/var/lib/containerd` (Linux).
    pub remove_data: bool,
}

impl Default for UninstallOptions {
    fn default() -> Self {
        Self {
            stop_containers: true,
            remove_containers: true,
            remove_images: true,
            remove_volumes: false,
            remove_config: true,
            remove_data: false,
        }
    }
}

/// Stop and delete containers, images and volumes while the daemon still
/// runs. Returns one warning per failed bulk operation.
fn clean_docker_objects(ctx: &Context<'_>, options: &UninstallOptions) -> Vec<String> {
    let mut warnings = Vec::new();
    if !ctx.exec.check_exists("docker") {
        return warnings;
    }

    let steps: [(bool, &[&str], &[&str], &str); 4] = [
        (options.stop_containers, &["ps", "-q"], &["stop"], "stop running containers"),
        (options.remove_containers, &["ps", "-aq"], &["rm", "-f"], "remove containers"),
        (options.remove_images, &["images", "-q"], &["rmi", "-f"], "remove images"),
        (options.remove_volumes, &["volume", "ls", "-q"], &["volume", "rm", "-f"], "remove volumes"),
    ];

    for (enabled, list, action, what) in steps {
        if !enabled {
            continue;
        }
        let ids = list_ids(ctx, list);
        if ids.is_empty() {
            continue;
        }
        let result = ctx.exec.run(
            &CommandSpec::new("docker")
                .args(action.iter().copied())
                .args(ids)
                .describe(format!("Docker: {what}")),
        );
        if !result.is_success() {
            warnings.push(format!("Could not {what}: {}", result.summary()));
        }
    }
    warnings
}

fn list_ids(ctx: &Context<'_>, args: &[&str]) -> Vec<String> {
    let result = ctx.exec.run(
        &CommandSpec::new("docker")
            .args(args.iter().copied())
            .probe(),
    );
    if !result.is_success() {
        return Vec::new();
    }
    let mut ids: Vec<String> = result
        .stdout()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::exec::CommandResult;
    use crate::exec::scripted::ScriptedExecutor;
    use crate::pipeline::AssumeDefaults;
    use crate::system::{OsFamily, test_system};

    #[test]
    fn cleans_only_what_options_enable() {
        let exec = ScriptedExecutor::new().with_binary("docker");
        exec.respond("docker ps -q", CommandResult::completed(0, "abc\ndef\n", ""));
        exec.respond("docker ps -aq", CommandResult::completed(0, "abc\ndef\n123\n", ""));
        exec.respond("docker images -q", CommandResult::completed(0, "", ""));
        exec.respond("docker volume ls -q", CommandResult::completed(0, "data\n", ""));
        exec.fail("docker rm -f");
        let system = test_system(OsFamily::Ubuntu, PathBuf::from("/home/dev"));
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let warnings = clean_docker_objects(&ctx, &UninstallOptions::default());
        assert_eq!(warnings.len(), 1);
        assert!(exec.ran("docker stop abc def"));
        assert!(exec.ran("docker rm -f abc def 123"));
        assert!(!exec.ran("docker rmi"));
        assert!(!exec.ran("docker volume rm"));
    }
}
