//! Dry runs through the live executor must plan work without touching disk.

use std::fs;
use std::path::{Path, PathBuf};

use devbootstrap::config::BootstrapConfig;
use devbootstrap::exec::{CommandSpec, Executor, ShellExecutor};
use devbootstrap::pipeline::{AssumeDefaults, Context, run_install};
use devbootstrap::platform::select_installer;
use devbootstrap::session::{self, RunStatus};
use devbootstrap::system::{Architecture, OsFamily, SystemInfo};
use devbootstrap::tools::{InstallRequest, ToolKind, UninstallRequest, alias};

fn system(family: OsFamily, home: &Path) -> SystemInfo {
    SystemInfo {
        os_family: family,
        os_name: family.to_string(),
        os_version: "test".to_string(),
        os_codename: Some("bookworm".to_string()),
        architecture: Architecture::X86_64,
        home_dir: home.to_path_buf(),
        is_root: false,
        has_sudo: false,
    }
}

fn tree(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).expect("read_dir").flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(tree(&path));
        }
        found.push(path);
    }
    found.sort();
    found
}

#[test]
fn alias_install_is_only_planned() {
    let home = tempfile::tempdir().expect("tempdir");
    fs::write(home.path().join(".bashrc"), "set -o vi\n").expect("write");
    let before = tree(home.path());

    let system = system(OsFamily::Debian, home.path());
    let exec = ShellExecutor::new(&system, true)
        .expect("executor")
        .with_progress(false);
    let ctx = Context::new(&exec, &system, &AssumeDefaults);

    let mut installer = select_installer(
        InstallRequest::Alias(alias::InstallOptions::default()),
        &system,
    )
    .expect("supported");
    let result = run_install(installer.as_mut(), &ctx);

    assert!(result.success, "{result:?}");
    assert!(result.errors.is_empty());
    assert!(result.planned.iter().any(|action| action.starts_with("ln -sf ")));
    assert!(
        result
            .planned
            .iter()
            .any(|action| action == &format!("append to {}", home.path().join(".bashrc").display()))
    );
    assert_eq!(tree(home.path()), before);
    assert_eq!(fs::read_to_string(home.path().join(".bashrc")).expect("read"), "set -o vi\n");
}

#[test]
fn elevated_commands_are_planned_with_the_wrapper() {
    let home = tempfile::tempdir().expect("tempdir");
    let system = system(OsFamily::Ubuntu, home.path());
    let exec = ShellExecutor::new(&system, true)
        .expect("executor")
        .with_progress(false);

    let result = exec.run(&CommandSpec::new("apt-get").args(["install", "-y", "zsh"]).elevated());
    assert!(result.is_success());
    assert_eq!(exec.take_planned(), ["sudo apt-get install -y zsh"]);
}

#[test]
fn session_reports_success_and_plans_for_each_tool() {
    let home = tempfile::tempdir().expect("tempdir");
    let system = system(OsFamily::Ubuntu, home.path());
    let exec = ShellExecutor::new(&system, true)
        .expect("executor")
        .with_progress(false);
    let ctx = Context::new(&exec, &system, &AssumeDefaults);

    let config = BootstrapConfig::default();
    let report = session::install_all(
        &ctx,
        vec![InstallRequest::from_config(ToolKind::Alias, &config)],
    );
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.status.exit_code(), 0);
    assert_eq!(report.results.len(), 1);
    assert!(!report.results[0].planned.is_empty());

    let report = session::uninstall_all(
        &ctx,
        vec![UninstallRequest::from_config(ToolKind::Fonts, &config)],
    );
    assert_eq!(report.status, RunStatus::Success);
    assert!(report.results[0].warnings[0].starts_with("Nothing to uninstall"));
    assert!(tree(home.path()).is_empty());
}

#[test]
fn unsupported_linux_is_refused_up_front() {
    let home = tempfile::tempdir().expect("tempdir");
    let system = system(OsFamily::OtherLinux, home.path());
    assert!(session::admit(&system).is_err());
    assert!(
        select_installer(
            InstallRequest::from_config(ToolKind::Neovim, &BootstrapConfig::default()),
            &system
        )
        .is_none()
    );
}
