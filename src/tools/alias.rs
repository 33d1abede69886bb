//! The `devbootstrap` command itself: a link in `~/.local/bin` plus a PATH
//! entry in the shell rc files.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::exec::CommandSpec;
use crate::pipeline::{
    Context, Installed, Installer, Payload, StepOutcome, Uninstaller, append_to_file, write_file,
};
use crate::platform::Platform;

pub const COMMAND_NAME: &str = "devbootstrap";

const BLOCK_START: &str = "# Added by devbootstrap";
const BLOCK_END: &str = "# End devbootstrap";
const PATH_EXPORT: &str = r#"export PATH="$HOME/.local/bin:$PATH""#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    /// Append the `~/.local/bin` PATH block to the shell rc files.
    pub configure_path: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self { configure_path: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UninstallOptions {
    /// Strip the PATH block from the shell rc files.
    pub clean_shell_files: bool,
    /// Remove `~/.devbootstrap`, the checkout older releases installed.
    pub remove_legacy_checkout: bool,
}

impl Default for UninstallOptions {
    fn default() -> Self {
        Self {
            clean_shell_files: true,
            remove_legacy_checkout: true,
        }
    }
}

fn bin_dir(ctx: &Context<'_>) -> PathBuf {
    ctx.home(".local/bin")
}

fn link_path(ctx: &Context<'_>) -> PathBuf {
    bin_dir(ctx).join(COMMAND_NAME)
}

fn link_present(ctx: &Context<'_>) -> bool {
    link_path(ctx).symlink_metadata().is_ok()
}

fn path_block() -> String {
    format!("\n{BLOCK_START}\n{PATH_EXPORT}\n{BLOCK_END}\n")
}

/// Rc files that get the PATH block: the existing zsh and bash files, or the
/// one matching `shell` when none exists yet.
pub fn rc_files_for_install(home: &Path, platform: Platform, shell: Option<&str>) -> Vec<PathBuf> {
    let zshrc = home.join(".zshrc");
    let bashrc = home.join(".bashrc");
    let bash_profile = home.join(".bash_profile");

    let mut files = Vec::new();
    if zshrc.exists() {
        files.push(zshrc.clone());
    }
    if bashrc.exists() {
        files.push(bashrc.clone());
    } else if platform == Platform::MacOs && bash_profile.exists() {
        files.push(bash_profile.clone());
    }
    if !files.is_empty() {
        return files;
    }

    match shell {
        Some(shell) if shell.ends_with("zsh") => vec![zshrc],
        _ if platform == Platform::MacOs => vec![bash_profile],
        _ => vec![bashrc],
    }
}

fn existing_rc_files(home: &Path) -> Vec<PathBuf> {
    [".zshrc", ".bashrc", ".bash_profile"]
        .iter()
        .map(|name| home.join(name))
        .filter(|path| path.exists())
        .collect()
}

/// Already puts `~/.local/bin` on PATH, through our block or by hand.
fn has_path_entry(contents: &str) -> bool {
    contents.contains(BLOCK_START)
        || contents
            .lines()
            .map(str::trim)
            .any(|line| line.starts_with("export PATH") && line.contains(".local/bin"))
}

/// `contents` without the marked PATH block and the blank line before it.
/// `None` when there is no block.
pub fn strip_path_block(contents: &str) -> Option<String> {
    if !contents.contains(BLOCK_START) {
        return None;
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut in_block = false;
    for line in contents.lines() {
        if in_block {
            if line.trim() == BLOCK_END {
                in_block = false;
            }
            continue;
        }
        if line.trim() == BLOCK_START {
            if kept.last().is_some_and(|previous| previous.trim().is_empty()) {
                kept.pop();
            }
            in_block = true;
            continue;
        }
        kept.push(line);
    }

    let mut stripped = kept.join("\n");
    if !stripped.is_empty() && contents.ends_with('\n') {
        stripped.push('\n');
    }
    Some(stripped)
}

pub struct AliasInstaller {
    options: InstallOptions,
    platform: Platform,
}

impl AliasInstaller {
    pub fn new(options: InstallOptions, platform: Platform) -> Self {
        Self { options, platform }
    }
}

impl Installer for AliasInstaller {
    fn name(&self) -> &str {
        "devbootstrap command"
    }

    fn binary(&self) -> &str {
        COMMAND_NAME
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn check_existing(&mut self, ctx: &Context<'_>) -> bool {
        link_present(ctx) || ctx.exec.check_exists(COMMAND_NAME)
    }

    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let exe = std::env::current_exe()
            .map_err(|e| format!("Could not locate the running executable: {e}"))?;
        let dir = bin_dir(ctx);
        if !ctx.exec.ensure_directory(&dir) {
            return Err(format!("Could not create {}", dir.display()));
        }
        let link = ctx.exec.run(
            &CommandSpec::new("ln")
                .arg("-sf")
                .path_arg(&exe)
                .path_arg(&link_path(ctx))
                .describe(format!("Linking {COMMAND_NAME} into {}", dir.display())),
        );
        if !link.is_success() {
            return Err(format!("Could not create the {COMMAND_NAME} link: {}", link.summary()));
        }
        ctx.exec.extend_search_path(&dir);
        Ok(Vec::new())
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        if !self.options.configure_path {
            return Vec::new();
        }
        let shell = std::env::var("SHELL").ok();
        let mut warnings = Vec::new();
        for rc in rc_files_for_install(&ctx.system.home_dir, self.platform, shell.as_deref()) {
            let contents = fs::read_to_string(&rc).unwrap_or_default();
            if has_path_entry(&contents) {
                debug!("{} already puts ~/.local/bin on PATH", rc.display());
                continue;
            }
            match append_to_file(ctx, &rc, &path_block()) {
                Ok(()) => info!("Added ~/.local/bin to PATH in {}", rc.display()),
                Err(e) => warnings.push(format!("Could not update {}: {e}", rc.display())),
            }
        }
        warnings
    }

    fn verify(&mut self, ctx: &Context<'_>) -> Option<Installed> {
        link_present(ctx).then(|| Installed {
            path: Some(link_path(ctx)),
            version: Some(format!("{COMMAND_NAME} {}", env!("CARGO_PKG_VERSION"))),
        })
    }

    fn notes(&self, _ctx: &Context<'_>) -> Vec<String> {
        vec![format!(
            "Open a new terminal (or source your shell rc file), then run `{COMMAND_NAME}`"
        )]
    }
}

pub struct AliasUninstaller {
    options: UninstallOptions,
    platform: Platform,
}

impl AliasUninstaller {
    pub fn new(options: UninstallOptions, platform: Platform) -> Self {
        Self { options, platform }
    }

    fn rc_files_with_block(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        existing_rc_files(&ctx.system.home_dir)
            .into_iter()
            .filter(|rc| {
                fs::read_to_string(rc)
                    .map(|contents| contents.contains(BLOCK_START))
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl Uninstaller for AliasUninstaller {
    fn name(&self) -> &str {
        "devbootstrap command"
    }

    fn binary(&self) -> &str {
        COMMAND_NAME
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_installed(&mut self, ctx: &Context<'_>) -> bool {
        link_present(ctx) || !self.rc_files_with_block(ctx).is_empty()
    }

    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        if !link_present(ctx) {
            return Ok(Vec::new());
        }
        let removal = ctx.exec.run(
            &CommandSpec::new("rm")
                .arg("-f")
                .path_arg(&link_path(ctx))
                .describe(format!("Removing the {COMMAND_NAME} link")),
        );
        if removal.is_success() {
            Ok(Vec::new())
        } else {
            Err(format!("Could not remove the {COMMAND_NAME} link: {}", removal.summary()))
        }
    }

    fn secondary_payloads(&self, ctx: &Context<'_>) -> Vec<Payload> {
        if self.options.remove_legacy_checkout {
            vec![Payload::new("legacy checkout", vec![ctx.home(".devbootstrap")])]
        } else {
            Vec::new()
        }
    }

    fn cleanup(&mut self, ctx: &Context<'_>) -> Vec<String> {
        if !self.options.clean_shell_files {
            return Vec::new();
        }
        let mut warnings = Vec::new();
        for rc in self.rc_files_with_block(ctx) {
            let result = fs::read_to_string(&rc)
                .map_err(|e| e.to_string())
                .and_then(|contents| {
                    let stripped = strip_path_block(&contents).unwrap_or(contents);
                    write_file(ctx, &rc, &stripped).map_err(|e| e.to_string())
                });
            if let Err(e) = result {
                warnings.push(format!("Could not clean {}: {e}", rc.display()));
            }
        }
        warnings
    }

    fn still_present(&mut self, ctx: &Context<'_>) -> bool {
        link_present(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::Executor;
    use crate::exec::scripted::ScriptedExecutor;
    use crate::exec::ShellExecutor;
    use crate::pipeline::testing::FixedAnswer;
    use crate::pipeline::{AssumeDefaults, run_install, run_uninstall};
    use crate::system::{OsFamily, test_system};

    fn block_count(home: &Path) -> usize {
        existing_rc_files(home)
            .iter()
            .map(|rc| fs::read_to_string(rc).unwrap_or_default().matches(BLOCK_START).count())
            .sum()
    }

    #[test]
    fn strips_only_the_marked_block() {
        let contents = format!("alias ll='ls -l'\n{}export EDITOR=nvim\n", path_block());
        assert_eq!(
            strip_path_block(&contents).as_deref(),
            Some("alias ll='ls -l'\nexport EDITOR=nvim\n")
        );
        assert_eq!(strip_path_block("export PATH=\"$HOME/.local/bin:$PATH\"\n"), None);
    }

    #[test]
    fn block_alone_strips_to_empty() {
        assert_eq!(strip_path_block(&path_block()).as_deref(), Some(""));
    }

    #[test]
    fn rc_selection_prefers_existing_files() {
        let home = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            rc_files_for_install(home.path(), Platform::Debian, Some("/usr/bin/zsh")),
            vec![home.path().join(".zshrc")]
        );
        assert_eq!(
            rc_files_for_install(home.path(), Platform::MacOs, Some("/bin/bash")),
            vec![home.path().join(".bash_profile")]
        );

        fs::write(home.path().join(".bash_profile"), "").expect("write");
        fs::write(home.path().join(".zshrc"), "").expect("write");
        assert_eq!(
            rc_files_for_install(home.path(), Platform::MacOs, None),
            vec![home.path().join(".zshrc"), home.path().join(".bash_profile")]
        );
        assert_eq!(
            rc_files_for_install(home.path(), Platform::Debian, None),
            vec![home.path().join(".zshrc")]
        );
    }

    #[test]
    fn path_block_is_added_once() {
        let home = tempfile::tempdir().expect("tempdir");
        let zshrc = home.path().join(".zshrc");
        fs::write(&zshrc, "plugins=(git)\n").expect("write");
        let exec = ScriptedExecutor::new();
        let system = test_system(OsFamily::Ubuntu, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let mut installer = AliasInstaller::new(InstallOptions::default(), Platform::Debian);
        assert!(installer.configure(&ctx).is_empty());
        assert!(installer.configure(&ctx).is_empty());

        let contents = fs::read_to_string(&zshrc).expect("read");
        assert_eq!(contents.matches(BLOCK_START).count(), 1);
        assert!(contents.starts_with("plugins=(git)\n"));
    }

    #[test]
    fn hand_written_path_entry_is_respected() {
        assert!(has_path_entry("export PATH=\"$HOME/.local/bin:$PATH\"\n"));
        assert!(!has_path_entry("export PATH=\"/opt/bin:$PATH\"\n"));
    }

    #[test]
    fn uninstall_removes_link_and_block() {
        let home = tempfile::tempdir().expect("tempdir");
        let bin = home.path().join(".local/bin");
        fs::create_dir_all(&bin).expect("mkdir");
        fs::write(bin.join(COMMAND_NAME), "").expect("write");
        let bashrc = home.path().join(".bashrc");
        fs::write(&bashrc, format!("set -o vi\n{}", path_block())).expect("write");

        let exec = ScriptedExecutor::new();
        let system = test_system(OsFamily::Debian, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_uninstall(
            &mut AliasUninstaller::new(UninstallOptions::default(), Platform::Debian),
            &ctx,
        );
        assert!(result.success, "{result:?}");
        assert!(exec.ran(&format!("rm -f {}", bin.join(COMMAND_NAME).display())));
        assert_eq!(fs::read_to_string(&bashrc).expect("read"), "set -o vi\n");
    }

    #[test]
    fn installing_twice_keeps_one_link_and_one_block() {
        let home = tempfile::tempdir().expect("tempdir");
        let system = test_system(OsFamily::Ubuntu, home.path().to_path_buf());
        let exec = ShellExecutor::new(&system, false)
            .expect("runtime")
            .with_progress(false);
        if exec.check_exists(COMMAND_NAME) {
            return;
        }

        let first = run_install(
            &mut AliasInstaller::new(InstallOptions::default(), Platform::Debian),
            &Context::new(&exec, &system, &AssumeDefaults),
        );
        assert!(first.success, "{first:?}");
        assert!(!first.already_installed);
        let link = home.path().join(".local/bin").join(COMMAND_NAME);
        assert!(link.symlink_metadata().expect("link").file_type().is_symlink());
        assert_eq!(block_count(home.path()), 1);

        let reinstall = FixedAnswer::new(true);
        let second = run_install(
            &mut AliasInstaller::new(InstallOptions::default(), Platform::Debian),
            &Context::new(&exec, &system, &reinstall),
        );
        assert!(second.success, "{second:?}");
        assert_eq!(reinstall.asked.borrow().len(), 1);
        assert!(second.warnings.is_empty(), "{second:?}");
        assert_eq!(block_count(home.path()), 1);
        assert_eq!(fs::read_link(&link).expect("link"), std::env::current_exe().expect("exe"));

        let third = run_install(
            &mut AliasInstaller::new(InstallOptions::default(), Platform::Debian),
            &Context::new(&exec, &system, &AssumeDefaults),
        );
        assert!(third.success, "{third:?}");
        assert!(third.already_installed);
        assert_eq!(third.path, Some(link));
        assert_eq!(block_count(home.path()), 1);
    }

    #[test]
    fn dry_run_uninstall_only_plans() {
        let home = tempfile::tempdir().expect("tempdir");
        let bin = home.path().join(".local/bin");
        fs::create_dir_all(&bin).expect("mkdir");
        fs::write(bin.join(COMMAND_NAME), "").expect("write");
        let bashrc = home.path().join(".bashrc");
        let original = format!("set -o vi\n{}", path_block());
        fs::write(&bashrc, &original).expect("write");

        let exec = ScriptedExecutor::dry_run();
        let system = test_system(OsFamily::Debian, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_uninstall(
            &mut AliasUninstaller::new(UninstallOptions::default(), Platform::Debian),
            &ctx,
        );
        assert!(result.success, "{result:?}");
        assert!(!result.planned.is_empty());
        assert!(result.planned.contains(&format!("rm -f {}", bin.join(COMMAND_NAME).display())));
        assert!(bin.join(COMMAND_NAME).exists());
        assert_eq!(fs::read_to_string(&bashrc).expect("read"), original);
    }
}
