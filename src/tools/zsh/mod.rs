//! Zsh with the Oh My Zsh framework, a few community plugins and an
//! optional powerlevel10k prompt.
//!
//! Both platforms share everything after the package itself: cloning the
//! framework, writing `~/.zshrc`, registering the shell in `/etc/shells` and
//! switching the login shell.

pub mod debian;
pub mod macos;

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::exec::CommandSpec;
use crate::pipeline::{Context, Dependency, Payload, write_file};

const OH_MY_ZSH_REPO: &str = "https://github.com/ohmyzsh/ohmyzsh.git";
const POWERLEVEL10K_REPO: &str = "https://github.com/romkatv/powerlevel10k.git";
const SHELLS_FILE: &str = "/etc/shells";
const CLONE_TIMEOUT: Duration = Duration::from_secs(300);

const DEPENDENCIES: &[Dependency] = &[
    Dependency::required("git", "git", "clones Oh My Zsh and its plugins"),
    Dependency::required("curl", "curl", "downloads"),
];

/// Plugins cloned into `$ZSH_CUSTOM/plugins`.
pub const PLUGINS: &[(&str, &str)] = &[
    ("zsh-autosuggestions", "https://github.com/zsh-users/zsh-autosuggestions.git"),
    ("zsh-syntax-highlighting", "https://github.com/zsh-users/zsh-syntax-highlighting.git"),
    ("zsh-completions", "https://github.com/zsh-users/zsh-completions.git"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Robbyrussell,
    Agnoster,
    Powerlevel10k,
}

impl Theme {
    /// Value of `ZSH_THEME`.
    pub fn zsh_theme(self) -> &'static str {
        match self {
            Theme::Robbyrussell => "robbyrussell",
            Theme::Agnoster => "agnoster",
            Theme::Powerlevel10k => "powerlevel10k/powerlevel10k",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    pub install_oh_my_zsh: bool,
    pub install_autosuggestions: bool,
    pub install_syntax_highlighting: bool,
    pub install_completions: bool,
    pub theme: Theme,
    pub set_default_shell: bool,
    /// Copy `~/.zshrc` aside before it is regenerated.
    pub backup_existing: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            install_oh_my_zsh: true,
            install_autosuggestions: true,
            install_syntax_highlighting: true,
            install_completions: true,
            theme: Theme::Robbyrussell,
            set_default_shell: true,
            backup_existing: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UninstallOptions {
    /// Switch the login shell back to bash.
    pub restore_default_shell: bool,
    pub remove_oh_my_zsh: bool,
    pub remove_zshrc: bool,
    pub remove_history: bool,
    pub remove_cache: bool,
    pub backup_before_remove: bool,
}

impl Default for UninstallOptions {
    fn default() -> Self {
        Self {
            restore_default_shell: true,
            remove_oh_my_zsh: true,
            remove_zshrc: true,
            remove_history: false,
            remove_cache: true,
            backup_before_remove: true,
        }
    }
}

fn oh_my_zsh_dir(ctx: &Context<'_>) -> PathBuf {
    ctx.home(".oh-my-zsh")
}

fn zshrc(ctx: &Context<'_>) -> PathBuf {
    ctx.home(".zshrc")
}

/// Plugins listed in `plugins=(...)`, `git` first.
fn enabled_plugins(options: &InstallOptions) -> Vec<&'static str> {
    let mut plugins = vec!["git"];
    if options.install_autosuggestions {
        plugins.push("zsh-autosuggestions");
    }
    if options.install_syntax_highlighting {
        plugins.push("zsh-syntax-highlighting");
    }
    if options.install_completions {
        plugins.push("zsh-completions");
    }
    plugins
}

/// Contents of the generated `~/.zshrc`.
pub fn render_zshrc(oh_my_zsh: &Path, options: &InstallOptions) -> String {
    let mut rc = String::new();
    rc.push_str("# Path to your Oh My Zsh installation.\n");
    rc.push_str(&format!("export ZSH=\"{}\"\n\n", oh_my_zsh.display()));
    rc.push_str(&format!("ZSH_THEME=\"{}\"\n\n", options.theme.zsh_theme()));
    rc.push_str(&format!("plugins=({})\n\n", enabled_plugins(options).join(" ")));
    if options.install_completions {
        // Must be on fpath before oh-my-zsh.sh runs compinit.
        rc.push_str("fpath+=\"${ZSH_CUSTOM:-$ZSH/custom}/plugins/zsh-completions/src\"\n\n");
    }
    rc.push_str("source $ZSH/oh-my-zsh.sh\n\n");
    rc.push_str(concat!(
        "alias ll=\"ls -la\"\n",
        "alias la=\"ls -A\"\n",
        "alias l=\"ls -CF\"\n",
        "\n",
        "HISTSIZE=10000\n",
        "SAVEHIST=10000\n",
        "setopt HIST_IGNORE_DUPS\n",
        "setopt HIST_IGNORE_SPACE\n",
        "setopt SHARE_HISTORY\n",
        "\n",
        "zstyle ':completion:*' matcher-list 'm:{a-z}={A-Z}'\n",
        "zstyle ':completion:*' list-colors \"${(s.:.)LS_COLORS}\"\n",
        "zstyle ':completion:*' menu select\n",
    ));
    if options.theme == Theme::Powerlevel10k {
        rc.push_str("\n[[ ! -f ~/.p10k.zsh ]] || source ~/.p10k.zsh\n");
    }
    rc
}

/// Whether `/etc/shells` contents already list `shell`.
fn shell_listed(shells: &str, shell: &Path) -> bool {
    shells
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .any(|line| Path::new(line) == shell)
}

fn clone(ctx: &Context<'_>, url: &str, destination: &Path, what: &str) -> Result<(), String> {
    if destination.exists() {
        info!("{what} is already present at {}", destination.display());
        return Ok(());
    }
    let result = ctx.exec.run(
        &CommandSpec::new("git")
            .args(["clone", "--depth=1", url])
            .path_arg(destination)
            .timeout(CLONE_TIMEOUT)
            .describe(format!("Cloning {what}")),
    );
    if result.is_success() {
        Ok(())
    } else {
        Err(format!("Could not install {what}: {}", result.summary()))
    }
}

/// Framework, plugins, theme, `.zshrc`, `/etc/shells` and login shell. Each
/// failure is one warning; a missing framework skips what depends on it.
fn configure_shell(ctx: &Context<'_>, options: &InstallOptions) -> Vec<String> {
    let mut warnings = Vec::new();

    if options.install_oh_my_zsh {
        let framework = oh_my_zsh_dir(ctx);
        match clone(ctx, OH_MY_ZSH_REPO, &framework, "Oh My Zsh") {
            Ok(()) => {
                let custom = framework.join("custom");
                for (name, url) in PLUGINS {
                    if !enabled_plugins(options).contains(name) {
                        continue;
                    }
                    if let Err(e) = clone(ctx, url, &custom.join("plugins").join(name), name) {
                        warnings.push(e);
                    }
                }
                if options.theme == Theme::Powerlevel10k
                    && let Err(e) = clone(
                        ctx,
                        POWERLEVEL10K_REPO,
                        &custom.join("themes/powerlevel10k"),
                        "powerlevel10k",
                    )
                {
                    warnings.push(e);
                }
                if let Err(e) = write_file(ctx, &zshrc(ctx), &render_zshrc(&framework, options)) {
                    warnings.push(format!("Could not write {}: {e}", zshrc(ctx).display()));
                }
            }
            Err(e) => warnings.push(e),
        }
    }

    let zsh = match ctx.exec.resolve_path("zsh") {
        Some(path) => path,
        None if ctx.exec.is_dry_run() => PathBuf::from("/bin/zsh"),
        None => {
            warnings.push("zsh is not on the PATH; the login shell was not changed".to_string());
            return warnings;
        }
    };
    if let Err(e) = register_shell(ctx, &zsh) {
        warnings.push(e);
    }
    if options.set_default_shell
        && let Err(e) = change_login_shell(ctx, &zsh)
    {
        warnings.push(e);
    }
    warnings
}

fn register_shell(ctx: &Context<'_>, shell: &Path) -> Result<(), String> {
    let listed = std::fs::read_to_string(SHELLS_FILE)
        .map(|shells| shell_listed(&shells, shell))
        .unwrap_or(false);
    if listed {
        return Ok(());
    }
    let result = ctx.exec.run(
        &CommandSpec::shell("printf '%s\\n' \"$1\" >> \"$2\"")
            .path_arg(shell)
            .arg(SHELLS_FILE)
            .elevated()
            .describe(format!("Adding {} to {SHELLS_FILE}", shell.display())),
    );
    if result.is_success() {
        Ok(())
    } else {
        Err(format!(
            "Could not add {} to {SHELLS_FILE}: {}",
            shell.display(),
            result.summary()
        ))
    }
}

/// `chsh` for the invoking user. Under sudo the target user is named
/// explicitly; otherwise chsh asks for the password on the terminal.
fn change_login_shell(ctx: &Context<'_>, shell: &Path) -> Result<(), String> {
    let current = std::env::var("SHELL").unwrap_or_default();
    if Path::new(&current) == shell {
        info!("{} is already the login shell", shell.display());
        return Ok(());
    }
    let mut spec = CommandSpec::new("chsh").arg("-s").path_arg(shell);
    spec = match ctx.system.user_name() {
        Some(user) if ctx.system.is_root => spec.arg(user),
        _ => spec.interactive(),
    };
    let result = ctx
        .exec
        .run(&spec.describe(format!("Changing the login shell to {}", shell.display())));
    if result.is_success() {
        Ok(())
    } else {
        Err(format!(
            "Could not change the login shell (run `chsh -s {}` yourself): {}",
            shell.display(),
            result.summary()
        ))
    }
}

/// Switch back to bash when zsh is the current login shell.
fn restore_login_shell(ctx: &Context<'_>) -> Vec<String> {
    let current = std::env::var("SHELL").unwrap_or_default();
    if !current.ends_with("zsh") {
        return Vec::new();
    }
    let bash = ctx
        .exec
        .resolve_path("bash")
        .unwrap_or_else(|| PathBuf::from("/bin/bash"));
    match change_login_shell(ctx, &bash) {
        Ok(()) => Vec::new(),
        Err(e) => vec![e],
    }
}

fn backup_targets(ctx: &Context<'_>, options: &UninstallOptions) -> Vec<PathBuf> {
    if !options.backup_before_remove {
        return Vec::new();
    }
    let mut targets = Vec::new();
    if options.remove_zshrc {
        targets.push(zshrc(ctx));
    }
    if options.remove_history {
        targets.push(ctx.home(".zsh_history"));
    }
    targets
}

fn user_payloads(ctx: &Context<'_>, options: &UninstallOptions) -> Vec<Payload> {
    let mut payloads = Vec::new();
    if options.remove_oh_my_zsh {
        payloads.push(Payload::new("Oh My Zsh", vec![oh_my_zsh_dir(ctx)]));
    }
    if options.remove_zshrc {
        payloads.push(Payload::new(".zshrc", vec![zshrc(ctx), ctx.home(".p10k.zsh")]));
    }
    if options.remove_history {
        payloads.push(Payload::new("history", vec![ctx.home(".zsh_history")]));
    }
    if options.remove_cache {
        let mut cache = completion_dumps(&ctx.system.home_dir);
        cache.push(ctx.home(".zsh_sessions"));
        cache.push(ctx.home(".cache/zsh"));
        payloads.push(Payload::new("cache", cache));
    }
    payloads
}

/// `~/.zcompdump*` files left by compinit.
fn completion_dumps(home: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(home) else {
        return Vec::new();
    };
    let mut dumps: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".zcompdump"))
        .map(|entry| entry.path())
        .collect();
    dumps.sort();
    dumps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::scripted::ScriptedExecutor;
    use crate::pipeline::AssumeDefaults;
    use crate::system::{OsFamily, test_system};

    #[test]
    fn renders_selected_plugins_and_theme() {
        let options = InstallOptions {
            install_syntax_highlighting: false,
            theme: Theme::Powerlevel10k,
            ..InstallOptions::default()
        };
        let rc = render_zshrc(Path::new("/home/dev/.oh-my-zsh"), &options);
        assert!(rc.contains("export ZSH=\"/home/dev/.oh-my-zsh\"\n"));
        assert!(rc.contains("ZSH_THEME=\"powerlevel10k/powerlevel10k\"\n"));
        assert!(rc.contains("plugins=(git zsh-autosuggestions zsh-completions)\n"));
        assert!(rc.contains("source ~/.p10k.zsh"));
        let fpath = rc.find("fpath+=").expect("fpath line");
        let source = rc.find("source $ZSH/oh-my-zsh.sh").expect("source line");
        assert!(fpath < source);
    }

    #[test]
    fn default_rc_has_no_prompt_config() {
        let rc = render_zshrc(Path::new("/root/.oh-my-zsh"), &InstallOptions::default());
        assert!(rc.contains("ZSH_THEME=\"robbyrussell\""));
        assert!(!rc.contains("p10k"));
    }

    #[test]
    fn recognises_listed_shells() {
        let shells = "# /etc/shells: valid login shells\n/bin/sh\n/bin/bash\n/usr/bin/zsh\n";
        assert!(shell_listed(shells, Path::new("/usr/bin/zsh")));
        assert!(!shell_listed(shells, Path::new("/opt/homebrew/bin/zsh")));
        assert!(!shell_listed("# /usr/bin/zsh\n", Path::new("/usr/bin/zsh")));
    }

    #[test]
    fn configures_framework_plugins_and_rc_file() {
        let home = tempfile::tempdir().expect("tempdir");
        let exec = ScriptedExecutor::new().with_binary("zsh");
        let system = test_system(OsFamily::Ubuntu, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let options = InstallOptions {
            set_default_shell: false,
            ..InstallOptions::default()
        };
        let warnings = configure_shell(&ctx, &options);
        assert!(warnings.is_empty(), "{warnings:?}");

        let clones = exec
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("git clone"))
            .count();
        assert_eq!(clones, 1 + PLUGINS.len());
        let rc = std::fs::read_to_string(home.path().join(".zshrc")).expect("zshrc");
        assert!(rc.contains("plugins=(git zsh-autosuggestions zsh-syntax-highlighting zsh-completions)"));
        assert!(!exec.ran("chsh"));
    }

    #[test]
    fn failed_framework_clone_skips_plugins() {
        let home = tempfile::tempdir().expect("tempdir");
        let exec = ScriptedExecutor::new().with_binary("zsh");
        exec.fail("git clone --depth=1 https://github.com/ohmyzsh");
        let system = test_system(OsFamily::Debian, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let options = InstallOptions {
            set_default_shell: false,
            ..InstallOptions::default()
        };
        let warnings = configure_shell(&ctx, &options);
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("Oh My Zsh"));
        assert!(!home.path().join(".zshrc").exists());
        assert_eq!(exec.calls().iter().filter(|c| c.starts_with("git clone")).count(), 1);
    }

    #[test]
    fn uninstall_payloads_follow_options() {
        let home = tempfile::tempdir().expect("tempdir");
        std::fs::write(home.path().join(".zcompdump-host-5.9"), "").expect("write");
        let exec = ScriptedExecutor::new();
        let system = test_system(OsFamily::Ubuntu, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let options = UninstallOptions::default();
        let payloads = user_payloads(&ctx, &options);
        let labels: Vec<&str> = payloads.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Oh My Zsh", ".zshrc", "cache"]);
        assert!(payloads[2].paths.contains(&home.path().join(".zcompdump-host-5.9")));
        assert_eq!(backup_targets(&ctx, &options), vec![home.path().join(".zshrc")]);
    }
}
