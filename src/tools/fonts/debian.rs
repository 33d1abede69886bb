//! Nerd Fonts from the upstream release archives, installed per user.

use std::path::PathBuf;

use log::info;

use super::{FontId, InstallOptions, UninstallOptions, extract_fonts, matching_font_files};
use crate::exec::CommandSpec;
use crate::pipeline::{
    Context, Dependency, Installed, Installer, Scratch, StepOutcome, Uninstaller, completed, scratch_dir,
};
use crate::platform::{Platform, apt};

const DEPENDENCIES: &[Dependency] = &[
    Dependency::required("fontconfig", "fc-cache", "font cache"),
    Dependency::required("curl", "curl", "downloads the font archives"),
];

fn fonts_dir(ctx: &Context<'_>) -> PathBuf {
    ctx.home(".local/share/fonts")
}

fn refresh_font_cache(ctx: &Context<'_>) -> Result<(), String> {
    let result = ctx.exec.run(
        &CommandSpec::new("fc-cache")
            .arg("-f")
            .describe("Refreshing the font cache"),
    );
    if result.is_success() {
        Ok(())
    } else {
        Err(format!("Font cache refresh failed: {}", result.summary()))
    }
}

pub struct FontArchiveInstaller {
    options: InstallOptions,
}

impl FontArchiveInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self { options }
    }

    fn install_font(&self, ctx: &Context<'_>, scratch: &Scratch, font: FontId) -> Result<(), String> {
        let info = font.info();
        let dest = fonts_dir(ctx);
        let archive = scratch.join(info.archive);
        if !ctx.exec.download(&info.archive_url(), &archive) {
            return Err(format!("{font} could not be downloaded"));
        }

        if ctx.exec.is_dry_run() {
            ctx.exec.note_planned(&format!(
                "extract {} into {}",
                archive.display(),
                dest.display()
            ));
            return Ok(());
        }

        match extract_fonts(&archive, &dest) {
            Ok(files) if files.is_empty() => Err(format!("{} contained no font files", info.archive)),
            Ok(files) => {
                info!("Installed {} files for {font}", files.len());
                Ok(())
            }
            Err(e) => Err(format!("{font} could not be extracted: {e:#}")),
        }
    }
}

impl Installer for FontArchiveInstaller {
    fn name(&self) -> &str {
        "Nerd Fonts"
    }

    fn binary(&self) -> &str {
        "fc-cache"
    }

    fn platform(&self) -> Platform {
        Platform::Debian
    }

    fn check_existing(&mut self, ctx: &Context<'_>) -> bool {
        let dir = fonts_dir(ctx);
        !self.options.fonts.is_empty()
            && self
                .options
                .fonts
                .iter()
                .all(|font| !matching_font_files(&dir, font.info()).is_empty())
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

    /// Succeeds when at least one font was installed; each font that failed
    /// becomes a warning.
    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        if self.options.fonts.is_empty() {
            return Err("No fonts were selected".to_string());
        }
        let dir = fonts_dir(ctx);
        if !ctx.exec.ensure_directory(&dir) {
            return Err(format!("Could not create {}", dir.display()));
        }
        let scratch = scratch_dir(ctx).map_err(|e| format!("Could not create a download directory: {e}"))?;
        let mut failures = Vec::new();
        for font in &self.options.fonts {
            if ctx.exec.interrupted() {
                return Err(format!("Interrupted before installing {font}"));
            }
            if let Err(e) = self.install_font(ctx, &scratch, *font) {
                failures.push(e);
            }
        }
        if failures.len() == self.options.fonts.len() {
            return Err(failures.join("; "));
        }
        Ok(failures)
    }

    fn configure(&mut self, ctx: &Context<'_>) -> Vec<String> {
        match refresh_font_cache(ctx) {
            Ok(()) => Vec::new(),
            Err(e) => vec![e],
        }
    }

    fn verify(&mut self, ctx: &Context<'_>) -> Option<Installed> {
        let dir = fonts_dir(ctx);
        let present = self
            .options
            .fonts
            .iter()
            .any(|font| !matching_font_files(&dir, font.info()).is_empty());
        present.then(|| Installed {
            path: Some(dir),
            version: None,
        })
    }

    fn notes(&self, _ctx: &Context<'_>) -> Vec<String> {
        vec!["Select the Nerd Font in your terminal's profile settings".to_string()]
    }
}

pub struct FontArchiveUninstaller {
    options: UninstallOptions,
}

impl FontArchiveUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self { options }
    }

    fn installed_files(&self, ctx: &Context<'_>) -> Vec<PathBuf> {
        let dir = fonts_dir(ctx);
        self.options
            .fonts
            .iter()
            .flat_map(|font| matching_font_files(&dir, font.info()))
            .collect()
    }
}

impl Uninstaller for FontArchiveUninstaller {
    fn name(&self) -> &str {
        "Nerd Fonts"
    }

    fn binary(&self) -> &str {
        "fc-cache"
    }

    fn platform(&self) -> Platform {
        Platform::Debian
    }

    fn is_installed(&mut self, ctx: &Context<'_>) -> bool {
        !self.installed_files(ctx).is_empty()
    }

    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let files = self.installed_files(ctx);
        let removal = ctx.exec.run(
            &CommandSpec::new("rm")
                .arg("-f")
                .args(files.iter().map(|path| path.to_string_lossy().into_owned()))
                .describe(format!("Removing {} font files", files.len())),
        );
        completed(removal.is_success(), || {
            format!("Could not remove the font files: {}", removal.summary())
        })
    }

    fn cleanup(&mut self, ctx: &Context<'_>) -> Vec<String> {
        if !ctx.exec.check_exists("fc-cache") {
            return Vec::new();
        }
        match refresh_font_cache(ctx) {
            Ok(()) => Vec::new(),
            Err(e) => vec![e],
        }
    }

    fn still_present(&mut self, ctx: &Context<'_>) -> bool {
        self.is_installed(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::scripted::ScriptedExecutor;
    use crate::pipeline::{AssumeDefaults, run_install, run_uninstall};
    use crate::system::{OsFamily, test_system};

    #[test]
    fn dry_run_downloads_and_extracts_on_paper() {
        let home = tempfile::tempdir().expect("tempdir");
        let exec = ScriptedExecutor::dry_run()
            .with_binary("apt-get")
            .with_binary("curl")
            .with_binary("fc-cache");
        let system = test_system(OsFamily::Ubuntu, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let mut installer = FontArchiveInstaller::new(InstallOptions {
            fonts: vec![FontId::Meslo, FontId::Hack],
        });
        let result = run_install(&mut installer, &ctx);
        assert!(result.success, "{result:?}");
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        let extracts = result
            .planned
            .iter()
            .filter(|action| action.starts_with("extract "))
            .count();
        assert_eq!(extracts, 2);
        assert!(result.planned.iter().any(|action| action == "fc-cache -f"));
        assert!(!home.path().join(".local/share/fonts").exists());
    }

    #[test]
    fn one_failed_download_is_a_warning() {
        let home = tempfile::tempdir().expect("tempdir");
        let exec = ScriptedExecutor::new().with_binary("curl");
        exec.fail("curl -fsSL -o");
        let system = test_system(OsFamily::Debian, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let mut installer = FontArchiveInstaller::new(InstallOptions {
            fonts: vec![FontId::Meslo],
        });
        let error = installer.install_primary(&ctx).expect_err("only font failed");
        assert_eq!(error, "MesloLG Nerd Font could not be downloaded");
    }

    #[test]
    fn archives_are_downloaded_into_a_discarded_directory() {
        let home = tempfile::tempdir().expect("tempdir");
        let exec = ScriptedExecutor::new().with_binary("curl");
        exec.fail("curl -fsSL -o");
        let system = test_system(OsFamily::Debian, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let mut installer = FontArchiveInstaller::new(InstallOptions {
            fonts: vec![FontId::Hack],
        });
        assert!(installer.install_primary(&ctx).is_err());
        let download = exec
            .calls()
            .into_iter()
            .find(|call| call.starts_with("curl"))
            .expect("download");
        let archive = PathBuf::from(download.split(' ').nth(3).expect("archive"));
        assert!(archive.ends_with("Hack.zip"));
        assert_ne!(archive.parent(), Some(std::env::temp_dir().as_path()));
        assert!(!archive.parent().expect("parent").exists());
    }

    #[test]
    fn dry_run_uninstall_only_plans() {
        let home = tempfile::tempdir().expect("tempdir");
        let fonts = home.path().join(".local/share/fonts");
        std::fs::create_dir_all(&fonts).expect("mkdir");
        std::fs::write(fonts.join("HackNerdFont-Regular.ttf"), b"").expect("write");

        let exec = ScriptedExecutor::dry_run().with_binary("fc-cache");
        let system = test_system(OsFamily::Debian, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_uninstall(
            &mut FontArchiveUninstaller::new(UninstallOptions {
                fonts: vec![FontId::Hack],
            }),
            &ctx,
        );
        assert!(result.success, "{result:?}");
        assert_eq!(
            result.planned,
            vec![
                format!("rm -f {}", fonts.join("HackNerdFont-Regular.ttf").display()),
                "fc-cache -f".to_string(),
            ]
        );
        assert!(fonts.join("HackNerdFont-Regular.ttf").exists());
    }

    #[test]
    fn uninstall_removes_matching_files_and_refreshes_cache() {
        let home = tempfile::tempdir().expect("tempdir");
        let fonts = home.path().join(".local/share/fonts");
        std::fs::create_dir_all(&fonts).expect("mkdir");
        std::fs::write(fonts.join("MesloLGSNerdFont-Regular.ttf"), b"").expect("write");
        std::fs::write(fonts.join("Ubuntu-R.ttf"), b"").expect("write");

        let exec = ScriptedExecutor::new().with_binary("fc-cache");
        let system = test_system(OsFamily::Ubuntu, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults);

        let result = run_uninstall(&mut FontArchiveUninstaller::new(UninstallOptions::default()), &ctx);
        assert!(result.success);
        assert_eq!(
            exec.calls()[0],
            format!("rm -f {}", fonts.join("MesloLGSNerdFont-Regular.ttf").display())
        );
        assert!(exec.ran("fc-cache -f"));
    }
}
