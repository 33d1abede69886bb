//! Nerd Fonts from Homebrew casks.

use std::path::PathBuf;

use super::{FontId, InstallOptions, UninstallOptions, matching_font_files};
use crate::exec::CommandSpec;
use crate::pipeline::{Context, Installed, Installer, StepOutcome, Uninstaller};
use crate::platform::Platform;
use crate::platform::homebrew::{BrewKind, Homebrew};

fn fonts_dir(ctx: &Context<'_>) -> PathBuf {
    ctx.home("Library/Fonts")
}

pub struct FontCaskInstaller {
    options: InstallOptions,
    brew: Homebrew,
    failed: Vec<FontId>,
}

impl FontCaskInstaller {
    pub fn new(options: InstallOptions) -> Self {
        Self {
            options,
            brew: Homebrew::new(),
            failed: Vec::new(),
        }
    }
}

impl Installer for FontCaskInstaller {
    fn name(&self) -> &str {
        "Nerd Fonts"
    }

    fn binary(&self) -> &str {
        "brew"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn check_existing(&mut self, ctx: &Context<'_>) -> bool {
        !self.options.fonts.is_empty()
            && self
                .options
                .fonts
                .iter()
                .all(|font| self.brew.is_installed(ctx, font.info().cask, BrewKind::Cask))
    }

    fn ensure_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        self.brew.ensure(ctx)
    }

    fn refresh_package_manager(&mut self, ctx: &Context<'_>) -> bool {
        self.brew.update(ctx)
    }

    /// Succeeds when at least one font was installed; each font that failed
    /// becomes a warning.
    fn install_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        if self.options.fonts.is_empty() {
            return Err("No fonts were selected".to_string());
        }
        self.failed.clear();
        let mut warnings = Vec::new();
        for font in self.options.fonts.clone() {
            if ctx.exec.interrupted() {
                return Err(format!("Interrupted before installing {font}"));
            }
            match self.brew.install_or_upgrade(ctx, font.info().cask, BrewKind::Cask) {
                Ok(upgrade_warnings) => warnings.extend(upgrade_warnings),
                Err(e) => {
                    warnings.push(format!("{font} could not be installed: {e}"));
                    self.failed.push(font);
                }
            }
        }
        if self.failed.len() == self.options.fonts.len() {
            return Err("None of the selected fonts could be installed".to_string());
        }
        Ok(warnings)
    }

    fn verify(&mut self, ctx: &Context<'_>) -> Option<Installed> {
        let fonts: Vec<FontId> = self
            .options
            .fonts
            .iter()
            .copied()
            .filter(|font| !self.failed.contains(font))
            .collect();
        let present = fonts
            .into_iter()
            .any(|font| self.brew.is_installed(ctx, font.info().cask, BrewKind::Cask));
        present.then(|| Installed {
            path: Some(fonts_dir(ctx)),
            version: None,
        })
    }

    fn notes(&self, _ctx: &Context<'_>) -> Vec<String> {
        vec!["Select the Nerd Font in your terminal's profile settings".to_string()]
    }
}

pub struct FontCaskUninstaller {
    options: UninstallOptions,
    brew: Homebrew,
}

impl FontCaskUninstaller {
    pub fn new(options: UninstallOptions) -> Self {
        Self {
            options,
            brew: Homebrew::new(),
        }
    }

    fn installed_fonts(&mut self, ctx: &Context<'_>) -> Vec<FontId> {
        let dir = fonts_dir(ctx);
        self.options
            .fonts
            .clone()
            .into_iter()
            .filter(|font| {
                self.brew.is_installed(ctx, font.info().cask, BrewKind::Cask)
                    || !matching_font_files(&dir, font.info()).is_empty()
            })
            .collect()
    }
}

impl Uninstaller for FontCaskUninstaller {
    fn name(&self) -> &str {
        "Nerd Fonts"
    }

    fn binary(&self) -> &str {
        "brew"
    }

    fn platform(&self) -> Platform {
        Platform::MacOs
    }

    fn is_installed(&mut self, ctx: &Context<'_>) -> bool {
        !self.installed_fonts(ctx).is_empty()
    }

    /// Casks go through Homebrew; files copied by hand are deleted directly.
    /// Fails only when no font could be removed.
    fn remove_primary(&mut self, ctx: &Context<'_>) -> StepOutcome {
        let dir = fonts_dir(ctx);
        let fonts = self.installed_fonts(ctx);
        let mut warnings = Vec::new();
        for font in &fonts {
            let info = font.info();
            if self.brew.is_installed(ctx, info.cask, BrewKind::Cask) {
                if !self.brew.uninstall(ctx, info.cask, BrewKind::Cask) {
                    warnings.push(format!("brew uninstall --cask {} failed", info.cask));
                }
                continue;
            }
            let files = matching_font_files(&dir, info);
            let result = ctx.exec.run(
                &CommandSpec::new("rm")
                    .arg("-f")
                    .args(files.iter().map(|path| path.to_string_lossy().into_owned()))
                    .describe(format!("Removing {font}")),
            );
            if !result.is_success() {
                warnings.push(format!("Could not remove the {font} files: {}", result.summary()));
            }
        }
        if !fonts.is_empty() && warnings.len() == fonts.len() {
            return Err(warnings.join("; "));
        }
        Ok(warnings)
    }

    fn still_present(&mut self, ctx: &Context<'_>) -> bool {
        self.is_installed(ctx)
    }
}
