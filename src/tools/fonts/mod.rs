//! Nerd Fonts: programming fonts patched with the glyphs prompt themes and
//! file-tree plugins use.

pub mod debian;
pub mod macos;

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

pub const RELEASE_BASE_URL: &str = "https://github.com/ryanoasis/nerd-fonts/releases/latest/download";

const FONT_EXTENSIONS: [&str; 2] = ["ttf", "otf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontId {
    Meslo,
    FiraCode,
    JetbrainsMono,
    Hack,
}

/// Catalog entry for one font family.
#[derive(Debug)]
pub struct FontInfo {
    pub id: FontId,
    pub name: &'static str,
    pub cask: &'static str,
    /// Asset name in the Nerd Fonts release.
    pub archive: &'static str,
    /// File name prefixes of the installed font files.
    pub file_prefixes: &'static [&'static str],
}

pub const CATALOG: [FontInfo; 4] = [
    FontInfo {
        id: FontId::Meslo,
        name: "MesloLG Nerd Font",
        cask: "font-meslo-lg-nerd-font",
        archive: "Meslo.zip",
        file_prefixes: &["MesloLG"],
    },
    FontInfo {
        id: FontId::FiraCode,
        name: "FiraCode Nerd Font",
        cask: "font-fira-code-nerd-font",
        archive: "FiraCode.zip",
        file_prefixes: &["FiraCode", "Fira Code"],
    },
    FontInfo {
        id: FontId::JetbrainsMono,
        name: "JetBrainsMono Nerd Font",
        cask: "font-jetbrains-mono-nerd-font",
        archive: "JetBrainsMono.zip",
        file_prefixes: &["JetBrainsMono", "JetBrains Mono"],
    },
    FontInfo {
        id: FontId::Hack,
        name: "Hack Nerd Font",
        cask: "font-hack-nerd-font",
        archive: "Hack.zip",
        file_prefixes: &["Hack"],
    },
];

impl FontId {
    pub const ALL: [FontId; 4] = [
        FontId::Meslo,
        FontId::FiraCode,
        FontId::JetbrainsMono,
        FontId::Hack,
    ];

    pub fn info(self) -> &'static FontInfo {
        match self {
            FontId::Meslo => &CATALOG[0],
            FontId::FiraCode => &CATALOG[1],
            FontId::JetbrainsMono => &CATALOG[2],
            FontId::Hack => &CATALOG[3],
        }
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

impl FontInfo {
    pub fn archive_url(&self) -> String {
        format!("{RELEASE_BASE_URL}/{}", self.archive)
    }

    fn matches(&self, file_name: &str) -> bool {
        is_font_file(Path::new(file_name))
            && self.file_prefixes.iter().any(|prefix| file_name.starts_with(prefix))
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FONT_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    pub fonts: Vec<FontId>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            fonts: vec![FontId::Meslo],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UninstallOptions {
    pub fonts: Vec<FontId>,
}

impl Default for UninstallOptions {
    fn default() -> Self {
        Self {
            fonts: FontId::ALL.to_vec(),
        }
    }
}

/// Font files of `font` under `dir`, searched recursively.
pub fn matching_font_files(dir: &Path, font: &FontInfo) -> Vec<PathBuf> {
    let mut found = Vec::new();
    collect_matches(dir, font, &mut found);
    found.sort();
    found
}

fn collect_matches(dir: &Path, font: &FontInfo, found: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_matches(&path, font, found);
        } else if font.matches(&entry.file_name().to_string_lossy()) {
            found.push(path);
        }
    }
}

/// Extract the `.ttf` and `.otf` entries of a release archive into `dest`,
/// flattened to their file names. Returns the written files.
pub fn extract_fonts(archive: &Path, dest: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let file = File::open(archive)
        .with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a valid zip archive", archive.display()))?;

    let mut written = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .with_context(|| format!("Failed to read entry {index} of {}", archive.display()))?;
        if !entry.is_file() {
            continue;
        }
        let Some(name) = entry.enclosed_name() else {
            continue;
        };
        if name.starts_with("__MACOSX") {
            continue;
        }
        let Some(file_name) = name.file_name().map(|n| n.to_os_string()) else {
            continue;
        };
        if !is_font_file(Path::new(&file_name)) {
            continue;
        }

        let target = dest.join(&file_name);
        let mut out = File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written.push(target);
    }
    Ok(written)
}
