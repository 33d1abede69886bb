//! Direct file writes that bypass the executor.
//!
//! Every helper honors dry-run by recording the write instead of performing it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::Context;

/// Private working directory for downloads. The directory and everything in
/// it are deleted when the value is dropped.
#[derive(Debug)]
pub struct Scratch {
    path: PathBuf,
    _dir: Option<TempDir>,
}

impl Scratch {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }
}

/// Create a `0700` scratch directory. Dry runs get a placeholder path and
/// nothing is created.
pub fn scratch_dir(ctx: &Context<'_>) -> io::Result<Scratch> {
    if ctx.exec.is_dry_run() {
        return Ok(Scratch {
            path: std::env::temp_dir().join("devbootstrap.XXXXXX"),
            _dir: None,
        });
    }
    let dir = tempfile::Builder::new().prefix("devbootstrap.").tempdir()?;
    Ok(Scratch {
        path: dir.path().to_path_buf(),
        _dir: Some(dir),
    })
}

/// Replace `path` with `contents`, creating parent directories as needed.
pub fn write_file(ctx: &Context<'_>, path: &Path, contents: &str) -> io::Result<()> {
    if ctx.exec.is_dry_run() {
        ctx.exec
            .note_planned(&format!("write {} ({} bytes)", path.display(), contents.len()));
        return Ok(());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    write_file_atomic(path, contents)
}

/// Append `text` to `path`, creating it when missing.
pub fn append_to_file(ctx: &Context<'_>, path: &Path, text: &str) -> io::Result<()> {
    if ctx.exec.is_dry_run() {
        ctx.exec.note_planned(&format!("append to {}", path.display()));
        return Ok(());
    }
    let existing = match fs::read_to_string(path) {
        Ok(existing) => existing,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    write_file_atomic(path, &format!("{existing}{text}"))
}

fn write_file_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)
}
