//! Timestamped copies taken before anything is overwritten or removed.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::info;

use super::Context;
use crate::exec::CommandSpec;

/// Suffix format: `<original>.backup.YYYYMMDD_HHMMSS`.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn backup_path(original: &Path, at: NaiveDateTime) -> PathBuf {
    let suffix = format!(".backup.{}", at.format(BACKUP_TIMESTAMP_FORMAT));
    match original.file_name() {
        Some(name) => {
            let mut name = name.to_os_string();
            name.push(suffix);
            original.with_file_name(name)
        }
        None => {
            let mut raw = original.as_os_str().to_os_string();
            raw.push(suffix);
            PathBuf::from(raw)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Nothing exists at the original path.
    Absent,
    Created(PathBuf),
    Failed(String),
}

/// Copy `original` next to itself under a timestamped name. The original is
/// left in place.
pub fn backup_existing(ctx: &Context<'_>, original: &Path) -> BackupOutcome {
    if original.symlink_metadata().is_err() {
        return BackupOutcome::Absent;
    }

    let destination = backup_path(original, ctx.now());
    let result = ctx.exec.run(
        &CommandSpec::new("cp")
            .arg("-Rp")
            .path_arg(original)
            .path_arg(&destination)
            .describe(format!("Backing up {}", original.display())),
    );
    if result.is_success() {
        info!(
            "Backed up {} to {}",
            original.display(),
            destination.display()
        );
        BackupOutcome::Created(destination)
    } else {
        BackupOutcome::Failed(format!(
            "Could not back up {}: {}",
            original.display(),
            result.summary()
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::exec::CommandResult;
    use crate::exec::scripted::ScriptedExecutor;
    use crate::pipeline::AssumeDefaults;
    use crate::system::{OsFamily, test_system};

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(10, 15, 30))
            .expect("valid timestamp")
    }

    #[test]
    fn backup_name_carries_timestamp_suffix() {
        assert_eq!(
            backup_path(Path::new("/home/dev/.config/tool"), stamp()),
            PathBuf::from("/home/dev/.config/tool.backup.20240301_101530")
        );
        assert_eq!(
            backup_path(Path::new("/home/dev/.zshrc"), stamp()),
            PathBuf::from("/home/dev/.zshrc.backup.20240301_101530")
        );
    }

    #[test]
    fn copies_existing_path_without_touching_it() {
        let home = tempfile::tempdir().expect("tempdir");
        let original = home.path().join(".config/tool");
        std::fs::create_dir_all(&original).expect("mkdir");

        let exec = ScriptedExecutor::new();
        let system = test_system(OsFamily::Ubuntu, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults).at(stamp());

        let expected = home.path().join(".config/tool.backup.20240301_101530");
        assert_eq!(
            backup_existing(&ctx, &original),
            BackupOutcome::Created(expected.clone())
        );
        assert_eq!(
            exec.calls(),
            vec![format!("cp -Rp {} {}", original.display(), expected.display())]
        );
        assert!(original.is_dir());
    }

    #[test]
    fn missing_original_is_not_an_error() {
        let exec = ScriptedExecutor::new();
        let system = test_system(OsFamily::MacOs, PathBuf::from("/nonexistent-home"));
        let ctx = Context::new(&exec, &system, &AssumeDefaults);
        assert_eq!(
            backup_existing(&ctx, Path::new("/nonexistent-home/.zshrc")),
            BackupOutcome::Absent
        );
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn failed_copy_is_reported() {
        let home = tempfile::tempdir().expect("tempdir");
        let original = home.path().join(".zshrc");
        std::fs::write(&original, "export A=1\n").expect("write");

        let exec = ScriptedExecutor::new();
        exec.respond("cp", CommandResult::completed(1, "", "Permission denied"));
        let system = test_system(OsFamily::Ubuntu, home.path().to_path_buf());
        let ctx = Context::new(&exec, &system, &AssumeDefaults).at(stamp());

        match backup_existing(&ctx, &original) {
            BackupOutcome::Failed(message) => assert!(message.contains("Permission denied")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
