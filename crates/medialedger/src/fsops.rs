//! # Collaborators
//!
//! The indices never touch the filesystem or the user directly. Everything with
//! side effects outside the data directory goes through one of these seams:
//!
//! - [`FileOps`]: move-or-fail and reversible delete. [`SystemFileOps`] uses
//!   `rename` and the platform trash; [`FolderTrash`] sends deletions into a
//!   plain directory instead (useful for headless boxes and for tests).
//! - [`Confirm`]: the yes/no prompt. Any `Fn(&str) -> bool` is a `Confirm`.
//! - [`Scheduler`]: fire-and-forget background work.
//! - [`Reindex`]: what to do with folders whose contents changed.

use crate::error::{LedgerError, Result};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub trait FileOps: Send + Sync {
    /// Move `src` to `dst`. `dst` must not exist.
    fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Reversible delete.
    fn trash(&self, path: &Path) -> Result<()>;
}

/// Move `src` to `dst`, falling back to copy + remove when `rename` cannot
/// cross filesystems.
pub fn rename_or_copy(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
            ) =>
        {
            Err(err)
        }
        Err(err) => {
            warn!(src = %src.display(), error = %err, "rename failed, copying instead");
            fs::copy(src, dst)?;
            if let Err(remove_err) = fs::remove_file(src) {
                let _ = fs::remove_file(dst);
                return Err(remove_err);
            }
            Ok(())
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFileOps;

impl FileOps for SystemFileOps {
    fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        rename_or_copy(src, dst)
    }

    fn trash(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(LedgerError::NotFound(path.to_path_buf()));
        }
        trash::delete(path).map_err(|e| LedgerError::Trash(e.to_string()))
    }
}

/// Deletes by moving files into `dir`, never overwriting earlier ones.
#[derive(Debug, Clone)]
pub struct FolderTrash {
    dir: PathBuf,
}

impl FolderTrash {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileOps for FolderTrash {
    fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        rename_or_copy(src, dst)
    }

    fn trash(&self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .ok_or_else(|| LedgerError::NotFound(path.to_path_buf()))?;
        if !path.is_file() {
            return Err(LedgerError::NotFound(path.to_path_buf()));
        }
        fs::create_dir_all(&self.dir)?;
        let target = unique_destination(&self.dir, name);
        rename_or_copy(path, &target)?;
        Ok(())
    }
}

/// `dir/name`, or `dir/stem (N).ext` with the smallest N that does not exist.
pub fn unique_destination(dir: &Path, name: &OsStr) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{stem} ({n}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Yes/no decision point.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    fn spawn(&self, task: Task);
}

/// Runs each task on its own detached thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn spawn(&self, task: Task) {
        let spawned = std::thread::Builder::new()
            .name("medialedger-bg".into())
            .spawn(task);
        if let Err(err) = spawned {
            warn!(error = %err, "could not start background task");
        }
    }
}

/// Runs tasks on the caller's thread. Short-lived processes use this so the
/// work is not lost at exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn spawn(&self, task: Task) {
        task();
    }
}

pub trait Reindex: Send + Sync {
    /// Returns how many media files were seen.
    fn reindex(&self, folders: &[PathBuf]) -> usize;
}

/// Counts media files directly inside each folder.
#[derive(Debug, Clone)]
pub struct ScanReindex {
    extensions: Vec<String>,
}

impl ScanReindex {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|x| *x == e))
    }
}

impl Reindex for ScanReindex {
    fn reindex(&self, folders: &[PathBuf]) -> usize {
        let mut total = 0;
        for folder in folders {
            let count = WalkDir::new(folder)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file() && self.is_media(entry.path()))
                .count();
            info!(folder = %folder.display(), count, "folder re-indexed");
            total += count;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn unique_destination_counts_up() {
        let dir = tempdir().unwrap();
        let name = OsStr::new("clip.mp4");
        assert_eq!(unique_destination(dir.path(), name), dir.path().join("clip.mp4"));

        fs::write(dir.path().join("clip.mp4"), b"a").unwrap();
        assert_eq!(
            unique_destination(dir.path(), name),
            dir.path().join("clip (1).mp4")
        );

        fs::write(dir.path().join("clip (1).mp4"), b"b").unwrap();
        assert_eq!(
            unique_destination(dir.path(), name),
            dir.path().join("clip (2).mp4")
        );
    }

    #[test]
    fn unique_destination_without_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("README"), b"a").unwrap();
        assert_eq!(
            unique_destination(dir.path(), OsStr::new("README")),
            dir.path().join("README (1)")
        );
    }

    #[test]
    fn folder_trash_keeps_both_copies() {
        let dir = tempdir().unwrap();
        let trash_dir = dir.path().join("trash");
        let ops = FolderTrash::new(&trash_dir);

        for content in [b"one", b"two"] {
            let file = dir.path().join("a.mp4");
            fs::write(&file, content).unwrap();
            ops.trash(&file).unwrap();
            assert!(!file.exists());
        }
        assert!(trash_dir.join("a.mp4").exists());
        assert!(trash_dir.join("a (1).mp4").exists());
    }

    #[test]
    fn folder_trash_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let ops = FolderTrash::new(dir.path().join("trash"));
        let err = ops.trash(&dir.path().join("ghost.mp4")).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn move_missing_source_fails() {
        let dir = tempdir().unwrap();
        let err = rename_or_copy(&dir.path().join("nope"), &dir.path().join("dst")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn closures_confirm() {
        let yes = |_: &str| true;
        let no = |_: &str| false;
        assert!(yes.confirm("?"));
        assert!(!no.confirm("?"));
    }

    #[test]
    fn thread_scheduler_runs_task() {
        let (tx, rx) = mpsc::channel();
        ThreadScheduler.spawn(Box::new(move || {
            tx.send(7).unwrap();
        }));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }

    #[test]
    fn scan_counts_media_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.MP4"), b"").unwrap();
        fs::write(dir.path().join("b.mkv"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.mp4"), b"").unwrap();

        let scan = ScanReindex::new(&["mp4".to_string(), ".mkv".to_string()]);
        assert_eq!(scan.reindex(&[dir.path().to_path_buf()]), 2);
    }
}
