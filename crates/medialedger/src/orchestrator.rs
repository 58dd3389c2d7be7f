//! # Move Orchestrator
//!
//! Moving a file is the one operation that touches every index. The physical
//! move happens first; after that a fixed pipeline of hooks brings each index
//! up to date:
//!
//! 1. `log_transfer`: structured log line
//! 2. `transfer_csv`: append to the transfer log
//! 3. `deletion`: re-key the deletion entry
//! 4. `favorites`: rehash the favorite, if the file is one
//! 5. `categories`: carry every category over to the new path
//! 6. `stats`: moved file/byte counters, then any hooks added with
//!    [`MoveOrchestrator::with_hook`]
//! 7. `notes`: re-key the note
//!
//! Hooks are isolated from each other. A hook that returns an error or panics
//! is logged and reported in [`MoveOutcome::Moved`], and the remaining hooks
//! still run. There is no rollback: the file already moved, so a partially
//! updated set of indices is preferred over an aborted one.
//!
//! [`MoveOrchestrator::move_files`] moves a batch and then schedules a single
//! re-index of every folder it touched.

use crate::categories::CategoryIndex;
use crate::deletion::DeletionTracker;
use crate::error::{LedgerError, Result};
use crate::favorites::FavoritesIndex;
use crate::fsops::{unique_destination, FileOps, Reindex, Scheduler};
use crate::history::{TransferLog, ACTION_MOVED};
use crate::notes::NotesIndex;
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeSet;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub type HookFn = Box<dyn Fn(&str, &str) -> Result<()> + Send + Sync>;

/// A named step of the post-move pipeline.
pub struct Hook {
    pub name: String,
    run: HookFn,
}

impl Hook {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&str, &str) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    /// Run the hook, turning errors and panics into a [`LedgerError::Hook`].
    fn apply(&self, old_path: &str, new_path: &str) -> Result<()> {
        let message = match catch_unwind(AssertUnwindSafe(|| (self.run)(old_path, new_path))) {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => err.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        warn!(hook = %self.name, old_path, new_path, %message, "move hook failed");
        Err(LedgerError::Hook {
            name: self.name.clone(),
            message,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}

#[derive(Debug)]
pub enum MoveOutcome {
    Moved {
        dest: PathBuf,
        hook_failures: Vec<LedgerError>,
    },
    /// Nothing to do; no table was touched.
    Skipped(String),
    /// The file did not move; no hook ran.
    Failed(String),
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }

    pub fn dest(&self) -> Option<&Path> {
        match self {
            MoveOutcome::Moved { dest, .. } => Some(dest),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveStats {
    pub files: u64,
    pub bytes: u64,
}

pub struct MoveOrchestrator {
    ops: Arc<dyn FileOps>,
    scheduler: Arc<dyn Scheduler>,
    reindex: Arc<dyn Reindex>,
    stats: Arc<Mutex<MoveStats>>,
    hooks: Vec<Hook>,
    extra: Vec<Hook>,
    tail: Vec<Hook>,
}

pub struct Indices {
    pub transfers: Arc<TransferLog>,
    pub deletion: Arc<DeletionTracker>,
    pub favorites: Arc<FavoritesIndex>,
    pub categories: Arc<CategoryIndex>,
    pub notes: Arc<NotesIndex>,
}

impl MoveOrchestrator {
    pub fn new(
        indices: Indices,
        ops: Arc<dyn FileOps>,
        scheduler: Arc<dyn Scheduler>,
        reindex: Arc<dyn Reindex>,
    ) -> Self {
        let Indices {
            transfers,
            deletion,
            favorites,
            categories,
            notes,
        } = indices;
        let stats = Arc::new(Mutex::new(MoveStats::default()));

        let counters = stats.clone();
        let hooks = vec![
            Hook::new("log_transfer", |old: &str, new: &str| {
                info!(target: "medialedger::transfer", from = old, to = new, "file moved");
                Ok(())
            }),
            Hook::new("transfer_csv", move |old: &str, new: &str| {
                transfers.record(old, new, ACTION_MOVED).map(|_| ())
            }),
            Hook::new("deletion", move |old: &str, new: &str| {
                deletion.update_path(old, new).map(|_| ())
            }),
            Hook::new("favorites", move |old: &str, new: &str| {
                if favorites.check_favorites(old) {
                    favorites.update_favorite_path(old, new)?;
                }
                Ok(())
            }),
            Hook::new("categories", move |old: &str, new: &str| {
                categories.migrate_path(old, new).map(|_| ())
            }),
            Hook::new("stats", move |_old: &str, new: &str| {
                let size = fs::metadata(new)?.len();
                let mut stats = counters.lock();
                stats.files += 1;
                stats.bytes += size;
                Ok(())
            }),
        ];
        let tail = vec![Hook::new("notes", move |old: &str, new: &str| {
            notes.update_note_key(old, new).map(|_| ())
        })];

        Self {
            ops,
            scheduler,
            reindex,
            stats,
            hooks,
            extra: Vec::new(),
            tail,
        }
    }

    /// Add a hook that runs after the built-in stats hook and before notes.
    pub fn with_hook<F>(mut self, name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&str, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.extra.push(Hook::new(name, run));
        self
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.pipeline().map(|h| h.name.as_str()).collect()
    }

    pub fn stats(&self) -> MoveStats {
        *self.stats.lock()
    }

    fn pipeline(&self) -> impl Iterator<Item = &Hook> {
        self.hooks.iter().chain(&self.extra).chain(&self.tail)
    }

    /// Move `src` into `dest_folder`, renaming on collision.
    pub fn move_file(&self, src: &Path, dest_folder: &Path) -> MoveOutcome {
        if !src.is_file() {
            warn!(src = %src.display(), "move source missing");
            return MoveOutcome::Failed(format!("{} does not exist", src.display()));
        }
        let Some(name) = src.file_name() else {
            return MoveOutcome::Failed(format!("{} has no file name", src.display()));
        };
        if src.parent().is_some_and(|parent| same_folder(parent, dest_folder)) {
            return MoveOutcome::Skipped(format!(
                "{} is already in {}",
                src.display(),
                dest_folder.display()
            ));
        }
        if !dest_folder.is_dir() {
            warn!(dest = %dest_folder.display(), "move destination is not a folder");
            return MoveOutcome::Failed(format!("{} is not a folder", dest_folder.display()));
        }

        let dest = unique_destination(dest_folder, name);
        if let Err(err) = self.ops.move_file(src, &dest) {
            warn!(src = %src.display(), dest = %dest.display(), error = %err, "move failed");
            return MoveOutcome::Failed(err.to_string());
        }

        let old_path = src.to_string_lossy();
        let new_path = dest.to_string_lossy();
        let hook_failures: Vec<LedgerError> = self
            .pipeline()
            .filter_map(|hook| hook.apply(&old_path, &new_path).err())
            .collect();

        MoveOutcome::Moved {
            dest,
            hook_failures,
        }
    }

    /// Move each path into `dest_folder`, then re-index the touched folders
    /// once in the background.
    pub fn move_files(&self, paths: &[PathBuf], dest_folder: &Path) -> Vec<(PathBuf, MoveOutcome)> {
        let mut folders = BTreeSet::new();
        let outcomes: Vec<(PathBuf, MoveOutcome)> = paths
            .iter()
            .map(|src| {
                let outcome = self.move_file(src, dest_folder);
                if outcome.is_moved() {
                    if let Some(parent) = src.parent() {
                        folders.insert(parent.to_path_buf());
                    }
                }
                (src.clone(), outcome)
            })
            .collect();

        if !folders.is_empty() {
            folders.insert(dest_folder.to_path_buf());
            let folders: Vec<PathBuf> = folders.into_iter().collect();
            let reindex = self.reindex.clone();
            self.scheduler.spawn(Box::new(move || {
                reindex.reindex(&folders);
            }));
        }
        outcomes
    }
}

fn same_folder(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
