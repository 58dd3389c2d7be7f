//! # Deletion Tracker
//!
//! Deletion is two-phase. A file is first *marked* (`ToDelete`), which only
//! records it together with a size/mtime snapshot. The physical delete happens
//! later, either one file at a time or in bulk, and always goes to the trash.
//!
//! ```text
//!            mark                 delete (trash)
//!   (none) ───────▶ ToDelete ─────────────────────▶ Deleted
//!      ▲              │  │                             │
//!      └── unmark ────┘  │ delete, favorite relocated  │ reconcile: file
//!                        ▼                             │ is back on disk
//!              MovedToFavoritesBackup      ToDelete ◀──┘
//! ```
//!
//! `Deleted` entries cannot be unmarked. [`DeletionTracker::reconcile`] repairs
//! the table against the disk: `Deleted` files that still exist go back to
//! `ToDelete`, and `ToDelete` files that vanished become `Deleted`.
//!
//! ## Favorites interception
//!
//! Deleting a favorite first asks whether to move it into the favorites backup
//! folder instead. If the user agrees, the file is relocated, the favorite is
//! pointed at its new location, the relocation is written to the transfer log,
//! and the entry ends in `MovedToFavoritesBackup`.
//!
//! ## Confirmation points
//!
//! Every prompt goes through a [`Confirm`]: re-marking a `ToDelete` file,
//! the favorite relocation offer, and the bulk delete of all marked files.

use crate::error::{LedgerError, Result};
use crate::favorites::FavoritesIndex;
use crate::fsops::{unique_destination, Confirm, FileOps};
use crate::history::{TransferLog, ACTION_FAVORITES_BACKUP};
use crate::stamp;
use crate::store::{CsvTable, Record};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Size/mtime placeholder for files that are already gone.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeletionStatus {
    ToDelete,
    Deleted,
    MovedToFavoritesBackup,
}

impl fmt::Display for DeletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeletionStatus::ToDelete => "ToDelete",
            DeletionStatus::Deleted => "Deleted",
            DeletionStatus::MovedToFavoritesBackup => "MovedToFavoritesBackup",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    #[serde(rename = "File Path")]
    pub path: String,
    #[serde(rename = "Delete_Status")]
    pub status: DeletionStatus,
    /// Empty in rows written before sizes were tracked; see [`DeletionTracker::refactor`].
    #[serde(rename = "File Size", default)]
    pub size: String,
    #[serde(rename = "Modification Time", default)]
    pub modified: String,
}

impl Record for DeletionRecord {
    const HEADERS: &'static [&'static str] =
        &["File Path", "Delete_Status", "File Size", "Modification Time"];
}

impl DeletionRecord {
    fn needs_backfill(&self) -> bool {
        self.size.is_empty() || self.modified.is_empty()
    }
}

/// Size in bytes and mtime of `path`, or `N/A` for both if it is unreadable.
pub fn snapshot(path: &Path) -> (String, String) {
    match fs::metadata(path) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .map(stamp::format_system_time)
                .unwrap_or_else(|_| NOT_AVAILABLE.to_string());
            (meta.len().to_string(), modified)
        }
        Err(_) => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// A new `ToDelete` entry was created.
    Marked,
    /// The file was already marked and the user confirmed the delete.
    Removed(DeletionStatus),
    /// The file was already marked and the user declined; nothing changed.
    Kept,
    /// The entry is past `ToDelete`; nothing changed.
    AlreadyHandled(DeletionStatus),
}

#[derive(Debug, Default)]
pub struct BulkDeleteReport {
    pub removed: Vec<(String, DeletionStatus)>,
    pub failed: Vec<(String, LedgerError)>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// `Deleted` entries whose file is on disk again, now `ToDelete`.
    pub restored: Vec<String>,
    /// `ToDelete` entries whose file disappeared, now `Deleted`.
    pub vanished: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.restored.is_empty() && self.vanished.is_empty()
    }
}

pub struct DeletionTracker {
    table: CsvTable<DeletionRecord>,
    favorites: Arc<FavoritesIndex>,
    transfers: Arc<TransferLog>,
    ops: Arc<dyn FileOps>,
    backup_dir: PathBuf,
    entries: Mutex<Vec<DeletionRecord>>,
}

impl DeletionTracker {
    pub fn open(
        table: CsvTable<DeletionRecord>,
        favorites: Arc<FavoritesIndex>,
        transfers: Arc<TransferLog>,
        ops: Arc<dyn FileOps>,
        backup_dir: PathBuf,
    ) -> Result<Self> {
        table.ensure_header()?;
        let mut entries: Vec<DeletionRecord> = Vec::new();
        for record in table.load()? {
            match entries.iter_mut().find(|e| e.path == record.path) {
                Some(existing) => *existing = record,
                None => entries.push(record),
            }
        }
        Ok(Self {
            table,
            favorites,
            transfers,
            ops,
            backup_dir,
            entries: Mutex::new(entries),
        })
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn status(&self, path: &str) -> Option<DeletionStatus> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.status)
    }

    pub fn entries(&self) -> Vec<DeletionRecord> {
        self.entries.lock().clone()
    }

    /// Paths currently in `ToDelete`.
    pub fn marked(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.status == DeletionStatus::ToDelete)
            .map(|e| e.path.clone())
            .collect()
    }

    /// Mark `path` for deletion, or, if it is already marked, ask whether to
    /// delete it right away.
    pub fn mark_for_deletion(&self, path: &str, confirm: &dyn Confirm) -> Result<MarkOutcome> {
        let (size, modified) = snapshot(Path::new(path));
        let current = {
            let mut entries = self.entries.lock();
            let existing = entries.iter().find(|e| e.path == path).map(|e| e.status);
            match existing {
                Some(status) => status,
                None => {
                    let mut next = entries.clone();
                    next.push(DeletionRecord {
                        path: path.to_string(),
                        status: DeletionStatus::ToDelete,
                        size,
                        modified,
                    });
                    self.table.write(&next)?;
                    *entries = next;
                    info!(path, "marked for deletion");
                    return Ok(MarkOutcome::Marked);
                }
            }
        };
        // The lock is released before prompting; `delete` re-checks the status.
        match current {
            DeletionStatus::ToDelete => {
                let prompt = format!("{path} is already marked for deletion. Delete it now?");
                if confirm.confirm(&prompt) {
                    Ok(MarkOutcome::Removed(self.delete(path, confirm)?))
                } else {
                    Ok(MarkOutcome::Kept)
                }
            }
            other => Ok(MarkOutcome::AlreadyHandled(other)),
        }
    }

    /// Physically remove `path` (trash, or favorites backup when chosen).
    ///
    /// Unmarked paths get an entry first. If the removal fails the entry is
    /// left as it was and the error is returned.
    pub fn delete(&self, path: &str, confirm: &dyn Confirm) -> Result<DeletionStatus> {
        match self.status(path) {
            Some(DeletionStatus::ToDelete) | None => {}
            Some(done) => return Ok(done),
        }

        let file = Path::new(path);
        let status = if self.favorites.check_favorites(path)
            && confirm.confirm(&format!(
                "{path} is a favorite. Move it to {} instead of deleting?",
                self.backup_dir.display()
            )) {
            self.relocate_favorite(path)?;
            DeletionStatus::MovedToFavoritesBackup
        } else {
            self.ops.trash(file).map_err(|err| {
                warn!(path, error = %err, "delete failed");
                err
            })?;
            DeletionStatus::Deleted
        };

        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        match next.iter_mut().find(|e| e.path == path) {
            Some(entry) => entry.status = status,
            None => {
                next.push(DeletionRecord {
                    path: path.to_string(),
                    status,
                    size: NOT_AVAILABLE.to_string(),
                    modified: NOT_AVAILABLE.to_string(),
                });
            }
        }
        self.table.write(&next)?;
        *entries = next;
        info!(path, %status, "deletion completed");
        Ok(status)
    }

    fn relocate_favorite(&self, path: &str) -> Result<PathBuf> {
        let file = Path::new(path);
        let name = file
            .file_name()
            .ok_or_else(|| LedgerError::NotFound(file.to_path_buf()))?;
        fs::create_dir_all(&self.backup_dir)?;
        let target = unique_destination(&self.backup_dir, name);
        self.ops.move_file(file, &target).map_err(|err| {
            warn!(path, error = %err, "favorite relocation failed");
            err
        })?;

        // The file has moved; the remaining bookkeeping must not undo that.
        let target_str = target.to_string_lossy();
        if let Err(err) = self.favorites.update_favorite_path(path, &target_str) {
            warn!(path, error = %err, "favorite path not updated after relocation");
        }
        if let Err(err) = self
            .transfers
            .record(path, &target_str, ACTION_FAVORITES_BACKUP)
        {
            warn!(path, error = %err, "relocation not written to transfer log");
        }
        info!(path, target = %target.display(), "favorite relocated to backup");
        Ok(target)
    }

    /// Delete every `ToDelete` entry after a single confirmation.
    ///
    /// Returns `None` if there was nothing to delete or the user declined.
    pub fn delete_marked(&self, confirm: &dyn Confirm) -> Result<Option<BulkDeleteReport>> {
        let marked = self.marked();
        if marked.is_empty() {
            return Ok(None);
        }
        let prompt = format!("Delete {} marked file(s)?", marked.len());
        if !confirm.confirm(&prompt) {
            return Ok(None);
        }
        let mut report = BulkDeleteReport::default();
        for path in marked {
            match self.delete(&path, confirm) {
                Ok(status) => report.removed.push((path, status)),
                Err(err) => report.failed.push((path, err)),
            }
        }
        Ok(Some(report))
    }

    /// Drop a `ToDelete` entry. Anything else is rejected with `false`.
    pub fn remove_from_deletion(&self, path: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        let Some(pos) = entries.iter().position(|e| e.path == path) else {
            return Ok(false);
        };
        if entries[pos].status != DeletionStatus::ToDelete {
            warn!(path, status = %entries[pos].status, "cannot unmark");
            return Ok(false);
        }
        let mut next = entries.clone();
        next.remove(pos);
        self.table.write(&next)?;
        *entries = next;
        info!(path, "unmarked for deletion");
        Ok(true)
    }

    /// Bring statuses back in line with what is on disk.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        for entry in next.iter_mut() {
            let exists = Path::new(&entry.path).exists();
            match entry.status {
                DeletionStatus::Deleted if exists => {
                    entry.status = DeletionStatus::ToDelete;
                    report.restored.push(entry.path.clone());
                }
                DeletionStatus::ToDelete if !exists => {
                    entry.status = DeletionStatus::Deleted;
                    report.vanished.push(entry.path.clone());
                }
                _ => {}
            }
        }
        if !report.is_empty() {
            self.table.write(&next)?;
            *entries = next;
            info!(
                restored = report.restored.len(),
                vanished = report.vanished.len(),
                "deletion table reconciled"
            );
        }
        Ok(report)
    }

    /// Fill in size/mtime for rows that predate those columns.
    pub fn refactor(&self) -> Result<usize> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        let mut filled = 0;
        for entry in next.iter_mut().filter(|e| e.needs_backfill()) {
            let (size, modified) = snapshot(Path::new(&entry.path));
            if entry.size.is_empty() {
                entry.size = size;
            }
            if entry.modified.is_empty() {
                entry.modified = modified;
            }
            filled += 1;
        }
        if filled > 0 {
            self.table.write(&next)?;
            *entries = next;
            info!(filled, "deletion table backfilled");
        }
        Ok(filled)
    }

    /// Re-key the entry for a file that moved. An entry already at `new_path`
    /// is replaced.
    pub fn update_path(&self, old_path: &str, new_path: &str) -> Result<bool> {
        if old_path == new_path {
            return Ok(false);
        }
        let mut entries = self.entries.lock();
        if !entries.iter().any(|e| e.path == old_path) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.retain(|e| e.path != new_path);
        if let Some(entry) = next.iter_mut().find(|e| e.path == old_path) {
            entry.path = new_path.to_string();
        }
        self.table.write(&next)?;
        *entries = next;
        Ok(true)
    }
}
