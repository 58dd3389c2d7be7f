//! # Ledger Facade
//!
//! [`Ledger`] is the single entry point for embedding medialedger. It opens the
//! five tables in one data directory, wires the shared pieces (the transfer log
//! is read by notes and written by the orchestrator and the deletion tracker),
//! and hands out each component.
//!
//! The facade holds no state of its own besides the config. It adds one
//! cross-index query, [`Ledger::properties`], that answers "what do we know
//! about this file?" by resolving related paths first and then asking every
//! index.
//!
//! ```ignore
//! let ledger = Ledger::open(LedgerConfig::load(None)?)?;
//! ledger.categories().add_to_category("Travel", "/videos/rome.mp4")?;
//! let moved = ledger.mover().move_file(Path::new("/videos/rome.mp4"), Path::new("/archive"));
//! ```

use crate::categories::CategoryIndex;
use crate::config::LedgerConfig;
use crate::deletion::{DeletionStatus, DeletionTracker};
use crate::error::Result;
use crate::favorites::FavoritesIndex;
use crate::fsops::{FileOps, FolderTrash, ScanReindex, Scheduler, SystemFileOps, ThreadScheduler};
use crate::history::{PathHistory, TransferLog};
use crate::notes::{NoteRecord, NotesIndex};
use crate::orchestrator::{Indices, MoveOrchestrator};
use crate::store::{
    CsvTable, CATEGORIES_FILE, DELETION_FILE, FAVORITES_FILE, NOTES_FILE, TRANSFER_LOG_FILE,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Everything the indices know about one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileProperties {
    pub path: String,
    pub exists: bool,
    /// Every path the file had, per the transfer log.
    pub related_paths: BTreeSet<String>,
    /// Categories of the file under any of its paths.
    pub categories: BTreeSet<String>,
    pub note: Option<NoteRecord>,
    pub favorite: bool,
    pub deletion: Option<DeletionStatus>,
    pub history: PathHistory,
}

pub struct Ledger {
    config: LedgerConfig,
    transfers: Arc<TransferLog>,
    categories: Arc<CategoryIndex>,
    notes: Arc<NotesIndex>,
    favorites: Arc<FavoritesIndex>,
    deletion: Arc<DeletionTracker>,
    mover: MoveOrchestrator,
}

impl Ledger {
    /// Open with the system trash and background re-indexing.
    pub fn open(config: LedgerConfig) -> Result<Self> {
        Self::open_with(config, Arc::new(ThreadScheduler))
    }

    /// Open with default settings rooted at `dir`.
    pub fn open_in(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open(LedgerConfig::in_dir(dir))
    }

    pub fn open_with(config: LedgerConfig, scheduler: Arc<dyn Scheduler>) -> Result<Self> {
        let ops: Arc<dyn FileOps> = match &config.trash_dir {
            Some(dir) => Arc::new(FolderTrash::new(dir)),
            None => Arc::new(SystemFileOps),
        };
        Self::assemble(config, ops, scheduler)
    }

    pub fn assemble(
        config: LedgerConfig,
        ops: Arc<dyn FileOps>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        let dir = config.data_dir();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "opening ledger");

        let transfers = Arc::new(TransferLog::open(CsvTable::new(dir.join(TRANSFER_LOG_FILE)))?);
        let categories = Arc::new(CategoryIndex::open(CsvTable::new(dir.join(CATEGORIES_FILE)))?);
        let notes = Arc::new(
            NotesIndex::open(CsvTable::new(dir.join(NOTES_FILE)), transfers.clone())?
                .with_basename_fallback(config.basename_fallback),
        );
        let favorites = Arc::new(
            FavoritesIndex::open(CsvTable::new(dir.join(FAVORITES_FILE)))?
                .with_hash_len(config.favorite_hash_len),
        );
        let deletion = Arc::new(DeletionTracker::open(
            CsvTable::new(dir.join(DELETION_FILE)),
            favorites.clone(),
            transfers.clone(),
            ops.clone(),
            config.favorites_backup_dir(),
        )?);
        let reindex = Arc::new(ScanReindex::new(&config.media_extensions()));
        let mover = MoveOrchestrator::new(
            Indices {
                transfers: transfers.clone(),
                deletion: deletion.clone(),
                favorites: favorites.clone(),
                categories: categories.clone(),
                notes: notes.clone(),
            },
            ops,
            scheduler,
            reindex,
        );

        Ok(Self {
            config,
            transfers,
            categories,
            notes,
            favorites,
            deletion,
            mover,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config.data_dir()
    }

    pub fn transfers(&self) -> &Arc<TransferLog> {
        &self.transfers
    }

    pub fn categories(&self) -> &Arc<CategoryIndex> {
        &self.categories
    }

    pub fn notes(&self) -> &Arc<NotesIndex> {
        &self.notes
    }

    pub fn favorites(&self) -> &Arc<FavoritesIndex> {
        &self.favorites
    }

    pub fn deletion(&self) -> &Arc<DeletionTracker> {
        &self.deletion
    }

    pub fn mover(&self) -> &MoveOrchestrator {
        &self.mover
    }

    /// Replace the move pipeline, e.g. to add hooks with
    /// [`MoveOrchestrator::with_hook`].
    pub fn map_mover(mut self, f: impl FnOnce(MoveOrchestrator) -> MoveOrchestrator) -> Self {
        self.mover = f(self.mover);
        self
    }

    /// Resolve related paths, then collect what each index knows.
    ///
    /// Categories and favorite membership are gathered across every related
    /// path. The deletion status is the one recorded at `path`, or else the
    /// first related path (in path order) that has one.
    pub fn properties(&self, path: &str) -> FileProperties {
        let related_paths = self.transfers.related_paths(path);
        let categories = related_paths
            .iter()
            .flat_map(|p| self.categories.categories_of_file(p))
            .collect();
        let favorite = related_paths
            .iter()
            .any(|p| self.favorites.check_favorites(p));
        let deletion = self.deletion.status(path).or_else(|| {
            related_paths
                .iter()
                .filter(|p| p.as_str() != path)
                .find_map(|p| self.deletion.status(p))
        });
        FileProperties {
            path: path.to_string(),
            exists: Path::new(path).exists(),
            categories,
            note: self.notes.get_note(path),
            favorite,
            deletion,
            history: self.transfers.history(path),
            related_paths,
        }
    }
}
