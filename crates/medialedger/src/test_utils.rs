use crate::categories::CategoryIndex;
use crate::config::LedgerConfig;
use crate::deletion::DeletionTracker;
use crate::favorites::FavoritesIndex;
use crate::fsops::{FileOps, FolderTrash, InlineScheduler, Reindex, ScanReindex, Scheduler};
use crate::history::TransferLog;
use crate::ledger::Ledger;
use crate::notes::NotesIndex;
use crate::orchestrator::{Indices, MoveOrchestrator};
use crate::store::{
    CsvTable, CATEGORIES_FILE, DELETION_FILE, FAVORITES_FILE, NOTES_FILE, TRANSFER_LOG_FILE,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A temp directory with `data/`, `media/`, `trash/` and one shared set of
/// indices over `data/`.
pub struct TestEnv {
    // We keep _temp_dir to ensure the directory is not dropped until the test is done
    pub _temp_dir: TempDir,
    pub root: PathBuf,
    pub transfers: Arc<TransferLog>,
    pub categories: Arc<CategoryIndex>,
    pub notes: Arc<NotesIndex>,
    pub favorites: Arc<FavoritesIndex>,
    pub deletion: Arc<DeletionTracker>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        for dir in ["data", "media"] {
            fs::create_dir_all(root.join(dir)).expect("failed to create test dirs");
        }
        let data = root.join("data");

        let transfers = Arc::new(
            TransferLog::open(CsvTable::new(data.join(TRANSFER_LOG_FILE))).expect("transfer log"),
        );
        let categories = Arc::new(
            CategoryIndex::open(CsvTable::new(data.join(CATEGORIES_FILE))).expect("categories"),
        );
        let notes = Arc::new(
            NotesIndex::open(CsvTable::new(data.join(NOTES_FILE)), transfers.clone())
                .expect("notes"),
        );
        let favorites = Arc::new(
            FavoritesIndex::open(CsvTable::new(data.join(FAVORITES_FILE))).expect("favorites"),
        );
        let deletion = Arc::new(Self::deletion_over(
            &root,
            favorites.clone(),
            transfers.clone(),
        ));

        Self {
            _temp_dir: temp_dir,
            root,
            transfers,
            categories,
            notes,
            favorites,
            deletion,
        }
    }

    fn deletion_over(
        root: &std::path::Path,
        favorites: Arc<FavoritesIndex>,
        transfers: Arc<TransferLog>,
    ) -> DeletionTracker {
        DeletionTracker::open(
            CsvTable::new(root.join("data").join(DELETION_FILE)),
            favorites,
            transfers,
            Arc::new(FolderTrash::new(root.join("trash"))),
            root.join("favorites_backup"),
        )
        .expect("deletion tracker")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root.join("media")
    }

    pub fn trash_dir(&self) -> PathBuf {
        self.root.join("trash")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("favorites_backup")
    }

    /// Create `root/name` and return it.
    pub fn folder(&self, name: &str) -> PathBuf {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).expect("failed to create folder");
        dir
    }

    /// Write a file of `size` bytes into `media/` and return its path.
    pub fn media_file(&self, name: &str, size: usize) -> String {
        let path = self.media_dir().join(name);
        fs::write(&path, vec![b'x'; size]).expect("failed to write media file");
        path.to_string_lossy().into_owned()
    }

    /// A fresh tracker reading whatever `deletion.csv` holds now.
    pub fn open_deletion(&self) -> DeletionTracker {
        Self::deletion_over(&self.root, self.favorites.clone(), self.transfers.clone())
    }

    pub fn orchestrator(&self, scheduler: Arc<dyn Scheduler>) -> MoveOrchestrator {
        self.orchestrator_with(scheduler, Arc::new(ScanReindex::new(&["mp4".to_string()])))
    }

    pub fn orchestrator_with(
        &self,
        scheduler: Arc<dyn Scheduler>,
        reindex: Arc<dyn Reindex>,
    ) -> MoveOrchestrator {
        let ops: Arc<dyn FileOps> = Arc::new(FolderTrash::new(self.trash_dir()));
        MoveOrchestrator::new(
            Indices {
                transfers: self.transfers.clone(),
                deletion: self.deletion.clone(),
                favorites: self.favorites.clone(),
                categories: self.categories.clone(),
                notes: self.notes.clone(),
            },
            ops,
            scheduler,
            reindex,
        )
    }

    /// A ledger over its own `ledger/` data dir, trashing into `trash/`.
    pub fn ledger(&self) -> Ledger {
        let config = LedgerConfig {
            trash_dir: Some(self.trash_dir()),
            favorites_backup_dir: Some(self.backup_dir()),
            ..LedgerConfig::in_dir(self.root.join("ledger"))
        };
        Ledger::open_with(config, Arc::new(InlineScheduler)).expect("failed to open ledger")
    }
}
