//! # Category Index
//!
//! Categories are free-form names that group media files. The index persists
//! `(category, path, date added)` rows to `categories.csv` and keeps two derived
//! maps in memory:
//!
//! - `category → paths`
//! - `path → categories`
//!
//! Both maps are rebuilt from the entry list on load and updated together inside
//! every mutating method, under the same lock, so they never disagree with each
//! other or with the persisted rows.
//!
//! ## Renaming and Merging
//!
//! [`CategoryIndex::rename_category`] refuses to rename onto an existing
//! category unless `merge` is set. A merge takes the union of both categories'
//! files and re-inserts it under the new name. Every merged row receives a fresh
//! "date added"; the original dates are not carried over.
//!
//! ## Failed Writes
//!
//! Mutations are applied to a copy of the state. The copy replaces the live
//! state only after the table write succeeds, so an `Err` leaves the index as
//! it was before the call.

use crate::error::Result;
use crate::stamp;
use crate::store::{CsvTable, Record};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    #[serde(rename = "Category Name")]
    pub category: String,
    #[serde(rename = "File Path")]
    pub path: String,
    #[serde(rename = "Date Added")]
    pub date_added: String,
}

impl Record for CategoryRecord {
    const HEADERS: &'static [&'static str] = &["Category Name", "File Path", "Date Added"];
}

impl CategoryRecord {
    fn new(category: &str, path: &str) -> Self {
        Self {
            category: category.to_string(),
            path: path.to_string(),
            date_added: stamp::date_added_now(),
        }
    }
}

/// What [`CategoryIndex::rename_category`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed { old: String, new: String, files: usize },
    Merged { old: String, new: String, files: usize },
    /// The target exists and `merge` was not requested. Re-invoke with merge.
    TargetExists { old: String, new: String },
    NotFound(String),
    SameName(String),
}

impl RenameOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Renamed { .. } | Self::Merged { .. })
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RenameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renamed { old, new, files } => {
                write!(f, "Renamed category '{}' to '{}' ({} files)", old, new, files)
            }
            Self::Merged { old, new, files } => write!(
                f,
                "Merged category '{}' into '{}' ({} files)",
                old, new, files
            ),
            Self::TargetExists { old, new } => write!(
                f,
                "Category '{}' already exists. Merge '{}' into it?",
                new, old
            ),
            Self::NotFound(name) => write!(f, "Category '{}' not found", name),
            Self::SameName(name) => write!(f, "Category '{}' is already named that", name),
        }
    }
}

#[derive(Default, Clone)]
struct Inner {
    entries: Vec<CategoryRecord>,
    by_category: HashMap<String, BTreeSet<String>>,
    by_path: HashMap<String, BTreeSet<String>>,
}

impl Inner {
    fn from_entries(entries: Vec<CategoryRecord>) -> Self {
        let mut inner = Inner::default();
        for entry in entries {
            if inner.contains(&entry.category, &entry.path) {
                continue;
            }
            inner.link(&entry.category, &entry.path);
            inner.entries.push(entry);
        }
        inner
    }

    fn contains(&self, category: &str, path: &str) -> bool {
        self.by_category
            .get(category)
            .is_some_and(|paths| paths.contains(path))
    }

    fn link(&mut self, category: &str, path: &str) {
        self.by_category
            .entry(category.to_string())
            .or_default()
            .insert(path.to_string());
        self.by_path
            .entry(path.to_string())
            .or_default()
            .insert(category.to_string());
    }

    fn unlink(&mut self, category: &str, path: &str) {
        if let Some(paths) = self.by_category.get_mut(category) {
            paths.remove(path);
            if paths.is_empty() {
                self.by_category.remove(category);
            }
        }
        if let Some(categories) = self.by_path.get_mut(path) {
            categories.remove(category);
            if categories.is_empty() {
                self.by_path.remove(path);
            }
        }
    }

    fn insert(&mut self, category: &str, path: &str) -> bool {
        if self.contains(category, path) {
            return false;
        }
        self.link(category, path);
        self.entries.push(CategoryRecord::new(category, path));
        true
    }

    fn remove(&mut self, category: &str, path: &str) -> bool {
        if !self.contains(category, path) {
            return false;
        }
        self.unlink(category, path);
        self.entries
            .retain(|e| !(e.category == category && e.path == path));
        true
    }

    fn remove_category(&mut self, category: &str) -> BTreeSet<String> {
        let paths = self.by_category.remove(category).unwrap_or_default();
        for path in &paths {
            if let Some(categories) = self.by_path.get_mut(path) {
                categories.remove(category);
                if categories.is_empty() {
                    self.by_path.remove(path);
                }
            }
        }
        self.entries.retain(|e| e.category != category);
        paths
    }
}

/// Bidirectional category ↔ path index backed by `categories.csv`.
pub struct CategoryIndex {
    table: CsvTable<CategoryRecord>,
    inner: Mutex<Inner>,
}

impl CategoryIndex {
    pub fn open(table: CsvTable<CategoryRecord>) -> Result<Self> {
        table.ensure_header()?;
        let inner = Inner::from_entries(table.load()?);
        Ok(Self {
            table,
            inner: Mutex::new(inner),
        })
    }

    /// Add `path` to `category`. Returns `false` if the pair already exists.
    pub fn add_to_category(&self, category: &str, path: &str) -> Result<bool> {
        let mut guard = self.inner.lock();
        let mut inner = guard.clone();
        if !inner.insert(category, path) {
            return Ok(false);
        }
        self.table.write(&inner.entries)?;
        *guard = inner;
        info!(category, path, "added to category");
        Ok(true)
    }

    /// Remove `path` from `category`. Returns `false` if the pair is absent.
    pub fn remove_from_category(&self, category: &str, path: &str) -> Result<bool> {
        let mut guard = self.inner.lock();
        let mut inner = guard.clone();
        if !inner.remove(category, path) {
            return Ok(false);
        }
        self.table.write(&inner.entries)?;
        *guard = inner;
        info!(category, path, "removed from category");
        Ok(true)
    }

    pub fn rename_category(&self, old: &str, new: &str, merge: bool) -> Result<RenameOutcome> {
        let mut guard = self.inner.lock();
        let mut inner = guard.clone();
        if !inner.by_category.contains_key(old) {
            return Ok(RenameOutcome::NotFound(old.to_string()));
        }
        if old == new {
            return Ok(RenameOutcome::SameName(old.to_string()));
        }

        let outcome = if inner.by_category.contains_key(new) {
            if !merge {
                return Ok(RenameOutcome::TargetExists {
                    old: old.to_string(),
                    new: new.to_string(),
                });
            }
            let mut union = inner.remove_category(old);
            union.extend(inner.remove_category(new));
            for path in &union {
                inner.insert(new, path);
            }
            RenameOutcome::Merged {
                old: old.to_string(),
                new: new.to_string(),
                files: union.len(),
            }
        } else {
            let paths = inner.by_category.remove(old).unwrap_or_default();
            for path in &paths {
                if let Some(categories) = inner.by_path.get_mut(path) {
                    categories.remove(old);
                    categories.insert(new.to_string());
                }
            }
            for entry in inner.entries.iter_mut().filter(|e| e.category == old) {
                entry.category = new.to_string();
            }
            let files = paths.len();
            inner.by_category.insert(new.to_string(), paths);
            RenameOutcome::Renamed {
                old: old.to_string(),
                new: new.to_string(),
                files,
            }
        };

        self.table.write(&inner.entries)?;
        *guard = inner;
        info!("{}", outcome);
        Ok(outcome)
    }

    /// Remove every entry of `category`. Returns `false` if it is unknown.
    pub fn delete_category(&self, category: &str) -> Result<bool> {
        let mut guard = self.inner.lock();
        let mut inner = guard.clone();
        if !inner.by_category.contains_key(category) {
            return Ok(false);
        }
        let removed = inner.remove_category(category);
        self.table.write(&inner.entries)?;
        *guard = inner;
        info!(category, files = removed.len(), "deleted category");
        Ok(true)
    }

    /// Move every category membership of `old_path` to `new_path` in one write.
    ///
    /// Returns the categories that were migrated.
    pub fn migrate_path(&self, old_path: &str, new_path: &str) -> Result<Vec<String>> {
        let mut guard = self.inner.lock();
        let mut inner = guard.clone();
        if old_path == new_path {
            return Ok(Vec::new());
        }
        let categories: Vec<String> = inner
            .by_path
            .get(old_path)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default();
        if categories.is_empty() {
            return Ok(categories);
        }
        for category in &categories {
            inner.remove(category, old_path);
            inner.insert(category, new_path);
        }
        self.table.write(&inner.entries)?;
        *guard = inner;
        Ok(categories)
    }

    pub fn categories_of_file(&self, path: &str) -> BTreeSet<String> {
        self.inner
            .lock()
            .by_path
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn files_in_category(&self, category: &str) -> BTreeSet<String> {
        self.inner
            .lock()
            .by_category
            .get(category)
            .cloned()
            .unwrap_or_default()
    }

    pub fn categories(&self) -> BTreeSet<String> {
        self.inner.lock().by_category.keys().cloned().collect()
    }

    /// Every category with the most recent "date added" among its entries,
    /// newest first.
    pub fn all_categories_with_latest_date(&self) -> Vec<(String, String)> {
        let inner = self.inner.lock();
        let mut latest: HashMap<&str, &str> = HashMap::new();
        for entry in &inner.entries {
            let slot = latest
                .entry(entry.category.as_str())
                .or_insert(entry.date_added.as_str());
            if entry.date_added.as_str() > *slot {
                *slot = entry.date_added.as_str();
            }
        }
        let mut result: Vec<(String, String)> = latest
            .into_iter()
            .map(|(c, d)| (c.to_string(), d.to_string()))
            .collect();
        result.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        result
    }

    pub fn entries(&self) -> Vec<CategoryRecord> {
        self.inner.lock().entries.clone()
    }

    #[cfg(test)]
    fn maps_agree(&self) -> bool {
        let inner = self.inner.lock();
        let mut from_entries: BTreeSet<(String, String)> = BTreeSet::new();
        for e in &inner.entries {
            from_entries.insert((e.category.clone(), e.path.clone()));
        }
        let forward: BTreeSet<(String, String)> = inner
            .by_category
            .iter()
            .flat_map(|(c, ps)| ps.iter().map(move |p| (c.clone(), p.clone())))
            .collect();
        let reverse: BTreeSet<(String, String)> = inner
            .by_path
            .iter()
            .flat_map(|(p, cs)| cs.iter().map(move |c| (c.clone(), p.clone())))
            .collect();
        from_entries.len() == inner.entries.len() && forward == from_entries && reverse == from_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn open(dir: &Path) -> CategoryIndex {
        CategoryIndex::open(CsvTable::new(dir.join("categories.csv"))).unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_then_query_both_directions() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());

        assert!(index.add_to_category("Travel", "/v/a.mp4").unwrap());
        assert!(index.categories_of_file("/v/a.mp4").contains("Travel"));
        assert!(index.files_in_category("Travel").contains("/v/a.mp4"));
        assert!(index.maps_agree());
    }

    #[test]
    fn duplicate_add_is_rejected_without_duplicate_row() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());
        index.add_to_category("Travel", "/v/a.mp4").unwrap();

        assert!(!index.add_to_category("Travel", "/v/a.mp4").unwrap());

        let text = fs::read_to_string(dir.path().join("categories.csv")).unwrap();
        assert_eq!(text.matches("/v/a.mp4").count(), 1);
        assert_eq!(index.entries().len(), 1);
    }

    #[test]
    fn reload_yields_same_pairs_regardless_of_order() {
        let dir = tempdir().unwrap();
        let pairs = [("B", "/2.mp4"), ("A", "/1.mp4"), ("A", "/3.mp4"), ("C", "/1.mp4")];
        {
            let index = open(dir.path());
            for (c, p) in pairs {
                index.add_to_category(c, p).unwrap();
            }
        }
        let reloaded = open(dir.path());
        let loaded: BTreeSet<(String, String)> = reloaded
            .entries()
            .into_iter()
            .map(|e| (e.category, e.path))
            .collect();
        let expected: BTreeSet<(String, String)> = pairs
            .iter()
            .map(|(c, p)| (c.to_string(), p.to_string()))
            .collect();
        assert_eq!(loaded, expected);
        assert!(reloaded.maps_agree());
    }

    #[test]
    fn remove_absent_pair_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());
        index.add_to_category("Travel", "/v/a.mp4").unwrap();
        let before = fs::read(dir.path().join("categories.csv")).unwrap();

        assert!(!index.remove_from_category("Travel", "/v/zzz.mp4").unwrap());
        assert!(!index.remove_from_category("Nope", "/v/a.mp4").unwrap());

        let after = fs::read(dir.path().join("categories.csv")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn remove_present_pair() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());
        index.add_to_category("Travel", "/v/a.mp4").unwrap();
        index.add_to_category("Family", "/v/a.mp4").unwrap();

        assert!(index.remove_from_category("Travel", "/v/a.mp4").unwrap());
        assert_eq!(index.categories_of_file("/v/a.mp4"), set(&["Family"]));
        assert!(!index.categories().contains("Travel"));
        assert!(index.maps_agree());
    }

    #[test]
    fn rename_onto_existing_requires_merge() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());
        index.add_to_category("A", "/1.mp4").unwrap();
        index.add_to_category("A", "/2.mp4").unwrap();
        index.add_to_category("B", "/2.mp4").unwrap();
        index.add_to_category("B", "/3.mp4").unwrap();

        let refused = index.rename_category("A", "B", false).unwrap();
        assert!(!refused.is_success());
        assert!(refused.message().contains("already exists"));
        assert_eq!(index.files_in_category("A").len(), 2);

        let merged = index.rename_category("A", "B", true).unwrap();
        assert!(merged.is_success());
        assert_eq!(
            index.files_in_category("B"),
            set(&["/1.mp4", "/2.mp4", "/3.mp4"])
        );
        assert!(!index.categories().contains("A"));
        assert_eq!(index.entries().len(), 3);
        assert!(index.maps_agree());
    }

    #[test]
    fn rename_in_place_rekeys_both_maps() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());
        index.add_to_category("Old", "/1.mp4").unwrap();
        index.add_to_category("Other", "/1.mp4").unwrap();

        let outcome = index.rename_category("Old", "New", false).unwrap();
        assert!(matches!(outcome, RenameOutcome::Renamed { files: 1, .. }));
        assert_eq!(index.categories_of_file("/1.mp4"), set(&["New", "Other"]));
        assert!(index.maps_agree());

        let reloaded = open(dir.path());
        assert!(reloaded.files_in_category("New").contains("/1.mp4"));
    }

    #[test]
    fn rename_unknown_category_reports_not_found() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());
        let outcome = index.rename_category("Ghost", "New", true).unwrap();
        assert_eq!(outcome, RenameOutcome::NotFound("Ghost".to_string()));
    }

    #[test]
    fn delete_category_removes_all_entries() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());
        index.add_to_category("Gone", "/1.mp4").unwrap();
        index.add_to_category("Gone", "/2.mp4").unwrap();
        index.add_to_category("Kept", "/1.mp4").unwrap();

        assert!(index.delete_category("Gone").unwrap());
        assert!(!index.delete_category("Gone").unwrap());
        assert_eq!(index.categories(), set(&["Kept"]));
        assert!(index.categories_of_file("/2.mp4").is_empty());
        assert!(index.maps_agree());
    }

    #[test]
    fn migrate_path_moves_every_membership() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());
        index.add_to_category("A", "/old/v.mp4").unwrap();
        index.add_to_category("B", "/old/v.mp4").unwrap();

        let moved = index.migrate_path("/old/v.mp4", "/new/v.mp4").unwrap();
        assert_eq!(moved, vec!["A".to_string(), "B".to_string()]);
        assert!(index.categories_of_file("/old/v.mp4").is_empty());
        assert_eq!(index.categories_of_file("/new/v.mp4"), set(&["A", "B"]));
        assert!(index.maps_agree());
    }

    #[test]
    fn latest_dates_sorted_descending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("categories.csv");
        fs::write(
            &path,
            "Category Name,File Path,Date Added\n\
             Old,/1.mp4,2023-01-01 10:00:00\n\
             New,/2.mp4,2024-05-01 10:00:00\n\
             Old,/3.mp4,2023-06-01 10:00:00\n",
        )
        .unwrap();
        let index = open(dir.path());

        let listed = index.all_categories_with_latest_date();
        assert_eq!(
            listed,
            vec![
                ("New".to_string(), "2024-05-01 10:00:00".to_string()),
                ("Old".to_string(), "2023-06-01 10:00:00".to_string()),
            ]
        );
    }

    #[test]
    fn failed_write_keeps_memory_and_disk_in_step() {
        let dir = tempdir().unwrap();
        let index = open(dir.path());
        index.add_to_category("Kept", "/v/k.mp4").unwrap();
        let table = dir.path().join("categories.csv");
        let on_disk = fs::read(&table).unwrap();

        // a directory in place of the table makes the rename fail
        fs::remove_file(&table).unwrap();
        fs::create_dir(&table).unwrap();
        assert!(index.add_to_category("Travel", "/v/a.mp4").is_err());
        assert!(index.remove_from_category("Kept", "/v/k.mp4").is_err());
        assert!(index.rename_category("Kept", "Other", false).is_err());
        assert!(index.delete_category("Kept").is_err());
        assert!(index.migrate_path("/v/k.mp4", "/w/k.mp4").is_err());
        assert!(index.categories_of_file("/v/a.mp4").is_empty());
        assert_eq!(index.categories_of_file("/v/k.mp4"), set(&["Kept"]));
        assert_eq!(index.categories(), set(&["Kept"]));
        assert!(index.maps_agree());

        fs::remove_dir(&table).unwrap();
        fs::write(&table, on_disk).unwrap();
        assert!(index.add_to_category("Travel", "/v/a.mp4").unwrap());
        assert!(open(dir.path())
            .files_in_category("Travel")
            .contains("/v/a.mp4"));
    }

    #[test]
    fn concurrent_adds_never_duplicate() {
        let dir = tempdir().unwrap();
        let index = Arc::new(open(dir.path()));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let index = index.clone();
                thread::spawn(move || {
                    for i in 0..10 {
                        index
                            .add_to_category("Shared", &format!("/v/{i}.mp4"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(index.entries().len(), 10);
        assert!(index.maps_agree());
        let reloaded = open(dir.path());
        assert_eq!(reloaded.entries().len(), 10);
        assert_eq!(reloaded.files_in_category("Shared").len(), 10);
    }
}
