//! # Favorites Index
//!
//! A favorite is identified by a hash of the file's name and the folder it sits
//! in, not by its full path string. The table (`favorites.csv`) stores that hash
//! together with the name and folder so the full path can be rebuilt.
//!
//! When a favorite moves, [`FavoritesIndex::update_favorite_path`] recomputes
//! the hash for the new location and replaces the old one. Lookups always hash
//! the path they are given, so a stale hash would silently stop matching.

use crate::error::Result;
use crate::stamp;
use crate::store::{CsvTable, Record};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_HASH_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    #[serde(rename = "Hash")]
    pub hash: String,
    #[serde(rename = "Video Name")]
    pub name: String,
    #[serde(rename = "Source Path")]
    pub source: String,
    #[serde(rename = "Date Added")]
    pub date_added: String,
}

impl Record for FavoriteRecord {
    const HEADERS: &'static [&'static str] = &["Hash", "Video Name", "Source Path", "Date Added"];
}

impl FavoriteRecord {
    /// The full path rebuilt from the stored folder and name.
    pub fn full_path(&self) -> PathBuf {
        Path::new(&self.source).join(&self.name)
    }
}

/// Hex SHA-256 of `name` followed by `source_folder`, truncated to `len` chars.
pub fn favorite_hash(name: &str, source_folder: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(source_folder.as_bytes());
    let mut digest = format!("{:x}", hasher.finalize());
    digest.truncate(len.clamp(1, 64));
    digest
}

fn split_path(path: &str) -> (String, String) {
    let p = Path::new(path);
    let name = p
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let folder = p
        .parent()
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();
    (name, folder)
}

/// Favorite membership set backed by `favorites.csv`.
pub struct FavoritesIndex {
    table: CsvTable<FavoriteRecord>,
    hash_len: usize,
    entries: Mutex<Vec<FavoriteRecord>>,
}

impl FavoritesIndex {
    pub fn open(table: CsvTable<FavoriteRecord>) -> Result<Self> {
        table.ensure_header()?;
        let mut entries: Vec<FavoriteRecord> = Vec::new();
        for record in table.load()? {
            if !entries.iter().any(|e| e.hash == record.hash) {
                entries.push(record);
            }
        }
        Ok(Self {
            table,
            hash_len: DEFAULT_HASH_LEN,
            entries: Mutex::new(entries),
        })
    }

    pub fn with_hash_len(mut self, len: usize) -> Self {
        self.hash_len = len;
        self
    }

    /// Identity hash for `path`.
    pub fn hash_path(&self, path: &str) -> String {
        let (name, folder) = split_path(path);
        favorite_hash(&name, &folder, self.hash_len)
    }

    /// Returns `false` if the file is already a favorite.
    pub fn add_to_favorites(&self, path: &str) -> Result<bool> {
        let hash = self.hash_path(path);
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.hash == hash) {
            return Ok(false);
        }
        let (name, source) = split_path(path);
        let mut next = entries.clone();
        next.push(FavoriteRecord {
            hash,
            name,
            source,
            date_added: stamp::date_added_now(),
        });
        self.table.write(&next)?;
        *entries = next;
        info!(path, "added to favorites");
        Ok(true)
    }

    pub fn check_favorites(&self, path: &str) -> bool {
        let hash = self.hash_path(path);
        self.entries.lock().iter().any(|e| e.hash == hash)
    }

    /// Returns `false` if the file was not a favorite.
    pub fn delete_from_favorites(&self, path: &str) -> Result<bool> {
        let hash = self.hash_path(path);
        let mut entries = self.entries.lock();
        if !entries.iter().any(|e| e.hash == hash) {
            return Ok(false);
        }
        let next: Vec<FavoriteRecord> = entries
            .iter()
            .filter(|e| e.hash != hash)
            .cloned()
            .collect();
        self.table.write(&next)?;
        *entries = next;
        info!(path, "removed from favorites");
        Ok(true)
    }

    /// Point the favorite at `old_path` to `new_path`, rehashing it.
    ///
    /// Returns `false` if `old_path` was not a favorite. The original
    /// "date added" is kept.
    pub fn update_favorite_path(&self, old_path: &str, new_path: &str) -> Result<bool> {
        let old_hash = self.hash_path(old_path);
        let new_hash = self.hash_path(new_path);
        let mut entries = self.entries.lock();
        let Some(pos) = entries.iter().position(|e| e.hash == old_hash) else {
            return Ok(false);
        };
        if old_hash == new_hash {
            return Ok(true);
        }

        let mut next = entries.clone();
        let mut entry = next.remove(pos);
        next.retain(|e| e.hash != new_hash);
        let (name, source) = split_path(new_path);
        entry.hash = new_hash;
        entry.name = name;
        entry.source = source;
        let at = pos.min(next.len());
        next.insert(at, entry);

        self.table.write(&next)?;
        *entries = next;
        info!(from = old_path, to = new_path, "favorite path updated");
        Ok(true)
    }

    /// Full paths of every favorite whose file still exists.
    pub fn get_favorites(&self) -> Vec<PathBuf> {
        self.entries
            .lock()
            .iter()
            .map(FavoriteRecord::full_path)
            .filter(|p| p.exists())
            .collect()
    }

    pub fn entries(&self) -> Vec<FavoriteRecord> {
        self.entries.lock().clone()
    }
}
