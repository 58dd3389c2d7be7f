//! # Configuration
//!
//! Medialedger configuration is managed by [`confique`], which layers
//! environment variables over a TOML file over compiled defaults.
//!
//! ## Resolution order
//!
//! 1. **Environment variables**: `MEDIALEDGER_DATA_DIR`, `MEDIALEDGER_TRASH_DIR`, ...
//! 2. **Config file**: `medialedger.toml` in the data directory.
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! The data directory itself defaults to the OS data directory (via the
//! `directories` crate). All five tables live there.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `data_dir` | OS data dir | Where the tables and the log file live |
//! | `favorites_backup_dir` | `<data_dir>/favorites_backup` | Where deleted favorites are relocated |
//! | `trash_dir` | unset | Send deletions to this folder instead of the system trash |
//! | `favorite_hash_len` | `16` | Hex chars kept from the favorite hash |
//! | `note_match_threshold` | `0.6` | Token overlap needed by keyed note search |
//! | `basename_fallback` | `true` | Let notes match files that share a basename |
//! | `media_extensions` | video + image types | Files counted when re-indexing a folder |

use crate::error::Result;
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "medialedger.toml";

fn default_media_extensions() -> Vec<String> {
    [
        "mp4", "mkv", "avi", "mov", "webm", "m4v", "jpg", "jpeg", "png", "gif",
    ]
    .iter()
    .map(|e| e.to_string())
    .collect()
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Directory holding the tables. Defaults to the OS data directory.
    #[config(env = "MEDIALEDGER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Deleted favorites are relocated here when the user agrees.
    #[config(env = "MEDIALEDGER_BACKUP_DIR")]
    pub favorites_backup_dir: Option<PathBuf>,

    /// When set, deletions are moved into this folder instead of the system trash.
    #[config(env = "MEDIALEDGER_TRASH_DIR")]
    pub trash_dir: Option<PathBuf>,

    #[config(default = 16, env = "MEDIALEDGER_FAVORITE_HASH_LEN")]
    pub favorite_hash_len: usize,

    #[config(default = 0.6, env = "MEDIALEDGER_NOTE_MATCH_THRESHOLD")]
    pub note_match_threshold: f64,

    #[config(default = true, env = "MEDIALEDGER_BASENAME_FALLBACK")]
    pub basename_fallback: bool,

    /// When absent, defaults to common video and image extensions.
    pub media_extensions: Option<Vec<String>>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            favorites_backup_dir: None,
            trash_dir: None,
            favorite_hash_len: 16,
            note_match_threshold: 0.6,
            basename_fallback: true,
            media_extensions: None,
        }
    }
}

/// OS data directory for medialedger, if the platform has one.
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "medialedger", "medialedger").map(|d| d.data_dir().to_path_buf())
}

impl LedgerConfig {
    /// Load from the environment and `medialedger.toml`.
    ///
    /// `data_dir` is where the config file is looked up. When `None`, the
    /// environment and then the OS default decide.
    pub fn load(data_dir: Option<&Path>) -> Result<Self> {
        let dir = match data_dir {
            Some(dir) => Some(dir.to_path_buf()),
            None => std::env::var_os("MEDIALEDGER_DATA_DIR")
                .map(PathBuf::from)
                .or_else(default_data_dir),
        };
        let mut builder = LedgerConfig::builder().env();
        if let Some(dir) = &dir {
            builder = builder.file(dir.join(CONFIG_FILE));
        }
        let mut config = builder.load()?;
        if let Some(dir) = data_dir {
            config.data_dir = Some(dir.to_path_buf());
        } else if config.data_dir.is_none() {
            config.data_dir = dir;
        }
        Ok(config)
    }

    /// Resolved data directory: configured, or the OS default, or `./.medialedger`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(default_data_dir)
            .unwrap_or_else(|| PathBuf::from(".medialedger"))
    }

    pub fn favorites_backup_dir(&self) -> PathBuf {
        self.favorites_backup_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("favorites_backup"))
    }

    pub fn media_extensions(&self) -> Vec<String> {
        self.media_extensions
            .clone()
            .unwrap_or_else(default_media_extensions)
    }

    /// A config rooted at `dir` with every other value at its default.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Default::default()
        }
    }
}
