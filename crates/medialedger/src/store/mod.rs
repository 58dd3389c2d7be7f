//! # Storage Layer
//!
//! Every index in medialedger persists to its own flat CSV table. This module
//! provides the one primitive they all share: [`CsvTable`], a typed table bound
//! to a single file path.
//!
//! ## Table Contract
//!
//! - **Header first**: the file always starts with the header row. A table that
//!   does not exist yet is created header-only by [`CsvTable::ensure_header`],
//!   which never touches an existing file.
//! - **Full replace**: [`CsvTable::write`] re-serializes every row into a temp
//!   file next to the target and renames it into place. Readers never observe a
//!   half-written table.
//! - **Append-only logs**: [`CsvTable::append`] is reserved for tables whose rows
//!   are never mutated (the transfer log).
//! - **Missing is empty**: loading a table whose file does not exist yields no
//!   rows. The file appears lazily on the first write.
//! - **Malformed rows are skipped**: a short or corrupt row is logged with its
//!   line number and loading continues.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//! ├── categories.csv      # Category Name, File Path, Date Added
//! ├── notes.csv           # file_path, note, rating, tags, mood, context, timestamp
//! ├── favorites.csv       # Hash, Video Name, Source Path, Date Added
//! ├── deletion.csv        # File Path, Delete_Status, File Size, Modification Time
//! ├── transfer_log.csv    # Source Path, Destination Path, Status, Date
//! ├── medialedger.toml    # Optional configuration
//! └── medialedger.log     # Written by the CLI subscriber
//! ```
//!
//! ## Ownership
//!
//! A `CsvTable` is owned by exactly one index. No two indices share a file, and
//! the move orchestrator never writes another index's table directly.

use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod csv_table;

pub use csv_table::CsvTable;

pub const CATEGORIES_FILE: &str = "categories.csv";
pub const NOTES_FILE: &str = "notes.csv";
pub const FAVORITES_FILE: &str = "favorites.csv";
pub const DELETION_FILE: &str = "deletion.csv";
pub const TRANSFER_LOG_FILE: &str = "transfer_log.csv";

/// A row type that can live in a [`CsvTable`].
///
/// Field declaration order must match `HEADERS`: rows are written without
/// serde's own header and read back by column name.
pub trait Record: Serialize + DeserializeOwned {
    const HEADERS: &'static [&'static str];
}
