//! # Medialedger
//!
//! Medialedger keeps per-file metadata for a media library (categories, notes,
//! favorites, and a two-phase deletion queue) consistent while files move
//! around on disk.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────┐
//!   callers ────▶ │  Ledger (facade)     │
//!                 └──────────┬───────────┘
//!                            │
//!      ┌──────────────┬──────┴───────┬──────────────┬──────────────┐
//!      ▼              ▼              ▼              ▼              ▼
//!  Categories       Notes        Favorites      Deletion     MoveOrchestrator
//!      │              │              │              │              │
//!      │              ▼              │              │              │
//!      │        TransferLog ◀────────┼──────────────┴──────────────┘
//!      ▼              ▼              ▼
//!  ─────────────── CsvTable (one file per index) ───────────────────
//! ```
//!
//! - [`store`]: typed CSV tables with atomic full-replace writes.
//! - [`history`]: the transfer log and the related-path resolver built on it.
//! - [`categories`], [`notes`], [`favorites`], [`deletion`]: one index each,
//!   every index guarded by its own lock.
//! - [`orchestrator`]: performs moves and runs the fault-isolated hook pipeline
//!   that re-keys every index.
//! - [`fsops`]: the side-effect seams (move/trash, confirmation prompt,
//!   background scheduler, folder re-index).
//! - [`config`]: layered configuration.
//! - [`ledger`]: wires it all together for one data directory.
//!
//! ## Consistency Model
//!
//! Each index persists fully before its mutating call returns. There is no
//! transaction across indices: a crash between two hooks of a move leaves each
//! table valid on its own but not yet updated for the move. The orchestrator
//! never holds one index's lock while calling another.
//!
//! ## Identity
//!
//! Two paths refer to the same logical file when the transfer log connects
//! them. Notes additionally accept files that share a basename, as an explicit
//! and weaker fallback. Favorites identify files by a hash of name and parent
//! folder, and are rehashed whenever a favorite moves.

pub mod categories;
pub mod config;
pub mod deletion;
pub mod error;
pub mod favorites;
pub mod fsops;
pub mod history;
pub mod ledger;
pub mod notes;
pub mod orchestrator;
pub mod stamp;
pub mod store;

#[cfg(test)]
pub mod test_utils;

pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{FileProperties, Ledger};
