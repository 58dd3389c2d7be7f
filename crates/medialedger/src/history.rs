//! # Transfer History
//!
//! Every physical move is appended to `transfer_log.csv`. The log is the only
//! authoritative record that two paths refer to the same logical file, so the
//! rest of the crate resolves identity through it:
//!
//! - [`TransferLog::related_paths`] walks the log in both directions and returns
//!   the connected component containing a path (every name the file ever had).
//! - [`TransferLog::history`] answers the one-hop question: where did this file
//!   come from, and where did it go next?
//!
//! The log is loaded once and indexed by source and destination. Appends go to
//! disk first and then into the in-memory edges, so readers always see a state
//! that is already persisted.
//!
//! [`basename_matches`] is a separate, weaker heuristic: files that share a
//! basename are *probably* the same file. It is never consulted by the log
//! itself; callers opt in.

use crate::error::Result;
use crate::stamp;
use crate::store::{CsvTable, Record};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::Path;
use tracing::debug;

pub const ACTION_MOVED: &str = "Moved";
pub const ACTION_FAVORITES_BACKUP: &str = "Favorites Backup";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    #[serde(rename = "Source Path")]
    pub source: String,
    #[serde(rename = "Destination Path")]
    pub destination: String,
    #[serde(rename = "Status")]
    pub action: String,
    #[serde(rename = "Date")]
    pub date: String,
}

impl Record for TransferRecord {
    const HEADERS: &'static [&'static str] = &["Source Path", "Destination Path", "Status", "Date"];
}

/// One-hop view of a file's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathHistory {
    /// Where the file was before it arrived at `current`.
    pub previous: Option<String>,
    pub current: String,
    /// Where the file went after `current`, if it was moved again.
    pub destination: Option<String>,
}

#[derive(Default)]
struct Edges {
    records: Vec<TransferRecord>,
    by_source: HashMap<String, Vec<usize>>,
    by_destination: HashMap<String, Vec<usize>>,
}

impl Edges {
    fn push(&mut self, record: TransferRecord) {
        let idx = self.records.len();
        self.by_source
            .entry(record.source.clone())
            .or_default()
            .push(idx);
        self.by_destination
            .entry(record.destination.clone())
            .or_default()
            .push(idx);
        self.records.push(record);
    }
}

/// Append-only transfer log with an in-memory edge index.
pub struct TransferLog {
    table: CsvTable<TransferRecord>,
    edges: RwLock<Edges>,
}

impl TransferLog {
    pub fn open(table: CsvTable<TransferRecord>) -> Result<Self> {
        table.ensure_header()?;
        let mut edges = Edges::default();
        for record in table.load()? {
            edges.push(record);
        }
        Ok(Self {
            table,
            edges: RwLock::new(edges),
        })
    }

    /// Append a transfer to disk, then to the in-memory index.
    pub fn record(&self, source: &str, destination: &str, action: &str) -> Result<TransferRecord> {
        let record = TransferRecord {
            source: source.to_string(),
            destination: destination.to_string(),
            action: action.to_string(),
            date: stamp::date_added_now(),
        };
        self.table.append(&record)?;
        self.edges.write().push(record.clone());
        debug!(source, destination, action, "transfer recorded");
        Ok(record)
    }

    pub fn entries(&self) -> Vec<TransferRecord> {
        self.edges.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.edges.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every path connected to `path` through transfer-log edges, `path` included.
    pub fn related_paths(&self, path: &str) -> BTreeSet<String> {
        let edges = self.edges.read();
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        visited.insert(path.to_string());
        queue.push_back(path.to_string());

        while let Some(current) = queue.pop_front() {
            let outgoing = edges.by_source.get(&current).into_iter().flatten();
            let incoming = edges.by_destination.get(&current).into_iter().flatten();
            for &idx in outgoing.chain(incoming) {
                let record = &edges.records[idx];
                for neighbour in [&record.source, &record.destination] {
                    if visited.insert(neighbour.clone()) {
                        queue.push_back(neighbour.clone());
                    }
                }
            }
        }
        visited
    }

    /// Immediate predecessor and successor of `path`; the latest entry wins.
    pub fn history(&self, path: &str) -> PathHistory {
        let edges = self.edges.read();
        let previous = edges
            .by_destination
            .get(path)
            .and_then(|idxs| idxs.last())
            .map(|&idx| edges.records[idx].source.clone());
        let destination = edges
            .by_source
            .get(path)
            .and_then(|idxs| idxs.last())
            .map(|&idx| edges.records[idx].destination.clone());
        PathHistory {
            previous,
            current: path.to_string(),
            destination,
        }
    }
}

/// Candidates whose file name equals the file name of `path`.
///
/// This is a weak identity signal: two unrelated files can share a name.
/// Use it only as a fallback next to [`TransferLog::related_paths`].
pub fn basename_matches<'a, I>(path: &str, candidates: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let Some(name) = Path::new(path).file_name() else {
        return BTreeSet::new();
    };
    candidates
        .into_iter()
        .filter(|candidate| Path::new(candidate.as_str()).file_name() == Some(name))
        .cloned()
        .collect()
}
