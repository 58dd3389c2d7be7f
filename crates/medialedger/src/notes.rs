//! # Notes Index
//!
//! Free-form annotations attached to media files: a note text plus an optional
//! rating, a tag set, a mood and a context. At most one record exists per path,
//! persisted to `notes.csv`.
//!
//! ## Identity Across Moves
//!
//! A file that was moved three times may have notes recorded under any of its
//! former paths. Reads and writes therefore operate on the *related-path set*:
//! the transfer-log component of the path, plus (when enabled) every indexed
//! path sharing its basename.
//!
//! Reads and writes treat that set differently:
//!
//! - [`NotesIndex::get_note`] **merges** every contributing record: texts are
//!   joined with a `---` line, tags are unioned, and rating/mood/context/timestamp
//!   come from the most recent record that has them.
//! - [`NotesIndex::set_note`] **moves** every other related record onto the
//!   target path before writing. Moved records replace each other (last writer
//!   wins) and are not merged.
//!
//! ## Tables
//!
//! Tags are stored in a single cell, comma separated, so a tag never contains a
//! comma: one written with a comma is split into several tags before saving.
//! Ratings are numeric and kept as written (`4.5` stays `4.5`). A rating cell
//! holding `0` or nothing means "no rating".
//!
//! Mutations run on a copy of the map that replaces the live one only after
//! the table write succeeds.

use crate::error::Result;
use crate::history::{basename_matches, TransferLog};
use crate::stamp;
use crate::store::{CsvTable, Record};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;
pub const NOTE_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub file_path: String,
    #[serde(default)]
    pub note: String,
    #[serde(default, with = "rating_cell")]
    pub rating: Option<f64>,
    #[serde(default, with = "tags_cell")]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Record for NoteRecord {
    const HEADERS: &'static [&'static str] = &[
        "file_path",
        "note",
        "rating",
        "tags",
        "mood",
        "context",
        "timestamp",
    ];
}

impl NoteRecord {
    pub fn empty(path: &str) -> Self {
        Self {
            file_path: path.to_string(),
            note: String::new(),
            rating: None,
            tags: BTreeSet::new(),
            mood: String::new(),
            context: String::new(),
            timestamp: String::new(),
        }
    }

    fn has_text(&self) -> bool {
        !self.note.trim().is_empty()
    }

    fn tokens(&self) -> BTreeSet<String> {
        let mut tokens = tokenize(&self.note);
        for tag in &self.tags {
            tokens.extend(tokenize(tag));
        }
        tokens.extend(tokenize(&self.mood));
        tokens.extend(tokenize(&self.context));
        tokens.extend(tokenize(&self.file_path));
        tokens
    }

    fn contains_text(&self, needle: &str) -> bool {
        let hit = |field: &str| field.to_lowercase().contains(needle);
        hit(&self.file_path)
            || hit(&self.note)
            || hit(&self.mood)
            || hit(&self.context)
            || self.tags.iter().any(|t| hit(t.as_str()))
    }
}

/// Optional fields for [`NotesIndex::set_note`]. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    /// `Some(0.0)` clears the rating.
    pub rating: Option<f64>,
    pub tags: Option<BTreeSet<String>>,
    pub mood: Option<String>,
    pub context: Option<String>,
}

impl NoteUpdate {
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Per-path note store backed by `notes.csv`.
pub struct NotesIndex {
    table: CsvTable<NoteRecord>,
    history: Arc<TransferLog>,
    basename_fallback: bool,
    notes: Mutex<BTreeMap<String, NoteRecord>>,
}

impl NotesIndex {
    pub fn open(table: CsvTable<NoteRecord>, history: Arc<TransferLog>) -> Result<Self> {
        table.ensure_header()?;
        let mut notes = BTreeMap::new();
        for record in table.load()? {
            notes.insert(record.file_path.clone(), record);
        }
        Ok(Self {
            table,
            history,
            basename_fallback: true,
            notes: Mutex::new(notes),
        })
    }

    /// Enable or disable the basename heuristic when resolving related paths.
    pub fn with_basename_fallback(mut self, enabled: bool) -> Self {
        self.basename_fallback = enabled;
        self
    }

    fn related_keys(
        &self,
        path: &str,
        from_log: BTreeSet<String>,
        notes: &BTreeMap<String, NoteRecord>,
    ) -> BTreeSet<String> {
        let mut keys = from_log;
        if self.basename_fallback {
            keys.extend(basename_matches(path, notes.keys()));
        }
        keys
    }

    /// The merged note for `path` and every path related to it.
    pub fn get_note(&self, path: &str) -> Option<NoteRecord> {
        let from_log = self.history.related_paths(path);
        let notes = self.notes.lock();
        let keys = self.related_keys(path, from_log, &notes);

        let mut contributors: Vec<&NoteRecord> = keys
            .iter()
            .filter_map(|key| notes.get(key))
            .filter(|record| record.has_text())
            .collect();
        if contributors.is_empty() {
            return notes.get(path).cloned();
        }
        contributors.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.file_path.cmp(&b.file_path))
        });

        let mut merged = NoteRecord::empty(path);
        merged.note = contributors
            .iter()
            .map(|r| r.note.trim_end())
            .collect::<Vec<_>>()
            .join(NOTE_SEPARATOR);
        for record in &contributors {
            merged.tags.extend(record.tags.iter().cloned());
            if record.rating.is_some() {
                merged.rating = record.rating;
            }
            if !record.mood.is_empty() {
                merged.mood = record.mood.clone();
            }
            if !record.context.is_empty() {
                merged.context = record.context.clone();
            }
            if !record.timestamp.is_empty() {
                merged.timestamp = record.timestamp.clone();
            }
        }
        Some(merged)
    }

    /// The record stored exactly at `path`, without any merging.
    pub fn raw_note(&self, path: &str) -> Option<NoteRecord> {
        self.notes.lock().get(path).cloned()
    }

    /// Write a note at `path`, first pulling every related record onto it.
    pub fn set_note(&self, path: &str, note: &str, update: NoteUpdate) -> Result<NoteRecord> {
        let from_log = self.history.related_paths(path);
        let mut guard = self.notes.lock();
        let mut notes = guard.clone();
        let mut keys = self.related_keys(path, from_log, &notes);
        keys.remove(path);

        for key in keys {
            if let Some(mut moved) = notes.remove(&key) {
                debug!(from = %key, to = path, "moving note onto current path");
                moved.file_path = path.to_string();
                notes.insert(path.to_string(), moved);
            }
        }

        let record = notes
            .entry(path.to_string())
            .or_insert_with(|| NoteRecord::empty(path));
        record.note = note.to_string();
        if let Some(rating) = update.rating {
            record.rating = (rating > 0.0).then_some(rating);
        }
        if let Some(tags) = update.tags {
            record.tags = clean_tags(tags);
        }
        if let Some(mood) = update.mood {
            record.mood = mood.trim().to_string();
        }
        if let Some(context) = update.context {
            record.context = context.trim().to_string();
        }
        record.timestamp = stamp::iso_now();
        let saved = record.clone();

        self.persist(&notes)?;
        *guard = notes;
        info!(path, "note saved");
        Ok(saved)
    }

    pub fn delete_note(&self, path: &str) -> Result<bool> {
        let mut guard = self.notes.lock();
        let mut notes = guard.clone();
        if notes.remove(path).is_none() {
            return Ok(false);
        }
        self.persist(&notes)?;
        *guard = notes;
        info!(path, "note deleted");
        Ok(true)
    }

    /// Re-key the record at `old_path` to `new_path`.
    ///
    /// A record already stored at `new_path` is replaced.
    pub fn update_note_key(&self, old_path: &str, new_path: &str) -> Result<bool> {
        if old_path == new_path {
            return Ok(false);
        }
        let mut guard = self.notes.lock();
        let mut notes = guard.clone();
        let Some(mut record) = notes.remove(old_path) else {
            return Ok(false);
        };
        record.file_path = new_path.to_string();
        notes.insert(new_path.to_string(), record);
        self.persist(&notes)?;
        *guard = notes;
        Ok(true)
    }

    pub fn list_notes(&self) -> Vec<NoteRecord> {
        self.notes.lock().values().cloned().collect()
    }

    /// Case-insensitive substring search over path, note, tags, mood and context.
    pub fn search_notes(&self, query: &str) -> Vec<NoteRecord> {
        let needle = query.trim().to_lowercase();
        self.filter(|r| r.contains_text(&needle))
    }

    /// Token-overlap search restricted to `allowed_keys`.
    ///
    /// A record matches when at least `threshold` of the query's tokens appear
    /// among its tokens. Results are ordered by overlap, best first.
    pub fn search_notes_by_keys(
        &self,
        query: &str,
        allowed_keys: &BTreeSet<String>,
        threshold: f64,
    ) -> Vec<NoteRecord> {
        let wanted = tokenize(query);
        if wanted.is_empty() {
            return Vec::new();
        }
        let notes = self.notes.lock();
        let mut scored: Vec<(f64, NoteRecord)> = allowed_keys
            .iter()
            .filter_map(|key| notes.get(key))
            .filter_map(|record| {
                let tokens = record.tokens();
                let hits = wanted.iter().filter(|t| tokens.contains(*t)).count();
                let ratio = hits as f64 / wanted.len() as f64;
                (ratio >= threshold).then(|| (ratio, record.clone()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().map(|(_, record)| record).collect()
    }

    pub fn notes_by_tag(&self, tag: &str) -> Vec<NoteRecord> {
        let tag = tag.trim().to_lowercase();
        self.filter(|r| r.tags.iter().any(|t| t.to_lowercase() == tag))
    }

    pub fn notes_by_rating(&self, min: f64) -> Vec<NoteRecord> {
        self.filter(|r| r.rating.is_some_and(|rating| rating >= min))
    }

    pub fn notes_by_mood(&self, mood: &str) -> Vec<NoteRecord> {
        let mood = mood.trim().to_lowercase();
        self.filter(|r| r.mood.to_lowercase() == mood)
    }

    pub fn notes_by_context(&self, context: &str) -> Vec<NoteRecord> {
        let context = context.trim().to_lowercase();
        self.filter(|r| r.context.to_lowercase() == context)
    }

    /// Notes whose timestamp date falls within `[start, end]`, both inclusive.
    pub fn notes_in_date_range(&self, start: &str, end: &str) -> Vec<NoteRecord> {
        let start = stamp::date_part(start);
        let end = stamp::date_part(end);
        self.filter(|r| {
            if r.timestamp.is_empty() {
                return false;
            }
            let date = stamp::date_part(&r.timestamp);
            date >= start && date <= end
        })
    }

    /// The `n` most recently modified notes, newest first.
    pub fn recent_notes(&self, n: usize) -> Vec<NoteRecord> {
        let mut notes = self.list_notes();
        notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        notes.truncate(n);
        notes
    }

    pub fn all_tags(&self) -> BTreeSet<String> {
        self.notes
            .lock()
            .values()
            .flat_map(|r| r.tags.iter().cloned())
            .collect()
    }

    fn filter<F>(&self, predicate: F) -> Vec<NoteRecord>
    where
        F: Fn(&NoteRecord) -> bool,
    {
        self.notes
            .lock()
            .values()
            .filter(|r| predicate(*r))
            .cloned()
            .collect()
    }

    fn persist(&self, notes: &BTreeMap<String, NoteRecord>) -> Result<()> {
        let rows: Vec<NoteRecord> = notes.values().cloned().collect();
        self.table.write(&rows)
    }
}

fn clean_tags(tags: BTreeSet<String>) -> BTreeSet<String> {
    tags.iter()
        .flat_map(|t| t.split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Parse a rating cell. Blank, zero, negative and unparsable values mean
/// "no rating".
pub fn parse_rating(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

mod rating_cell {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(rating: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
        match rating {
            Some(r) => s.serialize_str(&r.to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(super::parse_rating(&raw))
    }
}

mod tags_cell {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeSet;

    pub fn serialize<S: Serializer>(tags: &BTreeSet<String>, s: S) -> Result<S::Ok, S::Error> {
        let joined = tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        s.serialize_str(&joined)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<String>, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ACTION_MOVED;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const HEADER: &str = "file_path,note,rating,tags,mood,context,timestamp\n";

    fn open(dir: &Path) -> (Arc<TransferLog>, NotesIndex) {
        let log = Arc::new(
            TransferLog::open(CsvTable::new(dir.join("transfer_log.csv"))).unwrap(),
        );
        let notes = NotesIndex::open(CsvTable::new(dir.join("notes.csv")), log.clone()).unwrap();
        (log, notes)
    }

    fn seed(dir: &Path, rows: &str) {
        fs::write(dir.join("notes.csv"), format!("{}{}", HEADER, rows)).unwrap();
    }

    #[test]
    fn note_follows_transfer_edge() {
        let dir = tempdir().unwrap();
        let (log, notes) = open(dir.path());
        notes.set_note("/a/A.mp4", "hello", NoteUpdate::default()).unwrap();
        log.record("/a/A.mp4", "/b/B.mp4", ACTION_MOVED).unwrap();

        let found = notes.get_note("/b/B.mp4").unwrap();
        assert_eq!(found.note, "hello");
        assert_eq!(found.file_path, "/b/B.mp4");
    }

    #[test]
    fn merge_joins_text_unions_tags_and_takes_latest_fields() {
        let dir = tempdir().unwrap();
        seed(
            dir.path(),
            "/a/v.mp4,first,3,\"cats, home\",calm,evening,2024-01-01T10:00:00\n\
             /b/v.mp4,second,5,\"cats, trip\",,morning,2024-02-01T10:00:00\n",
        );
        let (log, notes) = open(dir.path());
        log.record("/a/v.mp4", "/b/v.mp4", ACTION_MOVED).unwrap();

        let merged = notes.get_note("/b/v.mp4").unwrap();
        assert_eq!(merged.note, "first\n---\nsecond");
        assert_eq!(merged.rating, Some(5.0));
        assert_eq!(merged.mood, "calm");
        assert_eq!(merged.context, "morning");
        assert_eq!(merged.timestamp, "2024-02-01T10:00:00");
        let tags: Vec<&str> = merged.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["cats", "home", "trip"]);
    }

    #[test]
    fn record_without_text_is_returned_raw() {
        let dir = tempdir().unwrap();
        seed(dir.path(), "/a/v.mp4,,4,fav,,,2024-01-01T10:00:00\n");
        let (_log, notes) = open(dir.path());

        let found = notes.get_note("/a/v.mp4").unwrap();
        assert_eq!(found.rating, Some(4.0));
        assert!(notes.get_note("/nothing/here.mp4").is_none());
    }

    #[test]
    fn basename_fallback_can_be_disabled() {
        let dir = tempdir().unwrap();
        seed(dir.path(), "/x/clip.mp4,remember,,,,,2024-01-01T10:00:00\n");

        let (_log, notes) = open(dir.path());
        assert_eq!(notes.get_note("/y/clip.mp4").unwrap().note, "remember");

        let (_log, strict) = open(dir.path());
        let strict = strict.with_basename_fallback(false);
        assert!(strict.get_note("/y/clip.mp4").is_none());
    }

    #[test]
    fn set_note_moves_related_records_onto_path() {
        let dir = tempdir().unwrap();
        seed(dir.path(), "/a/v.mp4,old text,2,legacy,sad,,2024-01-01T10:00:00\n");
        let (log, notes) = open(dir.path());
        log.record("/a/v.mp4", "/b/w.mp4", ACTION_MOVED).unwrap();

        let saved = notes
            .set_note("/b/w.mp4", "new text", NoteUpdate::default().with_mood("happy"))
            .unwrap();
        assert_eq!(saved.note, "new text");
        assert_eq!(saved.mood, "happy");
        assert_eq!(saved.rating, Some(2.0));
        assert!(saved.tags.contains("legacy"));

        assert!(notes.raw_note("/a/v.mp4").is_none());
        assert_eq!(notes.list_notes().len(), 1);
    }

    #[test]
    fn set_note_persists_and_reloads() {
        let dir = tempdir().unwrap();
        {
            let (_log, notes) = open(dir.path());
            notes
                .set_note(
                    "/v/a.mp4",
                    "text, with comma",
                    NoteUpdate::default()
                        .with_rating(4.0)
                        .with_tags(["one", " two "])
                        .with_context("watch later"),
                )
                .unwrap();
        }
        let (_log, notes) = open(dir.path());
        let record = notes.raw_note("/v/a.mp4").unwrap();
        assert_eq!(record.note, "text, with comma");
        assert_eq!(record.rating, Some(4.0));
        assert_eq!(record.tags.len(), 2);
        assert!(record.tags.contains("two"));
        assert_eq!(record.context, "watch later");
        assert!(!record.timestamp.is_empty());
    }

    #[test]
    fn zero_rating_means_no_rating() {
        let dir = tempdir().unwrap();
        seed(dir.path(), "/v/a.mp4,x,0,,,,2024-01-01T10:00:00\n");
        let (_log, notes) = open(dir.path());
        assert_eq!(notes.raw_note("/v/a.mp4").unwrap().rating, None);

        notes
            .set_note("/v/a.mp4", "x", NoteUpdate::default().with_rating(3.0))
            .unwrap();
        notes
            .set_note("/v/a.mp4", "x", NoteUpdate::default().with_rating(0.0))
            .unwrap();
        assert_eq!(notes.raw_note("/v/a.mp4").unwrap().rating, None);
    }

    #[test]
    fn update_note_key_renames_only_when_present() {
        let dir = tempdir().unwrap();
        let (_log, notes) = open(dir.path());
        notes.set_note("/a.mp4", "x", NoteUpdate::default()).unwrap();

        assert!(!notes.update_note_key("/a.mp4", "/a.mp4").unwrap());
        assert!(!notes.update_note_key("/missing.mp4", "/b.mp4").unwrap());
        assert!(notes.update_note_key("/a.mp4", "/b.mp4").unwrap());
        assert!(notes.raw_note("/a.mp4").is_none());
        assert_eq!(notes.raw_note("/b.mp4").unwrap().file_path, "/b.mp4");
    }

    #[test]
    fn delete_note_reports_absence() {
        let dir = tempdir().unwrap();
        let (_log, notes) = open(dir.path());
        notes.set_note("/a.mp4", "x", NoteUpdate::default()).unwrap();
        assert!(notes.delete_note("/a.mp4").unwrap());
        assert!(!notes.delete_note("/a.mp4").unwrap());
    }

    #[test]
    fn queries_filter_by_fields() {
        let dir = tempdir().unwrap();
        seed(
            dir.path(),
            "/v/beach.mp4,Sunset at the Beach,5,\"summer, Travel\",happy,holiday,2024-07-01T10:00:00\n\
             /v/rain.mp4,rainy walk,2,autumn,Sad,commute,2024-10-05T09:00:00\n\
             /v/cat.mp4,cat video,4,pets,happy,home,2024-08-15T18:30:00\n",
        );
        let (_log, notes) = open(dir.path());

        assert_eq!(notes.search_notes("BEACH").len(), 1);
        assert_eq!(notes.search_notes("travel").len(), 1);
        assert_eq!(notes.notes_by_tag("travel").len(), 1);
        assert_eq!(notes.notes_by_rating(4.0).len(), 2);
        assert_eq!(notes.notes_by_mood("happy").len(), 2);
        assert_eq!(notes.notes_by_mood("sad").len(), 1);
        assert_eq!(notes.notes_by_context("home").len(), 1);

        let summer = notes.notes_in_date_range("2024-07-01", "2024-08-15");
        assert_eq!(summer.len(), 2);

        let recent = notes.recent_notes(2);
        assert_eq!(recent[0].file_path, "/v/rain.mp4");
        assert_eq!(recent[1].file_path, "/v/cat.mp4");

        assert!(notes.all_tags().contains("pets"));
    }

    #[test]
    fn token_search_respects_threshold_and_allowed_keys() {
        let dir = tempdir().unwrap();
        seed(
            dir.path(),
            "/v/beach.mp4,sunset at the beach,,summer,,,2024-07-01T10:00:00\n\
             /v/other.mp4,sunset in the city,,,,,2024-07-02T10:00:00\n",
        );
        let (_log, notes) = open(dir.path());
        let all: BTreeSet<String> = ["/v/beach.mp4", "/v/other.mp4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let hits = notes.search_notes_by_keys("summer beach sunset", &all, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_path, "/v/beach.mp4");

        let loose = notes.search_notes_by_keys("summer beach sunset", &all, 0.3);
        assert_eq!(loose.len(), 2);
        assert_eq!(loose[0].file_path, "/v/beach.mp4");

        let only_other: BTreeSet<String> = ["/v/other.mp4".to_string()].into_iter().collect();
        assert!(notes
            .search_notes_by_keys("summer beach sunset", &only_other, DEFAULT_MATCH_THRESHOLD)
            .is_empty());
        assert!(notes.search_notes_by_keys("   ", &all, 0.0).is_empty());
    }

    #[test]
    fn parse_rating_handles_legacy_cells() {
        assert_eq!(parse_rating(""), None);
        assert_eq!(parse_rating("0"), None);
        assert_eq!(parse_rating("-2"), None);
        assert_eq!(parse_rating("4.0"), Some(4.0));
        assert_eq!(parse_rating(" 3 "), Some(3.0));
        assert_eq!(parse_rating("4.5"), Some(4.5));
        assert_eq!(parse_rating("n/a"), None);
    }

    #[test]
    fn fractional_rating_survives_unrelated_rewrite() {
        let dir = tempdir().unwrap();
        seed(dir.path(), "/a/x.mp4,hi,4.5,\"rock, roll\",,,2024-01-01T10:00:00\n");
        let (_log, notes) = open(dir.path());
        notes
            .set_note("/b/other.mp4", "unrelated", NoteUpdate::default())
            .unwrap();

        let text = fs::read_to_string(dir.path().join("notes.csv")).unwrap();
        assert!(text.contains("/a/x.mp4,hi,4.5,"), "{text}");
        let (_log, reloaded) = open(dir.path());
        assert_eq!(reloaded.raw_note("/a/x.mp4").unwrap().rating, Some(4.5));
    }

    #[test]
    fn tags_read_back_as_written() {
        let dir = tempdir().unwrap();
        let (_log, notes) = open(dir.path());
        let saved = notes
            .set_note(
                "/v/a.mp4",
                "x",
                NoteUpdate::default().with_tags(["rock, roll", "jazz"]),
            )
            .unwrap();
        let expected: BTreeSet<String> = ["jazz", "rock", "roll"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(saved.tags, expected);

        let (_log, reloaded) = open(dir.path());
        assert_eq!(reloaded.raw_note("/v/a.mp4").unwrap().tags, saved.tags);
    }

    #[test]
    fn failed_write_leaves_notes_untouched() {
        let dir = tempdir().unwrap();
        let (_log, notes) = open(dir.path());
        notes.set_note("/v/a.mp4", "kept", NoteUpdate::default()).unwrap();
        let table = dir.path().join("notes.csv");
        let on_disk = fs::read(&table).unwrap();

        fs::remove_file(&table).unwrap();
        fs::create_dir(&table).unwrap();
        assert!(notes.set_note("/v/b.mp4", "new", NoteUpdate::default()).is_err());
        assert!(notes.set_note("/v/a.mp4", "changed", NoteUpdate::default()).is_err());
        assert!(notes.delete_note("/v/a.mp4").is_err());
        assert!(notes.update_note_key("/v/a.mp4", "/w/a.mp4").is_err());
        assert!(notes.raw_note("/v/b.mp4").is_none());
        assert_eq!(notes.raw_note("/v/a.mp4").unwrap().note, "kept");
        assert!(notes.raw_note("/w/a.mp4").is_none());

        fs::remove_dir(&table).unwrap();
        fs::write(&table, on_disk).unwrap();
        notes.set_note("/v/b.mp4", "new", NoteUpdate::default()).unwrap();
        let (_log, reloaded) = open(dir.path());
        assert_eq!(reloaded.raw_note("/v/b.mp4").unwrap().note, "new");
    }
}
