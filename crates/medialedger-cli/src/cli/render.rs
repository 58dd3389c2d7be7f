//! Plain-text rendering of library results.
//!
//! Every function returns a `String` so the output can be asserted on without a
//! terminal. Lines end with `\n`; empty collections render a short hint.

use super::styles;
use medialedger::deletion::{DeletionRecord, DeletionStatus, MarkOutcome, ReconcileReport};
use medialedger::history::PathHistory;
use medialedger::notes::NoteRecord;
use medialedger::orchestrator::MoveOutcome;
use medialedger::FileProperties;
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub fn move_outcome(src: &Path, outcome: &MoveOutcome) -> String {
    match outcome {
        MoveOutcome::Moved {
            dest,
            hook_failures,
        } => {
            let mut out = format!(
                "{} {} -> {}\n",
                styles::success("moved"),
                styles::path(src.display()),
                styles::path(dest.display())
            );
            for failure in hook_failures {
                let _ = writeln!(out, "  {} {}", styles::warning("warning:"), failure);
            }
            out
        }
        MoveOutcome::Skipped(reason) => format!("{} {}\n", styles::muted("skipped"), reason),
        MoveOutcome::Failed(reason) => format!("{} {}\n", styles::error("failed"), reason),
    }
}

pub fn lines<I, S>(items: I, empty: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "{}", item.as_ref());
    }
    if out.is_empty() {
        out = format!("{}\n", styles::muted(empty));
    }
    out
}

pub fn paths(items: &[PathBuf], empty: &str) -> String {
    lines(items.iter().map(|p| p.display().to_string()), empty)
}

pub fn categories_with_dates(rows: &[(String, String)]) -> String {
    if rows.is_empty() {
        return format!("{}\n", styles::muted("No categories."));
    }
    let width = rows.iter().map(|(c, _)| c.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (category, date) in rows {
        let _ = writeln!(
            out,
            "{:<width$}  {}",
            category,
            styles::muted(date),
            width = width
        );
    }
    out
}

pub fn note(record: &NoteRecord) -> String {
    let mut out = format!("{}\n", styles::title(&record.file_path));
    if let Some(rating) = record.rating {
        let _ = writeln!(out, "rating:  {}", styles::rating(rating));
    }
    if !record.tags.is_empty() {
        let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
        let _ = writeln!(out, "tags:    {}", tags.join(", "));
    }
    if !record.mood.is_empty() {
        let _ = writeln!(out, "mood:    {}", record.mood);
    }
    if !record.context.is_empty() {
        let _ = writeln!(out, "context: {}", record.context);
    }
    if !record.timestamp.is_empty() {
        let _ = writeln!(out, "written: {}", styles::muted(&record.timestamp));
    }
    if !record.note.is_empty() {
        let _ = writeln!(out, "\n{}", record.note);
    }
    out
}

/// One line per note: path, rating, first line of text.
pub fn note_list(records: &[NoteRecord]) -> String {
    if records.is_empty() {
        return format!("{}\n", styles::muted("No notes."));
    }
    let mut out = String::new();
    for record in records {
        let first = record.note.lines().next().unwrap_or("");
        let stars = record
            .rating
            .map(|r| format!(" {}", styles::rating(r)))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{}{}  {}",
            styles::path(&record.file_path),
            stars,
            first
        );
    }
    out
}

pub fn mark_outcome(path: &str, outcome: &MarkOutcome) -> String {
    match outcome {
        MarkOutcome::Marked => format!("{} {}\n", styles::success("marked"), styles::path(path)),
        MarkOutcome::Removed(status) => deleted(path, *status),
        MarkOutcome::Kept => format!("{} {}\n", styles::muted("still marked"), styles::path(path)),
        MarkOutcome::AlreadyHandled(status) => {
            format!("{} is already {}\n", styles::path(path), status)
        }
    }
}

pub fn deleted(path: &str, status: DeletionStatus) -> String {
    let verb = match status {
        DeletionStatus::Deleted => styles::success("trashed"),
        DeletionStatus::MovedToFavoritesBackup => styles::success("backed up"),
        DeletionStatus::ToDelete => styles::muted("marked"),
    };
    format!("{} {}\n", verb, styles::path(path))
}

pub fn deletion_table(entries: &[DeletionRecord]) -> String {
    if entries.is_empty() {
        return format!("{}\n", styles::muted("No deletion entries."));
    }
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{:<22} {}  {}",
            entry.status.to_string(),
            styles::path(&entry.path),
            styles::muted(format!("{} bytes, {}", entry.size, entry.modified))
        );
    }
    out
}

pub fn reconcile(report: &ReconcileReport) -> String {
    if report.is_empty() {
        return "Deletion table already matches the disk.\n".to_string();
    }
    let mut out = String::new();
    for path in &report.restored {
        let _ = writeln!(out, "{} {}", styles::warning("back on disk:"), path);
    }
    for path in &report.vanished {
        let _ = writeln!(out, "{} {}", styles::muted("gone:"), path);
    }
    out
}

pub fn history(hop: &PathHistory) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "from:    {}",
        hop.previous.as_deref().unwrap_or("-")
    );
    let _ = writeln!(out, "current: {}", styles::path(&hop.current));
    let _ = writeln!(
        out,
        "to:      {}",
        hop.destination.as_deref().unwrap_or("-")
    );
    out
}

pub fn properties(props: &FileProperties) -> String {
    let mut out = format!("{}\n", styles::title(&props.path));
    if !props.exists {
        let _ = writeln!(out, "  {}", styles::warning("not on disk"));
    }
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    let _ = writeln!(out, "favorite:   {}", yes_no(props.favorite));
    let _ = writeln!(
        out,
        "deletion:   {}",
        props
            .deletion
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    let categories: Vec<&str> = props.categories.iter().map(String::as_str).collect();
    let _ = writeln!(
        out,
        "categories: {}",
        if categories.is_empty() {
            "-".to_string()
        } else {
            categories.join(", ")
        }
    );
    let others: Vec<&str> = props
        .related_paths
        .iter()
        .filter(|p| **p != props.path)
        .map(String::as_str)
        .collect();
    if !others.is_empty() {
        let _ = writeln!(out, "also known as:");
        for other in others {
            let _ = writeln!(out, "  {}", styles::muted(other));
        }
    }
    if let Some(note) = &props.note {
        let _ = writeln!(out, "note:");
        for line in note.note.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    out
}
