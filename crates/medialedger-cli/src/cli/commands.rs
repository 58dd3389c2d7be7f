//! # Command dispatch
//!
//! `run` parses arguments, installs the file logger, opens the ledger, and hands
//! each subcommand to a small handler that calls the library and prints the
//! rendered result. Handlers never format data themselves; see `render`.

use super::render;
use super::setup::{
    CategoryCommands, Cli, Commands, DeletionCommands, FavoriteCommands, NoteCommands,
    NoteFields,
};
use super::styles;
use anyhow::{bail, Context, Result};
use clap::Parser;
use console::Term;
use medialedger::fsops::{Confirm, InlineScheduler};
use medialedger::notes::NoteUpdate;
use medialedger::orchestrator::MoveOutcome;
use medialedger::{Ledger, LedgerConfig};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::Level;

pub const LOG_FILE: &str = "medialedger.log";

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = LedgerConfig::load(cli.data.as_deref()).context("loading configuration")?;
    let data_dir = config.data_dir();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    init_logging(&data_dir, cli.verbose)?;

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    // The process exits right after the command, so background work runs inline.
    let ledger = Ledger::open_with(config, Arc::new(InlineScheduler))
        .with_context(|| format!("opening ledger in {}", data_dir.display()))?;
    let prompt = Prompt { assume_yes: cli.yes };

    match cli.command {
        Commands::Mv { paths, to } => handle_move(&ledger, &paths, &to),
        Commands::Category { action } => handle_category(&ledger, action),
        Commands::Note { action } => handle_note(&ledger, action),
        Commands::Favorite { action } => handle_favorite(&ledger, action),
        Commands::Deletion { action } => handle_deletion(&ledger, action, &prompt),
        Commands::Props { path, json } => {
            let props = ledger.properties(&key(&path)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&props)?);
            } else {
                print!("{}", render::properties(&props));
            }
            Ok(())
        }
        Commands::History { path } => {
            print!("{}", render::history(&ledger.transfers().history(&key(&path)?)));
            Ok(())
        }
        Commands::Config => Ok(()),
    }
}

fn init_logging(data_dir: &Path, verbose: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))
        .context("opening log file")?;
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    // A second init in the same process (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .try_init();
    Ok(())
}

/// Absolute, unresolved path string used as the key in every table.
fn key(path: &Path) -> Result<String> {
    let abs = std::path::absolute(path)
        .with_context(|| format!("resolving {}", path.display()))?;
    Ok(abs.to_string_lossy().into_owned())
}

struct Prompt {
    assume_yes: bool,
}

impl Confirm for Prompt {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let term = Term::stderr();
        if term.write_str(&format!("{prompt} [y/N] ")).is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn handle_move(ledger: &Ledger, paths: &[PathBuf], to: &Path) -> Result<()> {
    let sources = paths
        .iter()
        .map(|p| std::path::absolute(p).with_context(|| format!("resolving {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    let dest = std::path::absolute(to)?;

    let outcomes = ledger.mover().move_files(&sources, &dest);
    let mut failed = 0;
    for (src, outcome) in &outcomes {
        print!("{}", render::move_outcome(src, outcome));
        if matches!(outcome, MoveOutcome::Failed(_)) {
            failed += 1;
        }
    }
    let stats = ledger.mover().stats();
    if stats.files > 0 {
        println!(
            "{}",
            styles::muted(format!("{} file(s), {} bytes", stats.files, stats.bytes))
        );
    }
    if failed > 0 {
        bail!("{failed} of {} move(s) failed", outcomes.len());
    }
    Ok(())
}

fn handle_category(ledger: &Ledger, action: CategoryCommands) -> Result<()> {
    let categories = ledger.categories();
    match action {
        CategoryCommands::Add { category, paths } => {
            for path in paths {
                let path = key(&path)?;
                if categories.add_to_category(&category, &path)? {
                    println!("{} {} to {}", styles::success("added"), path, category);
                } else {
                    println!("{} already in {}", path, category);
                }
            }
        }
        CategoryCommands::Rm { category, path } => {
            let path = key(&path)?;
            if categories.remove_from_category(&category, &path)? {
                println!("{} {} from {}", styles::success("removed"), path, category);
            } else {
                println!("{} is not in {}", path, category);
            }
        }
        CategoryCommands::Rename { old, new, merge } => {
            let outcome = categories.rename_category(&old, &new, merge)?;
            if !outcome.is_success() {
                bail!(outcome.message());
            }
            println!("{}", outcome);
        }
        CategoryCommands::Delete { category } => {
            if !categories.delete_category(&category)? {
                bail!("no category named '{category}'");
            }
            println!("{} {}", styles::success("deleted"), category);
        }
        CategoryCommands::List => {
            print!(
                "{}",
                render::categories_with_dates(&categories.all_categories_with_latest_date())
            );
        }
        CategoryCommands::Files { category } => {
            print!(
                "{}",
                render::lines(categories.files_in_category(&category), "No files.")
            );
        }
        CategoryCommands::Of { path } => {
            print!(
                "{}",
                render::lines(categories.categories_of_file(&key(&path)?), "No categories.")
            );
        }
    }
    Ok(())
}

fn note_update(fields: NoteFields) -> NoteUpdate {
    NoteUpdate {
        rating: fields.rating,
        tags: (!fields.tags.is_empty()).then(|| fields.tags.into_iter().collect()),
        mood: fields.mood,
        context: fields.context,
    }
}

fn handle_note(ledger: &Ledger, action: NoteCommands) -> Result<()> {
    let notes = ledger.notes();
    match action {
        NoteCommands::Get { path } => match notes.get_note(&key(&path)?) {
            Some(record) => print!("{}", render::note(&record)),
            None => println!("{}", styles::muted("No note.")),
        },
        NoteCommands::Set { path, note, fields } => {
            if fields.rating.is_some_and(|r| !(0.0..=5.0).contains(&r)) {
                bail!("rating must be between 0 and 5");
            }
            let record = notes.set_note(&key(&path)?, &note, note_update(fields))?;
            print!("{}", render::note(&record));
        }
        NoteCommands::Rm { path } => {
            if !notes.delete_note(&key(&path)?)? {
                bail!("no note for {}", path.display());
            }
            println!("{}", styles::success("note deleted"));
        }
        NoteCommands::List => print!("{}", render::note_list(&notes.list_notes())),
        NoteCommands::Search { query, fuzzy } => {
            let found = if fuzzy {
                let keys: BTreeSet<String> =
                    notes.list_notes().into_iter().map(|r| r.file_path).collect();
                notes.search_notes_by_keys(&query, &keys, ledger.config().note_match_threshold)
            } else {
                notes.search_notes(&query)
            };
            print!("{}", render::note_list(&found));
        }
        NoteCommands::Recent { count } => print!("{}", render::note_list(&notes.recent_notes(count))),
        NoteCommands::Tag { tag } => print!("{}", render::note_list(&notes.notes_by_tag(&tag))),
        NoteCommands::Tags => print!("{}", render::lines(notes.all_tags(), "No tags.")),
        NoteCommands::Rated { min } => {
            print!("{}", render::note_list(&notes.notes_by_rating(min)))
        }
        NoteCommands::Mood { mood } => print!("{}", render::note_list(&notes.notes_by_mood(&mood))),
        NoteCommands::Context { context } => {
            print!("{}", render::note_list(&notes.notes_by_context(&context)))
        }
        NoteCommands::Range { start, end } => {
            print!("{}", render::note_list(&notes.notes_in_date_range(&start, &end)))
        }
    }
    Ok(())
}

fn handle_favorite(ledger: &Ledger, action: FavoriteCommands) -> Result<()> {
    let favorites = ledger.favorites();
    match action {
        FavoriteCommands::Add { path } => {
            let path = key(&path)?;
            if favorites.add_to_favorites(&path)? {
                println!("{} {}", styles::success("favorited"), path);
            } else {
                println!("{} is already a favorite", path);
            }
        }
        FavoriteCommands::Rm { path } => {
            let path = key(&path)?;
            if !favorites.delete_from_favorites(&path)? {
                bail!("{path} is not a favorite");
            }
            println!("{} {}", styles::success("unfavorited"), path);
        }
        FavoriteCommands::Check { path } => {
            let path = key(&path)?;
            if favorites.check_favorites(&path) {
                println!("{} is a favorite", path);
            } else {
                bail!("{path} is not a favorite");
            }
        }
        FavoriteCommands::List => {
            print!("{}", render::paths(&favorites.get_favorites(), "No favorites."))
        }
    }
    Ok(())
}

fn handle_deletion(ledger: &Ledger, action: DeletionCommands, prompt: &Prompt) -> Result<()> {
    let deletion = ledger.deletion();
    match action {
        DeletionCommands::Mark { path } => {
            let path = key(&path)?;
            let outcome = deletion.mark_for_deletion(&path, prompt)?;
            print!("{}", render::mark_outcome(&path, &outcome));
        }
        DeletionCommands::Unmark { path } => {
            let path = key(&path)?;
            if !deletion.remove_from_deletion(&path)? {
                match deletion.status(&path) {
                    Some(status) => bail!("{path} is {status} and cannot be unmarked"),
                    None => bail!("{path} is not marked"),
                }
            }
            println!("{} {}", styles::success("unmarked"), path);
        }
        DeletionCommands::Now { path } => {
            let path = key(&path)?;
            let status = deletion.delete(&path, prompt)?;
            print!("{}", render::deleted(&path, status));
        }
        DeletionCommands::Run => match deletion.delete_marked(prompt)? {
            None => println!("{}", styles::muted("Nothing deleted.")),
            Some(report) => {
                for (path, status) in &report.removed {
                    print!("{}", render::deleted(path, *status));
                }
                for (path, err) in &report.failed {
                    println!("{} {}: {}", styles::error("failed"), path, err);
                }
                if !report.failed.is_empty() {
                    bail!("{} deletion(s) failed", report.failed.len());
                }
            }
        },
        DeletionCommands::Reconcile => print!("{}", render::reconcile(&deletion.reconcile()?)),
        DeletionCommands::Refactor => {
            let filled = deletion.refactor()?;
            println!("Backfilled {filled} entr{}", if filled == 1 { "y" } else { "ies" });
        }
        DeletionCommands::List => print!("{}", render::deletion_table(&deletion.entries())),
    }
    Ok(())
}
