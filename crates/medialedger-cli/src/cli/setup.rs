use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "medialedger",
    bin_name = "medialedger",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Keep categories, notes, favorites and deletion marks attached to media files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding the tables (overrides MEDIALEDGER_DATA_DIR)
    #[arg(long, global = true, help_heading = "Options")]
    pub data: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true, help_heading = "Options")]
    pub yes: bool,

    /// Log debug detail to medialedger.log
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Move files into a folder, carrying their metadata along
    #[command(display_order = 1)]
    Mv {
        /// Files to move
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,

        /// Destination folder
        #[arg(short, long)]
        to: PathBuf,
    },

    /// Manage categories
    #[command(name = "cat", display_order = 2)]
    Category {
        #[command(subcommand)]
        action: CategoryCommands,
    },

    /// Manage notes
    #[command(display_order = 3)]
    Note {
        #[command(subcommand)]
        action: NoteCommands,
    },

    /// Manage favorites
    #[command(name = "fav", display_order = 4)]
    Favorite {
        #[command(subcommand)]
        action: FavoriteCommands,
    },

    /// Mark, unmark and delete files
    #[command(name = "del", display_order = 5)]
    Deletion {
        #[command(subcommand)]
        action: DeletionCommands,
    },

    /// Show everything known about a file
    #[command(display_order = 6)]
    Props {
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show where a file came from and where it went
    #[command(display_order = 7)]
    History { path: PathBuf },

    /// Show the resolved configuration
    #[command(display_order = 8)]
    Config,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Add files to a category
    Add {
        category: String,
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },

    /// Remove a file from a category
    Rm { category: String, path: PathBuf },

    /// Rename a category
    Rename {
        old: String,
        new: String,

        /// Merge into the target if it already exists
        #[arg(long)]
        merge: bool,
    },

    /// Delete a category and all its entries
    Delete { category: String },

    /// List categories with their latest addition
    #[command(alias = "ls")]
    List,

    /// List files in a category
    Files { category: String },

    /// List categories of a file
    Of { path: PathBuf },
}

#[derive(Args, Debug, Default)]
pub struct NoteFields {
    /// Rating from 0 to 5, fractions allowed (0 clears it)
    #[arg(short, long)]
    pub rating: Option<f64>,

    /// Tags (repeat or comma-separate)
    #[arg(short, long = "tag", value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(short, long)]
    pub mood: Option<String>,

    #[arg(short, long)]
    pub context: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Show the note for a file, merged across its previous locations
    Get { path: PathBuf },

    /// Write the note for a file
    Set {
        path: PathBuf,
        note: String,
        #[command(flatten)]
        fields: NoteFields,
    },

    /// Delete the note for a file
    Rm { path: PathBuf },

    /// List every note
    #[command(alias = "ls")]
    List,

    /// Search notes
    Search {
        query: String,

        /// Match by word overlap instead of substring
        #[arg(long)]
        fuzzy: bool,
    },

    /// Most recently written notes
    Recent {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Notes carrying a tag
    Tag { tag: String },

    /// Every tag in use
    Tags,

    /// Notes rated at least `min`
    Rated { min: f64 },

    /// Notes with a mood
    Mood { mood: String },

    /// Notes with a context
    Context { context: String },

    /// Notes written between two dates (YYYY-MM-DD, inclusive)
    Range { start: String, end: String },
}

#[derive(Subcommand, Debug)]
pub enum FavoriteCommands {
    Add { path: PathBuf },
    Rm { path: PathBuf },
    Check { path: PathBuf },
    /// List favorites that still exist on disk
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand, Debug)]
pub enum DeletionCommands {
    /// Mark a file for deletion (marking twice offers to delete now)
    Mark { path: PathBuf },

    /// Remove a deletion mark
    Unmark { path: PathBuf },

    /// Delete one file now
    Now { path: PathBuf },

    /// Delete every marked file
    Run,

    /// Repair statuses against the disk
    Reconcile,

    /// Fill in size and mtime for old entries
    Refactor,

    /// List deletion entries
    #[command(alias = "ls")]
    List,
}
