//! # CLI Layer
//!
//! This is **one possible client** for medialedger, not the application itself.
//! It is the only place that knows about terminal I/O, prompts, exit codes and
//! the log file.
//!
//! ## Conventions
//!
//! - **Paths**: every path argument is made absolute (without resolving
//!   symlinks) before it reaches the library, so `clip.mp4` and `./clip.mp4`
//!   refer to the same table key.
//! - **Prompts**: the three decision points (re-marking a marked file, saving a
//!   favorite from deletion, deleting all marked files) ask on stderr and read
//!   a line from stdin. `--yes` answers every prompt with yes; anything but
//!   `y`/`yes` is a no.
//! - **Logging**: library events go to `medialedger.log` in the data directory,
//!   never to the terminal. `-v` adds debug detail.
//! - **Failures**: commands that could not do what was asked exit with status 1
//!   and an `Error:` line on stderr. Expected no-ops (adding a file twice) are
//!   reported on stdout and exit 0.
//!
//! ## Module Structure
//!
//! - `setup`: argument parsing via clap
//! - `commands`: per-command handlers that call the library
//! - `render`: output formatting
//! - `styles`: semantic terminal styles

mod commands;
mod render;
pub mod setup;
mod styles;

pub use commands::run;
