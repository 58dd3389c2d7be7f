//! # Medialedger CLI
//!
//! The binary is intentionally thin: the CLI lives in `src/cli/`, while this
//! file only invokes `cli::run()` and handles process termination.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/medialedger-cli/src/cli/)         │
//! │  - clap parsing, prompts, rendering, log file        │
//! └──────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌──────────────────────────────────────────────────────┐
//! │  Ledger facade (crates/medialedger/src/ledger.rs)    │
//! │  - opens every index over one data directory         │
//! └──────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌──────────────────────────────────────────────────────┐
//! │  Indices + Move Orchestrator                         │
//! │  - no terminal I/O, no process exits                 │
//! └──────────────────────────────────────────────────────┘
//! ```

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
