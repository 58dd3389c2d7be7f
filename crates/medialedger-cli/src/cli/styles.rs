//! Semantic styles for terminal output.
//!
//! Renderers ask for a style by what the text *is* (a path, a status, a
//! timestamp), never by color. `console` drops the escape codes on its own
//! when stdout is not a terminal, so piped output and tests see plain text.

use console::{Style, StyledObject};

pub fn path<D>(value: D) -> StyledObject<D> {
    Style::new().cyan().apply_to(value)
}

pub fn muted<D>(value: D) -> StyledObject<D> {
    Style::new().dim().apply_to(value)
}

pub fn title<D>(value: D) -> StyledObject<D> {
    Style::new().bold().apply_to(value)
}

pub fn success<D>(value: D) -> StyledObject<D> {
    Style::new().green().apply_to(value)
}

pub fn warning<D>(value: D) -> StyledObject<D> {
    Style::new().yellow().bold().apply_to(value)
}

pub fn error<D>(value: D) -> StyledObject<D> {
    Style::new().red().bold().apply_to(value)
}

/// Stars for a 0..=5 rating, rounded to whole stars.
pub fn rating(value: f64) -> StyledObject<String> {
    let filled = value.round().clamp(0.0, 5.0) as usize;
    Style::new()
        .yellow()
        .apply_to(format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled)))
}
