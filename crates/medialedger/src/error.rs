use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Trash error: {0}")]
    Trash(String),

    #[error("Hook '{name}' failed: {message}")]
    Hook { name: String, message: String },

    #[error("Api Error: {0}")]
    Api(String),
}

impl From<confique::Error> for LedgerError {
    fn from(err: confique::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
