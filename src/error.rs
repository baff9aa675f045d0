use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BrewpadError {
    #[error("invalid recipe payload: {0}")]
    InvalidEntry(String),

    #[error("invalid recipe category: {0}")]
    InvalidCategory(String),

    #[error("recipe is incomplete: {0}")]
    IncompleteEntry(String),

    #[error("recipe file exceeds {limit} bytes: {name} ({size} bytes)")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    #[error("recipe is read-only: {0}")]
    ReadOnlyEntry(String),

    #[error("recipe not found: {0}")]
    EntryNotFound(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid birthday (expected YYYY-MM-DD): {0}")]
    InvalidBirthday(String),

    #[error("recipe server request failed: {0}")]
    RemoteHttp(String),

    #[error("recipe server returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
