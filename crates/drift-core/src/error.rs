use std::path::PathBuf;

use thiserror::Error;

/// Core error type for drift operations.
///
/// Backend and I/O causes are carried as sources rather than formatted
/// into strings, so callers see the underlying error unchanged.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No provider named '{0}' is registered")]
    UnknownProvider(String),

    #[error("Changeset file not found: {0}")]
    ChangesetNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to the database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Migration '{name}' failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Migration history is unreadable: {0}")]
    History(#[source] sqlx::Error),

    #[error("Interrupted")]
    Interrupted,
}

/// Result type alias using Error.
pub type Result<T> = std::result::Result<T, Error>;
