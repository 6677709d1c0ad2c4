//! Error types for codeseek-index.

use std::path::PathBuf;

/// Errors that can occur during code indexing.
///
/// `Io` and `Syntax` are per-file and absorbed by the walker; `Embed` and
/// `Store` are fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading a source file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source does not parse.
    #[error("line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Parser setup or invocation failed.
    #[error("parse failed: {0}")]
    Parse(String),

    /// Index root does not exist or is not a directory.
    #[error("index root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// Embedding model failed to load or run.
    #[error("embedding error: {0}")]
    Embed(#[from] codeseek_embed::EmbedError),

    /// Index store rejected or failed a write.
    #[error("store error: {0}")]
    Store(#[from] codeseek_store::StoreError),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
