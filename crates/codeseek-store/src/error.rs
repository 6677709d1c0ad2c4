//! Error types for codeseek-store.

/// Errors raised while opening, writing, or querying the index store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("integer conversion: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    /// `ingest` was called with ragged inputs. Nothing is written.
    #[error(
        "ingest length mismatch: {texts} texts, {vectors} vectors, {metadatas} metadata records"
    )]
    LengthMismatch {
        texts: usize,
        vectors: usize,
        metadatas: usize,
    },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("empty vector")]
    EmptyVector,

    /// A vector component is NaN or infinite. `index` is the position in the batch.
    #[error("vector {index} has a non-finite component")]
    NonFinite { index: usize },

    #[error("corrupt entry {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
