//! Durable vector collection backing the code index.
//!
//! Entries are `(text, vector, metadata)` triples appended to a `SQLite`
//! database that lives inside a caller-chosen directory. Similarity queries
//! scan the collection and rank by cosine similarity.

pub mod error;
pub mod store;
pub mod types;
pub(crate) mod vector;

pub use error::{Result, StoreError};
pub use store::IndexStore;
pub use types::{Entry, Metadata, ScoredEntry};
