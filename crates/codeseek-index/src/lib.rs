//! Semantic code indexing for Python source trees.
//!
//! Pipeline: the walker visits eligible files, the extractor turns each
//! file's syntax tree into function/class units, the embedder vectorizes the
//! unit texts in one batch, and the store appends `(text, vector, metadata)`
//! entries to a persisted collection.

pub mod error;
pub mod extractor;
pub mod indexer;
pub(crate) mod tree;
pub mod unit;
pub mod walker;

pub use error::{IndexError, Result};
pub use indexer::{
    CodeIndexer, IndexOutcome, IndexPhase, IndexReport, IndexRunConfig, embed_units, run_index,
};
pub use unit::{CodeUnit, UnitKind};
pub use walker::{WalkConfig, WalkReport, collect_units};
