//! Embedding adapter: maps batches of code text to fixed-width vectors.

pub mod any;
#[cfg(feature = "candle")]
pub mod candle;
pub mod config;
pub mod embedder;
pub mod error;
pub mod hash;
pub mod ollama;

pub use any::AnyEmbedder;
pub use config::{EmbeddingConfig, EmbeddingProviderKind};
pub use embedder::Embedder;
pub use error::EmbedError;
