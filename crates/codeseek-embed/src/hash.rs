//! Deterministic feature-hashing embedder.
//!
//! Splits text into identifier-like tokens, hashes each with blake3 into a
//! signed bucket, and L2-normalizes the result. Lexical only, but stable
//! across runs and platforms, and needs no model download.

use crate::embedder::Embedder;
use crate::error::{EmbedError, Result};

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    name: String,
}

impl HashEmbedder {
    /// # Errors
    ///
    /// Returns [`EmbedError::ModelLoad`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(EmbedError::ModelLoad(
                "hash embedder needs at least one dimension".into(),
            ));
        }
        Ok(Self {
            dimensions,
            name: format!("hash-{dimensions}"),
        })
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[must_use]
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for token in tokens(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let bucket = u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]);
            #[allow(clippy::cast_possible_truncation)]
            let index = (bucket % self.dimensions as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

/// Lowercased identifier tokens; `snake_case` and `camelCase` parts are
/// emitted alongside the whole identifier.
fn tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
    {
        out.push(word.to_lowercase());

        let mut parts = Vec::new();
        for piece in word.split('_').filter(|p| !p.is_empty()) {
            let mut current = String::new();
            for c in piece.chars() {
                if c.is_uppercase() && !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
                current.extend(c.to_lowercase());
            }
            if !current.is_empty() {
                parts.push(current);
            }
        }
        if parts.len() > 1 {
            out.extend(parts);
        }
    }
    out
}

impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
