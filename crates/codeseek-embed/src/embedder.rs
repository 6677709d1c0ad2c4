use crate::error::EmbedError;

/// A loaded embedding model.
///
/// Implementations must be deterministic for a fixed model and input, and
/// must return exactly one vector per input text, in input order.
pub trait Embedder: Send + Sync {
    /// Embed the whole batch in one logical call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to produce embeddings.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, EmbedError>> + Send;

    /// Identifier of the underlying model, recorded alongside stored vectors.
    fn name(&self) -> &str;
}

/// Reject backends that answered with the wrong number of vectors.
pub(crate) fn ensure_count(
    provider: &'static str,
    expected: usize,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    if vectors.len() == expected {
        Ok(vectors)
    } else {
        Err(EmbedError::CountMismatch {
            provider,
            expected,
            actual: vectors.len(),
        })
    }
}
