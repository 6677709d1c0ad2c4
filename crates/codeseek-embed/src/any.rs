#[cfg(feature = "candle")]
use crate::candle::CandleEmbedder;
use crate::config::{EmbeddingConfig, EmbeddingProviderKind};
use crate::embedder::{Embedder, ensure_count};
use crate::error::{EmbedError, Result};
use crate::hash::HashEmbedder;
use crate::ollama::OllamaEmbedder;

/// Generates a match over all `AnyEmbedder` variants, binding the inner
/// embedder and evaluating the given expression for each arm.
macro_rules! delegate_embedder {
    ($self:expr, |$e:ident| $expr:expr) => {
        match $self {
            #[cfg(feature = "candle")]
            AnyEmbedder::Candle($e) => $expr,
            AnyEmbedder::Ollama($e) => $expr,
            AnyEmbedder::Hash($e) => $expr,
        }
    };
}

/// Embedding backend selected at runtime from configuration.
///
/// Loaded once per indexing run and dropped when the run ends.
#[derive(Debug, Clone)]
pub enum AnyEmbedder {
    #[cfg(feature = "candle")]
    Candle(CandleEmbedder),
    Ollama(OllamaEmbedder),
    Hash(HashEmbedder),
}

impl AnyEmbedder {
    /// Load the configured model. Failure here is fatal for an indexing run.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::ModelLoad`] if weights cannot be fetched or the
    /// remote model does not answer, and [`EmbedError::Unsupported`] if the
    /// backend was not compiled in.
    pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            "loading embedding model"
        );
        match config.provider {
            EmbeddingProviderKind::Candle => Self::load_candle(config).await,
            EmbeddingProviderKind::Ollama => {
                let embedder =
                    OllamaEmbedder::new(&config.base_url, config.model.clone(), config.batch_size);
                let dim = embedder.probe().await?;
                tracing::debug!(dim, "ollama embedding model reachable");
                Ok(Self::Ollama(embedder))
            }
            EmbeddingProviderKind::Hash => Ok(Self::Hash(HashEmbedder::new(config.dimensions)?)),
        }
    }

    #[cfg(feature = "candle")]
    async fn load_candle(config: &EmbeddingConfig) -> Result<Self> {
        let model = config.model.clone();
        let batch_size = config.batch_size;
        let embedder = tokio::task::spawn_blocking(move || {
            CandleEmbedder::load(&model, batch_size, &crate::candle::detect_device())
        })
        .await
        .map_err(|e| EmbedError::ModelLoad(format!("model loading task failed: {e}")))??;
        Ok(Self::Candle(embedder))
    }

    #[cfg(not(feature = "candle"))]
    #[allow(clippy::unused_async)]
    async fn load_candle(_config: &EmbeddingConfig) -> Result<Self> {
        Err(EmbedError::Unsupported {
            provider: "candle",
            reason: "not compiled in; rebuild with `--features candle`",
        })
    }

    #[must_use]
    pub fn provider(&self) -> EmbeddingProviderKind {
        match self {
            #[cfg(feature = "candle")]
            Self::Candle(_) => EmbeddingProviderKind::Candle,
            Self::Ollama(_) => EmbeddingProviderKind::Ollama,
            Self::Hash(_) => EmbeddingProviderKind::Hash,
        }
    }
}

impl Embedder for AnyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = delegate_embedder!(self, |e| e.embed_batch(texts).await)?;
        ensure_count(self.provider().as_str(), texts.len(), vectors)
    }

    fn name(&self) -> &str {
        delegate_embedder!(self, |e| e.name())
    }
}
