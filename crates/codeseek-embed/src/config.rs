use serde::{Deserialize, Serialize};

/// Which backend turns code text into vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local BERT sentence-transformer via Candle.
    #[default]
    Candle,
    /// Remote Ollama `/api/embed`.
    Ollama,
    /// Offline feature hashing; no model weights.
    Hash,
}

impl EmbeddingProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Candle => "candle",
            Self::Ollama => "ollama",
            Self::Hash => "hash",
        }
    }
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    /// Hugging Face repo id or local directory (candle), or model tag (ollama).
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    /// Texts per forward pass or request.
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
    /// Vector width for the hash provider.
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

pub fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".into()
}

fn default_embedding_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_embedding_batch_size() -> usize {
    32
}

fn default_embedding_dimensions() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: default_embedding_model(),
            base_url: default_embedding_base_url(),
            batch_size: default_embedding_batch_size(),
            dimensions: default_embedding_dimensions(),
        }
    }
}
