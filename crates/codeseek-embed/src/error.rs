#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("model loading failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("{provider} returned {actual} embeddings for {expected} inputs")]
    CountMismatch {
        provider: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("embedding provider {provider} is not available: {reason}")]
    Unsupported {
        provider: &'static str,
        reason: &'static str,
    },

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "candle")]
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, EmbedError>;
