use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::embedder::{Embedder, ensure_count};
use crate::error::{EmbedError, Result};

/// Embeddings from a running Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Ollama,
    model: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    #[must_use]
    pub fn new(base_url: &str, model: String, batch_size: usize) -> Self {
        let (host, port) = parse_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed a single probe string to confirm the model is served.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::ModelLoad`] if the server or model is unavailable.
    pub async fn probe(&self) -> Result<usize> {
        let vectors = self
            .request(vec!["probe".to_owned()])
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("ollama model {}: {e}", self.model)))?;
        vectors
            .first()
            .map(Vec::len)
            .filter(|len| *len > 0)
            .ok_or_else(|| {
                EmbedError::ModelLoad(format!("ollama model {} returned no vector", self.model))
            })
    }

    async fn request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let request =
            GenerateEmbeddingsRequest::new(self.model.clone(), EmbeddingsInput::Multiple(texts));

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| EmbedError::Inference(format!("Ollama embedding request failed: {e}")))?;

        ensure_count("ollama", expected, response.embeddings)
    }
}

impl Embedder for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.request(chunk.to_vec()).await?);
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), 11434)
}
