//! BERT sentence-transformer embeddings on Candle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use candle_core::Device;
use candle_core::{DType, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::embedder::{Embedder, ensure_count};
use crate::error::{EmbedError, Result};

/// BERT position-embedding limit.
const MAX_TOKENS: usize = 512;

#[derive(Clone)]
pub struct CandleEmbedder {
    model: Arc<BertModel>,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    model_id: String,
    batch_size: usize,
}

impl std::fmt::Debug for CandleEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleEmbedder")
            .field("model_id", &self.model_id)
            .field("device", &device_name(&self.device))
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

fn device_name(d: &Device) -> &'static str {
    match d {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}

/// Pick the best compiled-in accelerator, falling back to CPU.
#[must_use]
pub fn detect_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(d) = Device::new_metal(0) {
            return d;
        }
    }
    #[cfg(feature = "cuda")]
    {
        if let Ok(d) = Device::new_cuda(0) {
            return d;
        }
    }
    Device::Cpu
}

/// `model` is either a local directory holding `config.json`,
/// `tokenizer.json` and `model.safetensors`, or a Hugging Face repo id.
fn resolve_files(model: &str) -> Result<ModelFiles> {
    let local = Path::new(model);
    if local.is_dir() {
        let files = ModelFiles {
            config: local.join("config.json"),
            tokenizer: local.join("tokenizer.json"),
            weights: local.join("model.safetensors"),
        };
        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.is_file() {
                return Err(EmbedError::ModelLoad(format!(
                    "missing {} in local model directory",
                    path.display()
                )));
            }
        }
        return Ok(files);
    }

    let api = hf_hub::api::sync::Api::new().map_err(|e| {
        EmbedError::ModelLoad(format!("failed to create HuggingFace API client: {e}"))
    })?;
    let repo = api.model(model.to_owned());
    let fetch = |name: &str| {
        repo.get(name).map_err(|e| {
            EmbedError::ModelLoad(format!("failed to download {name} from {model}: {e}"))
        })
    };

    Ok(ModelFiles {
        config: fetch("config.json")?,
        tokenizer: fetch("tokenizer.json")?,
        weights: fetch("model.safetensors")?,
    })
}

impl CandleEmbedder {
    /// Load a BERT embedding model. Blocking: downloads and memory-maps weights.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::ModelLoad`] if the files cannot be fetched or parsed.
    pub fn load(model: &str, batch_size: usize, device: &Device) -> Result<Self> {
        let files = resolve_files(model)?;

        let config_str = std::fs::read_to_string(&files.config)
            .map_err(|e| EmbedError::ModelLoad(format!("failed to read BERT config: {e}")))?;
        let config: BertConfig = serde_json::from_str(&config_str)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| EmbedError::ModelLoad(format!("failed to load tokenizer: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..TruncationParams::default()
            }))
            .map_err(|e| EmbedError::ModelLoad(format!("failed to configure truncation: {e}")))?;

        // SAFETY: the safetensors file is not modified while the VarBuilder is alive
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, device)
                .map_err(|e| EmbedError::ModelLoad(format!("failed to map weights: {e}")))?
        };
        let model_weights = BertModel::load(vb, &config)
            .map_err(|e| EmbedError::ModelLoad(format!("failed to build BERT model: {e}")))?;

        tracing::info!(model, device = device_name(device), "embedding model loaded");

        Ok(Self {
            model: Arc::new(model_weights),
            tokenizer: Arc::new(tokenizer),
            device: device.clone(),
            model_id: model.to_owned(),
            batch_size: batch_size.max(1),
        })
    }

    /// Embed every text, `batch_size` texts per forward pass.
    ///
    /// # Errors
    ///
    /// Returns an error if tokenization or the forward pass fails.
    pub fn embed_sync(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk)?);
        }
        Ok(out)
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| EmbedError::Inference(format!("tokenizer encode failed: {e}")))?;

        let batch = encodings.len();
        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());

        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut mask = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            ids.extend_from_slice(encoding.get_ids());
            mask.extend_from_slice(encoding.get_attention_mask());
        }

        let input_ids = Tensor::from_vec(ids, (batch, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (batch, seq_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over real tokens only
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?;

        // L2 normalization
        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norm)?;

        ensure_count("candle", texts.len(), normalized.to_vec2::<f32>()?)
    }
}

impl Embedder for CandleEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embedder = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || embedder.embed_sync(&texts))
            .await
            .map_err(|e| EmbedError::Inference(format!("candle embedding task failed: {e}")))?
    }

    fn name(&self) -> &str {
        &self.model_id
    }
}
