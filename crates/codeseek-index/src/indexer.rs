//! Indexing orchestrator: walk → extract → embed → store.

use std::path::{Path, PathBuf};

use codeseek_embed::{AnyEmbedder, Embedder, EmbeddingConfig};
use codeseek_store::{IndexStore, Metadata};

use crate::error::Result;
use crate::unit::CodeUnit;
use crate::walker::{WalkConfig, discover_files, extract_files};

/// Stages of a single indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    Empty,
    Walking,
    Extracting,
    Embedding,
    Persisting,
    Done,
    Failed,
}

impl IndexPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Walking => "walking",
            Self::Extracting => "extracting",
            Self::Embedding => "embedding",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

struct PhaseTracker {
    current: IndexPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            current: IndexPhase::Empty,
        }
    }

    fn advance(&mut self, next: IndexPhase) {
        tracing::debug!(from = self.current.as_str(), to = next.as_str(), "index phase");
        self.current = next;
    }
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct IndexRunConfig {
    pub root: PathBuf,
    pub store_path: PathBuf,
    pub walk: WalkConfig,
    pub embedding: EmbeddingConfig,
}

/// Summary of a run that wrote to the store.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub units_indexed: usize,
    pub errors: Vec<String>,
    pub model: String,
    pub store_path: PathBuf,
    pub duration_ms: u64,
}

/// How a run ended.
#[derive(Debug)]
pub enum IndexOutcome {
    /// No units were found. No model was loaded and no store was opened.
    Empty {
        files_scanned: usize,
        files_skipped: usize,
        errors: Vec<String>,
    },
    Indexed(IndexReport),
}

/// Embeds units and appends them to a store.
pub struct CodeIndexer<'a, E: Embedder> {
    store: &'a IndexStore,
    embedder: &'a E,
}

impl<'a, E: Embedder> CodeIndexer<'a, E> {
    #[must_use]
    pub fn new(store: &'a IndexStore, embedder: &'a E) -> Self {
        Self { store, embedder }
    }

    /// Embed all unit texts in one batch and ingest them, positionally
    /// aligned with their metadata. Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails or the store rejects the write.
    pub async fn index_units(&self, units: &[CodeUnit]) -> Result<usize> {
        if units.is_empty() {
            return Ok(0);
        }
        let vectors = embed_units(self.embedder, units).await?;
        self.store_units(units, &vectors).await
    }

    /// Ingest already-embedded units and flush the store. `vectors[i]`
    /// belongs to `units[i]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects or fails the write.
    pub async fn store_units(&self, units: &[CodeUnit], vectors: &[Vec<f32>]) -> Result<usize> {
        let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
        let metadatas: Vec<Metadata> = units.iter().map(unit_metadata).collect();

        let ids = self.store.ingest(&texts, vectors, &metadatas).await?;
        self.store.record_model(self.embedder.name()).await?;
        self.store.persist().await?;
        Ok(ids.len())
    }
}

/// One vector per unit, in unit order.
///
/// # Errors
///
/// Returns an error if the embedder fails.
pub async fn embed_units<E: Embedder>(embedder: &E, units: &[CodeUnit]) -> Result<Vec<Vec<f32>>> {
    let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
    Ok(embedder.embed_batch(&texts).await?)
}

fn unit_metadata(unit: &CodeUnit) -> Metadata {
    Metadata::from([
        ("filepath".into(), serde_json::json!(unit.filepath)),
        ("name".into(), serde_json::json!(unit.name)),
        ("kind".into(), serde_json::json!(unit.kind.as_str())),
        ("line_start".into(), serde_json::json!(unit.line_range.0)),
        ("line_end".into(), serde_json::json!(unit.line_range.1)),
    ])
}

/// Run a full indexing pass over `config.root`.
///
/// Per-file failures are absorbed into the report. If no units are found the
/// run stops before loading the embedding model or touching the store.
///
/// # Errors
///
/// Returns an error if the root is missing, the embedding model cannot be
/// loaded or run, or the store cannot be written.
pub async fn run_index(config: &IndexRunConfig) -> Result<IndexOutcome> {
    let mut phase = PhaseTracker::new();
    match run_phases(config, &mut phase).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            phase.advance(IndexPhase::Failed);
            tracing::error!("indexing failed: {e}");
            Err(e)
        }
    }
}

async fn run_phases(config: &IndexRunConfig, phase: &mut PhaseTracker) -> Result<IndexOutcome> {
    let start = std::time::Instant::now();

    phase.advance(IndexPhase::Walking);
    let files = discover_files(&config.root, &config.walk)?;
    tracing::info!(total = files.len(), root = %config.root.display(), "indexing started");

    phase.advance(IndexPhase::Extracting);
    let walk = extract_files(&files).await;

    if walk.units.is_empty() {
        phase.advance(IndexPhase::Done);
        return Ok(IndexOutcome::Empty {
            files_scanned: walk.files_scanned,
            files_skipped: walk.files_skipped,
            errors: walk.errors,
        });
    }

    phase.advance(IndexPhase::Embedding);
    let embedder = AnyEmbedder::load(&config.embedding).await?;
    let indexed = embed_and_store(&walk.units, &config.store_path, &embedder, phase).await?;

    phase.advance(IndexPhase::Done);
    Ok(IndexOutcome::Indexed(IndexReport {
        files_scanned: walk.files_scanned,
        files_skipped: walk.files_skipped,
        units_indexed: indexed,
        errors: walk.errors,
        model: embedder.name().to_owned(),
        store_path: config.store_path.clone(),
        duration_ms: start.elapsed().as_millis().try_into().unwrap_or(u64::MAX),
    }))
}

/// Embedding runs before the store is opened, so a failed embedding leaves
/// the store directory untouched.
async fn embed_and_store<E: Embedder>(
    units: &[CodeUnit],
    store_path: &Path,
    embedder: &E,
    phase: &mut PhaseTracker,
) -> Result<usize> {
    tracing::info!(units = units.len(), model = embedder.name(), "creating embeddings");
    let vectors = embed_units(embedder, units).await?;

    phase.advance(IndexPhase::Persisting);
    let store = IndexStore::open(store_path).await?;
    let written = CodeIndexer::new(&store, embedder)
        .store_units(units, &vectors)
        .await;
    store.close().await;
    written
}

impl IndexRunConfig {
    #[must_use]
    pub fn new(root: &Path, store_path: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            store_path: store_path.to_path_buf(),
            walk: WalkConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}
