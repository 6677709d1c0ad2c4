//! `SQLite`-backed vector collection rooted at a directory.

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::error::{Result, StoreError};
use crate::types::{Entry, Metadata, ScoredEntry};
use crate::vector;

const DB_FILE: &str = "index.sqlite";
const META_DIMENSIONS: &str = "dimensions";
const META_MODEL: &str = "embedding_model";

/// Append-only store of `(text, vector, metadata)` entries.
///
/// Single writer: concurrent indexing runs against the same directory are
/// not coordinated.
#[derive(Debug, Clone)]
pub struct IndexStore {
    pool: SqlitePool,
    dir: PathBuf,
}

impl IndexStore {
    /// Open (or create) the store directory and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the database
    /// cannot be opened, or migrations fail.
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let opts = SqliteConnectOptions::new()
            .filename(dir.join(DB_FILE))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        sqlx::migrate!().run(&pool).await?;

        tracing::debug!(path = %dir.display(), "index store opened");
        Ok(Self {
            pool,
            dir: dir.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Append every `(text, vector, metadata)` triple as a new entry.
    ///
    /// The three slices correlate by position. Ragged input is rejected
    /// before anything is written, and the whole batch commits in a single
    /// transaction. Returns the generated entry ids in input order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LengthMismatch`] for ragged input,
    /// [`StoreError::DimensionMismatch`] when vectors disagree with each other
    /// or with the collection, or a database error if the write fails.
    pub async fn ingest(
        &self,
        texts: &[String],
        vectors: &[Vec<f32>],
        metadatas: &[Metadata],
    ) -> Result<Vec<String>> {
        if texts.len() != vectors.len() || texts.len() != metadatas.len() {
            return Err(StoreError::LengthMismatch {
                texts: texts.len(),
                vectors: vectors.len(),
                metadatas: metadatas.len(),
            });
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let dim = vectors[0].len();
        if dim == 0 {
            return Err(StoreError::EmptyVector);
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(StoreError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }
        if let Some(index) = vectors.iter().position(|v| !vector::is_finite(v)) {
            return Err(StoreError::NonFinite { index });
        }

        let mut tx = self.pool.begin().await?;

        let recorded: Option<String> =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
                .bind(META_DIMENSIONS)
                .fetch_optional(&mut *tx)
                .await?;
        match recorded.and_then(|v| v.parse::<usize>().ok()) {
            Some(expected) if expected != dim => {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: dim,
                });
            }
            Some(_) => {}
            None => {
                sqlx::query("INSERT INTO store_meta (key, value) VALUES (?, ?)")
                    .bind(META_DIMENSIONS)
                    .bind(dim.to_string())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let mut ids = Vec::with_capacity(texts.len());
        for ((text, vector), metadata) in texts.iter().zip(vectors).zip(metadatas) {
            let id = uuid::Uuid::new_v4().to_string();
            let metadata_json = serde_json::to_string(metadata)?;

            sqlx::query("INSERT INTO entries (id, text, embedding, metadata) VALUES (?, ?, ?, ?)")
                .bind(&id)
                .bind(text.as_str())
                .bind(vector::encode(vector))
                .bind(metadata_json)
                .execute(&mut *tx)
                .await?;

            ids.push(id);
        }

        tx.commit().await?;
        tracing::debug!(count = ids.len(), dim, "entries ingested");
        Ok(ids)
    }

    /// Flush the write-ahead log into the main database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint fails.
    pub async fn persist(&self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        tracing::debug!(path = %self.dir.display(), "index store persisted");
        Ok(())
    }

    /// Record which embedding model populated the store.
    ///
    /// The first model wins; a different model later only logs a warning,
    /// since entries from both remain queryable when dimensions agree.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata query or insert fails.
    pub async fn record_model(&self, model: &str) -> Result<()> {
        match self.embedding_model().await? {
            Some(previous) if previous != model => {
                tracing::warn!(
                    previous = %previous,
                    current = model,
                    "store was populated with a different embedding model"
                );
            }
            Some(_) => {}
            None => {
                sqlx::query("INSERT INTO store_meta (key, value) VALUES (?, ?)")
                    .bind(META_MODEL)
                    .bind(model)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the metadata query fails.
    pub async fn embedding_model(&self) -> Result<Option<String>> {
        let model = sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
            .bind(META_MODEL)
            .fetch_optional(&self.pool)
            .await?;
        Ok(model)
    }

    /// Vector width fixed by the first ingest, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata query fails.
    pub async fn dimensions(&self) -> Result<Option<usize>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
                .bind(META_DIMENSIONS)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// # Errors
    ///
    /// Returns an error if the count query fails.
    pub async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count)?)
    }

    /// All entries in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row cannot be decoded.
    pub async fn entries(&self) -> Result<Vec<Entry>> {
        let rows: Vec<(String, String, Vec<u8>, String)> =
            sqlx::query_as("SELECT id, text, embedding, metadata FROM entries ORDER BY seq")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(id, text, blob, metadata)| {
                let vector = decode_vector(&id, &blob)?;
                let metadata: Metadata = serde_json::from_str(&metadata)?;
                Ok(Entry {
                    id,
                    text,
                    vector,
                    metadata,
                })
            })
            .collect()
    }

    /// Return the `k` entries most similar to `vector` by cosine similarity,
    /// most similar first. Equal scores keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DimensionMismatch`] if `vector` does not match the
    /// collection width, or a database error if the scan fails.
    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredEntry>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if vector.is_empty() {
            return Err(StoreError::EmptyVector);
        }
        if !vector::is_finite(vector) {
            return Err(StoreError::NonFinite { index: 0 });
        }
        if let Some(expected) = self.dimensions().await?
            && expected != vector.len()
        {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let rows: Vec<(String, String, Vec<u8>, String)> =
            sqlx::query_as("SELECT id, text, embedding, metadata FROM entries ORDER BY seq")
                .fetch_all(&self.pool)
                .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for (id, text, blob, metadata) in rows {
            let stored = decode_vector(&id, &blob)?;
            if !vector::is_finite(&stored) {
                tracing::warn!(id = %id, "skipping entry with non-finite embedding");
                continue;
            }
            let metadata: Metadata = serde_json::from_str(&metadata)?;
            scored.push(ScoredEntry {
                score: vector::cosine_similarity(vector, &stored),
                id,
                text,
                metadata,
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    /// Close the connection pool, waiting for in-flight work.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn decode_vector(id: &str, blob: &[u8]) -> Result<Vec<f32>> {
    vector::decode(blob).ok_or_else(|| StoreError::Corrupt {
        id: id.to_owned(),
        reason: format!("embedding blob of {} bytes", blob.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(filepath: &str, name: &str) -> Metadata {
        Metadata::from([
            ("filepath".into(), serde_json::json!(filepath)),
            ("name".into(), serde_json::json!(name)),
        ])
    }

    async fn open_temp() -> (tempfile::TempDir, IndexStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(&dir.path().join("db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn open_creates_directory_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db");
        let store = IndexStore::open(&path).await.unwrap();
        assert!(path.join(DB_FILE).exists());
        assert_eq!(store.path(), path);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn wal_journal_mode_enabled() {
        let (_dir, store) = open_temp().await;
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[tokio::test]
    async fn ingest_appends_entries_in_order() {
        let (_dir, store) = open_temp().await;
        let ids = store
            .ingest(
                &["def foo(): pass".into(), "class Bar: pass".into()],
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
                &[meta("a.py", "foo"), meta("a.py", "Bar")],
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, ids[0]);
        assert_eq!(entries[0].meta_str("name"), Some("foo"));
        assert_eq!(entries[1].meta_str("name"), Some("Bar"));
        assert_eq!(entries[1].vector, vec![0.0, 1.0]);
        assert_eq!(store.dimensions().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn ingest_rejects_ragged_input() {
        let (_dir, store) = open_temp().await;
        let err = store
            .ingest(
                &["a".into(), "b".into()],
                &[vec![1.0]],
                &[meta("a.py", "a"), meta("a.py", "b")],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::LengthMismatch {
                texts: 2,
                vectors: 1,
                metadatas: 2
            }
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ingest_rejects_missing_metadata() {
        let (_dir, store) = open_temp().await;
        let err = store
            .ingest(&["a".into()], &[vec![1.0]], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LengthMismatch { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ingest_rejects_mixed_dimensions_atomically() {
        let (_dir, store) = open_temp().await;
        let err = store
            .ingest(
                &["a".into(), "b".into()],
                &[vec![1.0, 0.0], vec![1.0]],
                &[meta("a.py", "a"), meta("a.py", "b")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ingest_rejects_non_finite_components_atomically() {
        let (_dir, store) = open_temp().await;
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = store
                .ingest(
                    &["a".into(), "b".into()],
                    &[vec![1.0, 0.0], vec![bad, 1.0]],
                    &[meta("a.py", "a"), meta("a.py", "b")],
                )
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::NonFinite { index: 1 }));
        }
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.dimensions().await.unwrap(), None);
    }

    #[tokio::test]
    async fn query_ranks_around_non_finite_rows() {
        let (_dir, store) = open_temp().await;
        store
            .ingest(&["seed".into()], &[vec![0.0, 1.0]], &[meta("s.py", "seed")])
            .await
            .unwrap();
        // Rows written before non-finite vectors were rejected.
        for i in 0..64_u8 {
            let vector = if i % 3 == 0 {
                vec![f32::NAN, 1.0]
            } else {
                vec![1.0, f32::from(i)]
            };
            sqlx::query("INSERT INTO entries (id, text, embedding, metadata) VALUES (?, ?, ?, ?)")
                .bind(format!("legacy-{i}"))
                .bind(format!("text {i}"))
                .bind(vector::encode(&vector))
                .bind("{}")
                .execute(&store.pool)
                .await
                .unwrap();
        }

        let hits = store.query(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|h| h.score.is_finite()));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(hits[0].id, "legacy-1");
    }

    #[tokio::test]
    async fn query_rejects_non_finite_vector() {
        let (_dir, store) = open_temp().await;
        let err = store.query(&[f32::NAN, 0.0], 3).await.unwrap_err();
        assert!(matches!(err, StoreError::NonFinite { .. }));
    }

    #[tokio::test]
    async fn ingest_rejects_dimension_change_across_batches() {
        let (_dir, store) = open_temp().await;
        store
            .ingest(&["a".into()], &[vec![1.0, 0.0]], &[meta("a.py", "a")])
            .await
            .unwrap();
        let err = store
            .ingest(&["b".into()], &[vec![1.0, 0.0, 0.0]], &[meta("b.py", "b")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_ingest_is_noop() {
        let (_dir, store) = open_temp().await;
        let ids = store.ingest(&[], &[], &[]).await.unwrap();
        assert!(ids.is_empty());
        assert_eq!(store.dimensions().await.unwrap(), None);
    }

    #[tokio::test]
    async fn reingest_is_additive() {
        let (_dir, store) = open_temp().await;
        for _ in 0..2 {
            store
                .ingest(&["def foo(): pass".into()], &[vec![1.0, 0.0]], &[meta("a.py", "foo")])
                .await
                .unwrap();
        }
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");

        let store = IndexStore::open(&path).await.unwrap();
        store
            .ingest(&["def foo(): pass".into()], &[vec![0.6, 0.8]], &[meta("a.py", "foo")])
            .await
            .unwrap();
        store.persist().await.unwrap();
        store.close().await;

        let reopened = IndexStore::open(&path).await.unwrap();
        let entries = reopened.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "def foo(): pass");
        assert_eq!(entries[0].meta_str("filepath"), Some("a.py"));
        assert_eq!(entries[0].vector, vec![0.6, 0.8]);
    }

    #[tokio::test]
    async fn query_ranks_by_similarity() {
        let (_dir, store) = open_temp().await;
        store
            .ingest(
                &["x".into(), "y".into(), "xy".into()],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
                &[meta("a.py", "x"), meta("a.py", "y"), meta("a.py", "xy")],
            )
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "x");
        assert_eq!(hits[1].text, "xy");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn query_ties_keep_insertion_order() {
        let (_dir, store) = open_temp().await;
        store
            .ingest(
                &["first".into(), "second".into()],
                &[vec![1.0, 0.0], vec![1.0, 0.0]],
                &[meta("a.py", "f"), meta("a.py", "s")],
            )
            .await
            .unwrap();
        let hits = store.query(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "first");
        assert_eq!(hits[1].text, "second");
    }

    #[tokio::test]
    async fn query_zero_k_or_empty_store() {
        let (_dir, store) = open_temp().await;
        assert!(store.query(&[1.0, 0.0], 3).await.unwrap().is_empty());
        store
            .ingest(&["a".into()], &[vec![1.0, 0.0]], &[meta("a.py", "a")])
            .await
            .unwrap();
        assert!(store.query(&[1.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_rejects_wrong_dimension() {
        let (_dir, store) = open_temp().await;
        store
            .ingest(&["a".into()], &[vec![1.0, 0.0]], &[meta("a.py", "a")])
            .await
            .unwrap();
        let err = store.query(&[1.0, 0.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn record_model_keeps_first() {
        let (_dir, store) = open_temp().await;
        assert_eq!(store.embedding_model().await.unwrap(), None);
        store.record_model("minilm").await.unwrap();
        store.record_model("other").await.unwrap();
        assert_eq!(
            store.embedding_model().await.unwrap().as_deref(),
            Some("minilm")
        );
    }

    #[tokio::test]
    async fn corrupt_blob_reported() {
        let (_dir, store) = open_temp().await;
        sqlx::query("INSERT INTO entries (id, text, embedding) VALUES ('bad', 't', x'000000')")
            .execute(&store.pool)
            .await
            .unwrap();
        let err = store.entries().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
