//! SQLite-backed RAG store implementation.
//!
//! In-process vector store using SQLite for metadata and
//! brute-force cosine similarity for search.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::store::{ChunkSearchResult, RagStore, StoredChunk};
use crate::core::errors::ApiError;

const DB_FILE_NAME: &str = "vectors.db";

pub struct SqliteRagStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteRagStore {
    /// Opens the store in `dir`, creating the directory and database if needed.
    pub async fn create(dir: &Path) -> Result<Self, ApiError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            ApiError::Internal(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        Self::connect(dir.join(DB_FILE_NAME), true).await
    }

    /// Opens a store previously written by ingestion; a missing database is an error.
    pub async fn open_existing(dir: &Path) -> Result<Self, ApiError> {
        let db_path = dir.join(DB_FILE_NAME);
        if !db_path.is_file() {
            return Err(ApiError::NotFound(format!(
                "Vector store not found at {}",
                db_path.display()
            )));
        }
        Self::connect(db_path, false).await
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn connect(db_path: PathBuf, create_if_missing: bool) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                ApiError::Internal(format!(
                    "Failed to open vector store {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_collections (
                name TEXT PRIMARY KEY,
                embedding_model TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT NOT NULL,
                collection TEXT NOT NULL REFERENCES rag_collections(name) ON DELETE CASCADE,
                content TEXT NOT NULL,
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (collection, chunk_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    async fn insert_rows(
        conn: &mut SqliteConnection,
        collection: &str,
        items: &[(StoredChunk, Vec<f32>)],
    ) -> Result<usize, ApiError> {
        let mut written = 0;
        for (chunk, embedding) in items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = chunk
                .metadata
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "{}".to_string());

            let result = sqlx::query(
                "INSERT OR REPLACE INTO rag_chunks (chunk_id, collection, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&chunk.chunk_id)
            .bind(collection)
            .bind(&chunk.content)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *conn)
            .await
            .map_err(ApiError::internal)?;
            written += result.rows_affected() as usize;
        }
        Ok(written)
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str).ok();

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            collection: row.get("collection"),
            metadata,
        }
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn create_collection(&self, name: &str, embedding_model: &str) -> Result<(), ApiError> {
        match self.collection_model(name).await? {
            Some(existing) if existing == embedding_model => Ok(()),
            Some(existing) => Err(ApiError::BadRequest(format!(
                "Collection '{}' was built with embedding model '{}', not '{}'",
                name, existing, embedding_model
            ))),
            None => {
                sqlx::query("INSERT INTO rag_collections (name, embedding_model) VALUES (?1, ?2)")
                    .bind(name)
                    .bind(embedding_model)
                    .execute(&self.pool)
                    .await
                    .map_err(ApiError::internal)?;
                Ok(())
            }
        }
    }

    async fn replace_collection(
        &self,
        name: &str,
        embedding_model: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM rag_chunks WHERE collection = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT INTO rag_collections (name, embedding_model, updated_at)
             VALUES (?1, ?2, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(name) DO UPDATE SET
                embedding_model = excluded.embedding_model,
                updated_at = excluded.updated_at",
        )
        .bind(name)
        .bind(embedding_model)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        let written = Self::insert_rows(&mut *tx, name, &items).await?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(written)
    }

    async fn collection_model(&self, name: &str) -> Result<Option<String>, ApiError> {
        sqlx::query_scalar::<_, String>("SELECT embedding_model FROM rag_collections WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)
    }

    async fn insert_batch(
        &self,
        collection: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, ApiError> {
        if items.is_empty() {
            return Ok(0);
        }
        if self.collection_model(collection).await?.is_none() {
            return Err(ApiError::NotFound(format!(
                "Collection '{}' does not exist",
                collection
            )));
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        let written = Self::insert_rows(&mut *tx, collection, &items).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(written)
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, ApiError> {
        let rows = sqlx::query(
            "SELECT chunk_id, collection, content, metadata, embedding
             FROM rag_chunks
             WHERE collection = ?1",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored_emb);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chunk(id: &str, content: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            collection: String::new(),
            metadata: Some(serde_json::json!({ "course_code": id })),
        }
    }

    #[tokio::test]
    async fn insert_and_search_orders_by_similarity() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::create(tmp.path()).await.unwrap();
        store.create_collection("courses", "e5").await.unwrap();

        store
            .insert_batch(
                "courses",
                vec![
                    (make_chunk("c1", "algebra"), vec![1.0, 0.0, 0.0]),
                    (make_chunk("c2", "databases"), vec![0.0, 1.0, 0.0]),
                    (make_chunk("c3", "linear algebra"), vec![0.9, 0.1, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.count("courses").await.unwrap(), 3);

        let results = store.search("courses", &[1.0, 0.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);
        assert!(results[0].score > 0.99);
        assert_eq!(results[0].chunk.collection, "courses");
        assert_eq!(
            results[0].chunk.metadata,
            Some(serde_json::json!({ "course_code": "c1" }))
        );
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::create(tmp.path()).await.unwrap();
        store.create_collection("a", "m").await.unwrap();
        store.create_collection("b", "m").await.unwrap();

        store
            .insert_batch("a", vec![(make_chunk("c1", "x"), vec![1.0])])
            .await
            .unwrap();

        assert_eq!(store.count("a").await.unwrap(), 1);
        assert_eq!(store.count("b").await.unwrap(), 0);
        assert!(store.search("b", &[1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_collection_rejects_model_change() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::create(tmp.path()).await.unwrap();

        store.create_collection("courses", "e5-large").await.unwrap();
        store.create_collection("courses", "e5-large").await.unwrap();
        let err = store
            .create_collection("courses", "minilm")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn replace_collection_swaps_chunks_and_rebinds_model() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::create(tmp.path()).await.unwrap();
        store.create_collection("courses", "old").await.unwrap();
        store
            .insert_batch(
                "courses",
                vec![
                    (make_chunk("c1", "x"), vec![1.0]),
                    (make_chunk("c2", "y"), vec![1.0]),
                ],
            )
            .await
            .unwrap();

        let written = store
            .replace_collection("courses", "new", vec![(make_chunk("c3", "z"), vec![1.0])])
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(store.count("courses").await.unwrap(), 1);
        let results = store.search("courses", &[1.0], 5).await.unwrap();
        assert_eq!(results[0].chunk.chunk_id, "c3");
        assert_eq!(
            store.collection_model("courses").await.unwrap().as_deref(),
            Some("new")
        );
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::create(tmp.path()).await.unwrap();
        store
            .replace_collection("courses", "old", vec![(make_chunk("c1", "x"), vec![1.0])])
            .await
            .unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_bad_chunk BEFORE INSERT ON rag_chunks
             WHEN NEW.chunk_id = 'bad'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store
            .replace_collection(
                "courses",
                "new",
                vec![
                    (make_chunk("c2", "y"), vec![1.0]),
                    (make_chunk("bad", "z"), vec![1.0]),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(store.count("courses").await.unwrap(), 1);
        let results = store.search("courses", &[1.0], 5).await.unwrap();
        assert_eq!(results[0].chunk.chunk_id, "c1");
        assert_eq!(
            store.collection_model("courses").await.unwrap().as_deref(),
            Some("old")
        );
    }

    #[tokio::test]
    async fn replace_collection_creates_missing_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::create(tmp.path()).await.unwrap();

        let written = store
            .replace_collection("courses", "m", Vec::new())
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert_eq!(
            store.collection_model("courses").await.unwrap().as_deref(),
            Some("m")
        );
    }

    #[tokio::test]
    async fn insert_replaces_existing_chunk_id() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::create(tmp.path()).await.unwrap();
        store.create_collection("courses", "m").await.unwrap();

        for content in ["first", "second"] {
            store
                .insert_batch("courses", vec![(make_chunk("c1", content), vec![1.0])])
                .await
                .unwrap();
        }

        assert_eq!(store.count("courses").await.unwrap(), 1);
        let results = store.search("courses", &[1.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.content, "second");
    }

    #[tokio::test]
    async fn insert_into_unknown_collection_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteRagStore::create(tmp.path()).await.unwrap();

        let err = store
            .insert_batch("missing", vec![(make_chunk("c1", "x"), vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn open_existing_requires_database_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            SqliteRagStore::open_existing(tmp.path()).await,
            Err(ApiError::NotFound(_))
        ));

        let created = SqliteRagStore::create(tmp.path()).await.unwrap();
        created.create_collection("courses", "m").await.unwrap();
        drop(created);

        let reopened = SqliteRagStore::open_existing(tmp.path()).await.unwrap();
        assert_eq!(
            reopened.collection_model("courses").await.unwrap().as_deref(),
            Some("m")
        );
    }

    #[test]
    fn cosine_handles_mismatched_and_zero_vectors() {
        assert_eq!(SqliteRagStore::cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(SqliteRagStore::cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }
}
