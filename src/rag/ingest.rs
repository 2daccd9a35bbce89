//! Course ingestion: rows in, one embedded unit per row out.

use std::time::{Duration, Instant};

use super::store::{RagStore, StoredChunk};
use crate::core::errors::ApiError;
use crate::courses::{to_documents, CourseRecord};
use crate::embedding::EmbeddingProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// Drop the collection's previous contents first.
    #[default]
    Replace,
    /// Keep existing units; rows already stored are overwritten in place.
    Append,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub collection: String,
    pub mode: IngestMode,
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub records: usize,
    /// Units the store reports as written.
    pub stored: usize,
    pub collection: String,
    pub embedding_model: String,
    pub elapsed: Duration,
}

/// Embeds every record and writes it to the store.
///
/// All embeddings are computed before the store is touched, and a replace
/// swaps the collection in a single transaction, so a failed run leaves the
/// previous collection intact.
pub async fn ingest_records(
    records: &[CourseRecord],
    embedder: &dyn EmbeddingProvider,
    store: &dyn RagStore,
    options: &IngestOptions,
) -> Result<IngestReport, ApiError> {
    let started = Instant::now();
    let documents = to_documents(records);
    tracing::info!("2/4: Created {} documents (one per course)", documents.len());

    tracing::info!(
        "3/4: Embedding documents with {}",
        embedder.model_name()
    );
    let texts: Vec<String> = documents.iter().map(|doc| doc.text.clone()).collect();
    let mut embeddings = Vec::with_capacity(texts.len());
    for (batch_idx, batch) in texts.chunks(options.batch_size.max(1)).enumerate() {
        let vectors = embedder.embed_documents(batch).await?;
        if vectors.len() != batch.len() {
            return Err(ApiError::Internal(format!(
                "Embedding provider returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }
        embeddings.extend(vectors);
        tracing::debug!(
            "Embedded batch {} ({}/{})",
            batch_idx + 1,
            embeddings.len(),
            texts.len()
        );
    }

    let items: Vec<(StoredChunk, Vec<f32>)> = documents
        .into_iter()
        .zip(embeddings)
        .map(|(doc, embedding)| {
            (
                StoredChunk {
                    chunk_id: doc.id,
                    content: doc.text,
                    collection: options.collection.clone(),
                    metadata: Some(doc.metadata),
                },
                embedding,
            )
        })
        .collect();

    let stored = match options.mode {
        IngestMode::Replace => {
            store
                .replace_collection(&options.collection, embedder.model_name(), items)
                .await?
        }
        IngestMode::Append => {
            store
                .create_collection(&options.collection, embedder.model_name())
                .await?;
            store.insert_batch(&options.collection, items).await?
        }
    };

    let report = IngestReport {
        records: records.len(),
        stored,
        collection: options.collection.clone(),
        embedding_model: embedder.model_name().to_string(),
        elapsed: started.elapsed(),
    };
    tracing::info!(
        "4/4: Indexed {} units into collection '{}' in {:.1}s",
        report.stored,
        report.collection,
        report.elapsed.as_secs_f64()
    );
    Ok(report)
}
