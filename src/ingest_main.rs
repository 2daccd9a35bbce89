use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use course_rag::core::config::{AppPaths, ConfigService};
use course_rag::core::logging;
use course_rag::courses::load_courses;
use course_rag::embedding::build_embedder;
use course_rag::rag::{ingest_records, IngestMode, IngestOptions, SqliteRagStore};

/// Builds the course vector store from a CSV export.
#[derive(Parser, Debug)]
#[command(name = "course-rag-ingest", version, about)]
struct Args {
    /// CSV file with one course per row (defaults to `ingest.input_file`)
    #[arg(long, env = "COURSE_RAG_INPUT")]
    input: Option<PathBuf>,

    /// Vector store directory (defaults to `store.path`)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Collection name (defaults to `store.collection`)
    #[arg(long)]
    collection: Option<String>,

    /// Keep existing units instead of rebuilding the collection
    #[arg(long)]
    append: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "ingest.log");

    let config = ConfigService::new(paths.clone());
    let settings = config
        .load_settings()
        .context("Failed to load configuration")?;

    let input = args
        .input
        .unwrap_or_else(|| paths.resolve(&settings.ingest.input_file));
    let store_dir = args
        .store
        .unwrap_or_else(|| settings.store.resolve_dir(&paths));
    let collection = args
        .collection
        .unwrap_or_else(|| settings.store.collection.clone());

    tracing::info!("1/4: Loading courses from {}", input.display());
    let records = load_courses(&input, &settings.ingest.columns)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    tracing::info!("Loaded {} course rows", records.len());

    let embedder = build_embedder(&settings.embedding, &paths)
        .context("Failed to initialize embedding model")?;
    let store = SqliteRagStore::create(&store_dir)
        .await
        .with_context(|| format!("Failed to open vector store at {}", store_dir.display()))?;

    let options = IngestOptions {
        collection,
        mode: if args.append {
            IngestMode::Append
        } else {
            IngestMode::Replace
        },
        batch_size: settings.embedding.batch_size,
    };
    let report = ingest_records(&records, embedder.as_ref(), &store, &options)
        .await
        .context("Ingestion failed")?;

    println!(
        "Indexed {} of {} courses into '{}' ({}) at {} in {:.1}s",
        report.stored,
        report.records,
        report.collection,
        report.embedding_model,
        store.db_path().display(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}
