//! Ingest orchestration: select → chunk → batch → embed → upsert.

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Instant;

use coderag_llm::LlmProvider;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::assembler::{Chunk, ChunkAssembler, FileOutcome, SkippedFile, batched};
use crate::chunker::ChunkerConfig;
use crate::error::{IndexError, Result};
use crate::gateway::IndexGateway;
use crate::selector::FileSelector;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub collection: String,
    pub selector: FileSelector,
    pub chunker: ChunkerConfig,
    pub batch_size: NonZeroUsize,
    /// Drop the collection before writing.
    pub reset: bool,
}

/// Summary of an ingest run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestReport {
    pub files_scanned: usize,
    pub files_chunked: usize,
    pub chunks_written: usize,
    pub batches: usize,
    pub skipped: Vec<SkippedFile>,
    pub duration_ms: u64,
}

enum Event {
    Skipped(SkippedFile),
    Batch(Vec<Chunk>),
}

#[derive(Default)]
struct WalkStats {
    files_scanned: usize,
    files_chunked: usize,
}

pub struct CodeIndexer<P> {
    gateway: IndexGateway<P>,
    options: IngestOptions,
}

impl<P: LlmProvider + 'static> CodeIndexer<P> {
    #[must_use]
    pub fn new(gateway: IndexGateway<P>, options: IngestOptions) -> Self {
        Self { gateway, options }
    }

    /// Index every selected file under `root` into the configured collection.
    ///
    /// Files are read on a blocking worker and handed over one batch at a
    /// time; at most one batch waits while another is being written.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory, the chunker settings are
    /// invalid, or any batch fails to embed or write. Batches written before the
    /// failure stay committed.
    pub async fn ingest(&self, root: &Path) -> Result<IngestReport> {
        let start = Instant::now();
        self.options.chunker.validate()?;
        let root = tokio::fs::canonicalize(root).await.map_err(|e| {
            IndexError::InvalidArgument(format!("source directory {}: {e}", root.display()))
        })?;
        if !root.is_dir() {
            return Err(IndexError::InvalidArgument(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let handle = self
            .gateway
            .open_or_create(&self.options.collection, self.options.reset)
            .await?;
        tracing::info!(
            source = %root.display(),
            collection = handle.name(),
            db_dir = %handle.db_dir().display(),
            "ingest started"
        );

        let assembler = ChunkAssembler::new(
            root,
            self.options.collection.clone(),
            self.options.selector.clone(),
            self.options.chunker,
        );
        let batch_size = self.options.batch_size;
        let (tx, mut rx) = mpsc::channel::<Event>(1);
        let producer = tokio::task::spawn_blocking(move || walk(&assembler, batch_size, &tx));

        let mut report = IngestReport::default();
        while let Some(event) = rx.recv().await {
            match event {
                Event::Skipped(skipped) => report.skipped.push(skipped),
                Event::Batch(batch) => {
                    let written = handle.upsert(&batch).await?;
                    report.batches += 1;
                    report.chunks_written += written;
                    tracing::info!(
                        batch = report.batches,
                        written,
                        total = report.chunks_written,
                        "batch upserted"
                    );
                }
            }
        }

        let stats = producer.await?;
        report.files_scanned = stats.files_scanned;
        report.files_chunked = stats.files_chunked;
        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            files = report.files_scanned,
            chunks = report.chunks_written,
            skipped = report.skipped.len(),
            duration_ms = report.duration_ms,
            "ingest finished"
        );
        Ok(report)
    }
}

/// Runs on a blocking thread. Stops early once the receiver is gone.
fn walk(assembler: &ChunkAssembler, batch_size: NonZeroUsize, tx: &mpsc::Sender<Event>) -> WalkStats {
    let mut stats = WalkStats::default();
    let chunks = assembler.assemble().flat_map(|outcome| {
        stats.files_scanned += 1;
        match outcome {
            FileOutcome::Chunked { chunks, .. } => {
                if !chunks.is_empty() {
                    stats.files_chunked += 1;
                }
                chunks
            }
            FileOutcome::Skipped(skipped) => {
                let _ = tx.blocking_send(Event::Skipped(skipped));
                Vec::new()
            }
        }
    });
    for batch in batched(chunks, batch_size) {
        if tx.blocking_send(Event::Batch(batch)).is_err() {
            break;
        }
    }
    stats
}
