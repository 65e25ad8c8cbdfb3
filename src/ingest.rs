//! Course document ingestion.
//!
//! Course documents arrive pre-chunked (see [`crate::course::CourseDocument`]);
//! ingestion deserializes them, embeds the course title and every chunk, and
//! writes both collections to the vector store. Already-indexed courses are
//! skipped unless forced.

use crate::course::CourseDocument;
use crate::embedding::Embedder;
use crate::error::{PensumError, Result};
use crate::vector_store::{ChunkRecord, CourseRecord, VectorStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Ingests course documents into the vector store.
pub struct Ingestor {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

/// Result of ingesting a single course document.
#[derive(Debug)]
pub struct IngestResult {
    pub course_title: String,
    pub chunks_indexed: usize,
    pub skipped: bool,
}

/// Result of ingesting a folder of course documents.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub courses_added: usize,
    pub chunks_added: usize,
    pub skipped: usize,
}

impl Ingestor {
    /// Create a new ingestor.
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Ingest a single course document file.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_file(&self, path: &Path, force: bool) -> Result<IngestResult> {
        if !path.is_file() {
            return Err(PensumError::InvalidInput(format!(
                "{}: not a readable file",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let document: CourseDocument = serde_json::from_str(&content).map_err(|e| {
            PensumError::Ingest(format!("{}: not a course document: {}", path.display(), e))
        })?;

        let title = document.course.title.clone();
        if title.is_empty() {
            return Err(PensumError::Ingest(format!(
                "{}: course title is empty",
                path.display()
            )));
        }

        if !force && self.store.is_course_indexed(&title).await? {
            info!("Course '{}' is already indexed, skipping", title);
            return Ok(IngestResult {
                course_title: title,
                chunks_indexed: 0,
                skipped: true,
            });
        }

        // Re-ingesting replaces the previous records wholesale.
        self.store.delete_course(&title).await?;

        let title_embedding = self.embedder.embed(&title).await?;
        self.store
            .add_course(&CourseRecord::new(document.course.clone(), title_embedding))
            .await?;

        let chunks = document.content_chunks();
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                ChunkRecord::new(
                    chunk.course_title,
                    chunk.lesson_number,
                    chunk.chunk_index,
                    chunk.content,
                    embedding,
                )
            })
            .collect();

        let indexed = self.store.add_chunks(&records).await?;
        info!("Indexed course '{}' with {} chunks", title, indexed);

        Ok(IngestResult {
            course_title: title,
            chunks_indexed: indexed,
            skipped: false,
        })
    }

    /// Ingest every `*.json` course document in a folder.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_dir(&self, path: &Path, force: bool) -> Result<IngestSummary> {
        let mut entries: Vec<_> = std::fs::read_dir(path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();

        let mut summary = IngestSummary::default();
        for entry in entries {
            match self.ingest_file(&entry, force).await {
                Ok(result) if result.skipped => summary.skipped += 1,
                Ok(result) => {
                    summary.courses_added += 1;
                    summary.chunks_added += result.chunks_indexed;
                }
                Err(e) => {
                    warn!("Skipping {}: {}", entry.display(), e);
                }
            }
        }

        Ok(summary)
    }
}
