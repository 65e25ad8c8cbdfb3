//! Semantic retrieval over the course catalog.
//!
//! [`RetrievalStore`] pairs an embedder with a vector store and exposes the
//! two operations the assistant's tools are built on: fuzzy course-name
//! resolution and filtered content search.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{ScoredChunk, VectorStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// A failed content search. Mutually exclusive with a result list: a failure
/// never carries partial hits, and an empty hit list is not a failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchFailure {
    /// The configured result cap is not a strictly positive integer.
    #[error("search result cap is {configured} but must be a positive integer")]
    Misconfigured { configured: usize },

    /// The embedding service or the index failed.
    #[error("{0}")]
    Backend(String),
}

/// Retrieval operations over the course catalog.
pub struct RetrievalStore {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
}

impl RetrievalStore {
    /// Create a retrieval store with the given result cap.
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, max_results: usize) -> Self {
        Self {
            store,
            embedder,
            max_results,
        }
    }

    /// The configured per-search result cap.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Access to the underlying vector store.
    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Resolve a partial or fuzzy course name to its canonical stored title.
    ///
    /// Returns `Ok(None)` only when the catalog is empty. There is no
    /// minimum-similarity floor: a non-empty catalog always resolves to its
    /// nearest title, however distant the match.
    #[instrument(skip(self), fields(partial = %partial))]
    pub async fn resolve_course_name(&self, partial: &str) -> Result<Option<String>> {
        let embedding = self.embedder.embed(partial).await?;
        let best = self.store.nearest_course(&embedding).await?;

        if let Some(hit) = &best {
            debug!("Resolved '{}' to '{}' (score {:.3})", partial, hit.title, hit.score);
        }

        Ok(best.map(|hit| hit.title))
    }

    /// Search content chunks, restricted to the optional exact-match filters.
    ///
    /// Returns up to `max_results` hits in ranked order. A zero result cap is
    /// caught here and reported as [`SearchFailure::Misconfigured`] rather
    /// than being passed to the index; should the index reject the limit
    /// itself, its error is re-classified instead of leaked verbatim.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search_content(
        &self,
        query: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
    ) -> std::result::Result<Vec<ScoredChunk>, SearchFailure> {
        if self.max_results == 0 {
            return Err(SearchFailure::Misconfigured { configured: 0 });
        }

        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| SearchFailure::Backend(e.to_string()))?;

        self.store
            .search_chunks(&embedding, self.max_results, course_title, lesson_number)
            .await
            .map_err(|e| classify_backend_error(e.to_string()))
    }

    /// Link for a lesson of an indexed course, if one is stored.
    pub async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let record = self.store.get_course(course_title).await?;
        Ok(record.and_then(|r| r.course.lesson_link(lesson_number).map(str::to_string)))
    }
}

/// Re-classify a raw backend error. A rejection of a non-positive result
/// limit is a configuration error, not a retrieval failure.
fn classify_backend_error(message: String) -> SearchFailure {
    let lower = message.to_lowercase();
    if lower.contains("positive") && (lower.contains("limit") || lower.contains("results")) {
        SearchFailure::Misconfigured { configured: 0 }
    } else {
        SearchFailure::Backend(message)
    }
}
