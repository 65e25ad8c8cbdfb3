//! Vector store abstraction for Pensum.
//!
//! The store holds two logical collections: one course-metadata record per
//! course (searched for fuzzy name resolution) and one record per content
//! chunk (searched for retrieval). Both are written once at ingestion time
//! and never mutated afterwards.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::course::Course;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A course-metadata record with its title embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Course metadata, including the ordered lesson list.
    pub course: Course,
    /// Embedding of the course title.
    pub embedding: Vec<f32>,
    /// When this course was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl CourseRecord {
    /// Create a new course record.
    pub fn new(course: Course, embedding: Vec<f32>) -> Self {
        Self {
            course,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A content-chunk record stored for retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique record ID.
    pub id: Uuid,
    /// Title of the owning course.
    pub course_title: String,
    /// Lesson this chunk belongs to, if any.
    pub lesson_number: Option<u32>,
    /// Position of this chunk within the course.
    pub chunk_index: u32,
    /// Chunk text.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl ChunkRecord {
    /// Create a new chunk record.
    pub fn new(
        course_title: String,
        lesson_number: Option<u32>,
        chunk_index: u32,
        content: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_title,
            lesson_number,
            chunk_index,
            content,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A chunk search hit with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: ChunkRecord,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// The nearest course-metadata match for a name query.
#[derive(Debug, Clone)]
pub struct CourseMatch {
    /// Canonical course title.
    pub title: String,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    pub title: String,
    pub instructor: Option<String>,
    pub link: Option<String>,
    pub lesson_count: u32,
    pub chunk_count: u32,
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a course-metadata record.
    async fn add_course(&self, record: &CourseRecord) -> Result<()>;

    /// Bulk-store content chunk records.
    async fn add_chunks(&self, records: &[ChunkRecord]) -> Result<usize>;

    /// Find the single nearest course-metadata record. Returns `None` only
    /// for an empty catalog: there is no similarity floor.
    async fn nearest_course(&self, query_embedding: &[f32]) -> Result<Option<CourseMatch>>;

    /// Nearest-neighbor search over content chunks, restricted to the
    /// optional exact-match filters. `limit` must be strictly positive;
    /// a zero limit is rejected with an error.
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        limit: usize,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Fetch a course record by its canonical title.
    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>>;

    /// List all indexed courses.
    async fn list_courses(&self) -> Result<Vec<CourseSummary>>;

    /// Check whether a course is already indexed.
    async fn is_course_indexed(&self, title: &str) -> Result<bool>;

    /// Delete a course and its chunks. Returns the number of chunks removed.
    async fn delete_course(&self, title: &str) -> Result<usize>;

    /// Total number of indexed courses.
    async fn course_count(&self) -> Result<usize>;

    /// Total number of indexed chunks.
    async fn chunk_count(&self) -> Result<usize>;
}

/// Message used when a backend rejects a non-positive search limit.
pub(crate) const LIMIT_REJECTED: &str = "search limit must be a positive integer";

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
