//! In-memory vector store implementation.
//!
//! Useful for testing and small catalogs.

use super::{
    cosine_similarity, ChunkRecord, CourseMatch, CourseRecord, CourseSummary, ScoredChunk,
    VectorStore, LIMIT_REJECTED,
};
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    courses: RwLock<HashMap<String, CourseRecord>>,
    chunks: RwLock<Vec<ChunkRecord>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(HashMap::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_course(&self, record: &CourseRecord) -> Result<()> {
        let mut courses = self.courses.write().unwrap();
        courses.insert(record.course.title.clone(), record.clone());
        Ok(())
    }

    async fn add_chunks(&self, records: &[ChunkRecord]) -> Result<usize> {
        let mut chunks = self.chunks.write().unwrap();
        chunks.extend(records.iter().cloned());
        Ok(records.len())
    }

    async fn nearest_course(&self, query_embedding: &[f32]) -> Result<Option<CourseMatch>> {
        let courses = self.courses.read().unwrap();

        let best = courses
            .values()
            .map(|record| CourseMatch {
                title: record.course.title.clone(),
                score: cosine_similarity(query_embedding, &record.embedding),
            })
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));

        Ok(best)
    }

    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        limit: usize,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<Vec<ScoredChunk>> {
        if limit == 0 {
            return Err(PensumError::VectorStore(LIMIT_REJECTED.to_string()));
        }

        let chunks = self.chunks.read().unwrap();

        let mut results: Vec<ScoredChunk> = chunks
            .iter()
            .filter(|c| course_title.is_none_or(|t| c.course_title == t))
            .filter(|c| lesson_number.is_none_or(|n| c.lesson_number == Some(n)))
            .map(|c| ScoredChunk {
                chunk: c.clone(),
                score: cosine_similarity(query_embedding, &c.embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>> {
        let courses = self.courses.read().unwrap();
        Ok(courses.get(title).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<CourseSummary>> {
        let courses = self.courses.read().unwrap();
        let chunks = self.chunks.read().unwrap();

        let mut summaries: Vec<CourseSummary> = courses
            .values()
            .map(|record| CourseSummary {
                title: record.course.title.clone(),
                instructor: record.course.instructor.clone(),
                link: record.course.link.clone(),
                lesson_count: record.course.lessons.len() as u32,
                chunk_count: chunks
                    .iter()
                    .filter(|c| c.course_title == record.course.title)
                    .count() as u32,
                indexed_at: record.indexed_at,
            })
            .collect();

        summaries.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(summaries)
    }

    async fn is_course_indexed(&self, title: &str) -> Result<bool> {
        let courses = self.courses.read().unwrap();
        Ok(courses.contains_key(title))
    }

    async fn delete_course(&self, title: &str) -> Result<usize> {
        let mut courses = self.courses.write().unwrap();
        let mut chunks = self.chunks.write().unwrap();

        courses.remove(title);
        let initial_len = chunks.len();
        chunks.retain(|c| c.course_title != title);
        Ok(initial_len - chunks.len())
    }

    async fn course_count(&self) -> Result<usize> {
        let courses = self.courses.read().unwrap();
        Ok(courses.len())
    }

    async fn chunk_count(&self) -> Result<usize> {
        let chunks = self.chunks.read().unwrap();
        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Course, Lesson};

    fn course_record(title: &str, embedding: Vec<f32>) -> CourseRecord {
        CourseRecord::new(
            Course {
                title: title.to_string(),
                link: None,
                instructor: None,
                lessons: vec![Lesson {
                    number: 1,
                    title: "Lesson One".to_string(),
                    link: None,
                }],
            },
            embedding,
        )
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryVectorStore::new();

        store
            .add_course(&course_record("Course A", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();

        let chunks = vec![
            ChunkRecord::new(
                "Course A".to_string(),
                Some(1),
                0,
                "first chunk".to_string(),
                vec![1.0, 0.0, 0.0],
            ),
            ChunkRecord::new(
                "Course A".to_string(),
                Some(2),
                1,
                "second chunk".to_string(),
                vec![0.0, 1.0, 0.0],
            ),
        ];
        store.add_chunks(&chunks).await.unwrap();

        assert_eq!(store.course_count().await.unwrap(), 1);
        assert_eq!(store.chunk_count().await.unwrap(), 2);

        let results = store
            .search_chunks(&[1.0, 0.0, 0.0], 10, None, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].chunk.content, "first chunk");

        let deleted = store.delete_course("Course A").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.course_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_filters() {
        let store = MemoryVectorStore::new();
        let chunks = vec![
            ChunkRecord::new(
                "Course A".to_string(),
                Some(1),
                0,
                "a1".to_string(),
                vec![1.0, 0.0],
            ),
            ChunkRecord::new(
                "Course A".to_string(),
                Some(2),
                1,
                "a2".to_string(),
                vec![1.0, 0.0],
            ),
            ChunkRecord::new(
                "Course B".to_string(),
                Some(1),
                0,
                "b1".to_string(),
                vec![1.0, 0.0],
            ),
        ];
        store.add_chunks(&chunks).await.unwrap();

        let by_course = store
            .search_chunks(&[1.0, 0.0], 10, Some("Course A"), None)
            .await
            .unwrap();
        assert_eq!(by_course.len(), 2);
        assert!(by_course.iter().all(|r| r.chunk.course_title == "Course A"));

        let by_lesson = store
            .search_chunks(&[1.0, 0.0], 10, Some("Course A"), Some(2))
            .await
            .unwrap();
        assert_eq!(by_lesson.len(), 1);
        assert_eq!(by_lesson[0].chunk.content, "a2");
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let store = MemoryVectorStore::new();
        let err = store
            .search_chunks(&[1.0, 0.0], 0, None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[tokio::test]
    async fn test_nearest_course_empty_catalog() {
        let store = MemoryVectorStore::new();
        assert!(store.nearest_course(&[1.0, 0.0]).await.unwrap().is_none());
    }
}
