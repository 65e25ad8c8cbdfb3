//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large catalogs, consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{
    cosine_similarity, ChunkRecord, CourseMatch, CourseRecord, CourseSummary, ScoredChunk,
    VectorStore, LIMIT_REJECTED,
};
use crate::course::Course;
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    title TEXT PRIMARY KEY,
    link TEXT,
    instructor TEXT,
    lessons_json TEXT NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    course_title TEXT NOT NULL,
    lesson_number INTEGER,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_course_title ON chunks(course_title);
CREATE INDEX IF NOT EXISTS idx_chunks_lesson ON chunks(course_title, lesson_number);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkRecord> {
        let id_str: String = row.get(0)?;
        let lesson_number: Option<i64> = row.get(2)?;
        let embedding_bytes: Vec<u8> = row.get(5)?;
        let indexed_at_str: String = row.get(6)?;

        Ok(ChunkRecord {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            course_title: row.get(1)?,
            lesson_number: lesson_number.map(|n| n as u32),
            chunk_index: row.get::<_, i64>(3)? as u32,
            content: row.get(4)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: Self::parse_timestamp(&indexed_at_str),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, record), fields(title = %record.course.title))]
    async fn add_course(&self, record: &CourseRecord) -> Result<()> {
        let conn = self.lock_conn()?;

        let lessons_json = serde_json::to_string(&record.course.lessons)?;
        let embedding_bytes = Self::embedding_to_bytes(&record.embedding);

        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses
            (title, link, instructor, lessons_json, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.course.title,
                record.course.link,
                record.course.instructor,
                lessons_json,
                embedding_bytes,
                record.indexed_at.to_rfc3339(),
            ],
        )?;

        debug!("Stored course metadata for '{}'", record.course.title);
        Ok(())
    }

    #[instrument(skip(self, records))]
    async fn add_chunks(&self, records: &[ChunkRecord]) -> Result<usize> {
        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction()?;

        for record in records {
            let embedding_bytes = Self::embedding_to_bytes(&record.embedding);

            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (id, course_title, lesson_number, chunk_index, content, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    record.id.to_string(),
                    record.course_title,
                    record.lesson_number.map(|n| n as i64),
                    record.chunk_index as i64,
                    record.content,
                    embedding_bytes,
                    record.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch stored {} chunks", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn nearest_course(&self, query_embedding: &[f32]) -> Result<Option<CourseMatch>> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare("SELECT title, embedding FROM courses")?;
        let rows = stmt.query_map([], |row| {
            let title: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(1)?;
            Ok((title, embedding_bytes))
        })?;

        let best = rows
            .filter_map(|r| r.ok())
            .map(|(title, bytes)| CourseMatch {
                title,
                score: cosine_similarity(query_embedding, &Self::bytes_to_embedding(&bytes)),
            })
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));

        Ok(best)
    }

    #[instrument(skip(self, query_embedding))]
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

        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, course_title, lesson_number, chunk_index, content, embedding, indexed_at
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let records = stmt.query_map(
            params![course_title, lesson_number.map(|n| n as i64)],
            Self::row_to_chunk,
        )?;

        let mut results: Vec<ScoredChunk> = records
            .filter_map(|r| r.ok())
            .map(|chunk| {
                let score = cosine_similarity(query_embedding, &chunk.embedding);
                ScoredChunk { chunk, score }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>> {
        let conn = self.lock_conn()?;

        let row = conn.query_row(
            r#"
            SELECT title, link, instructor, lessons_json, embedding, indexed_at
            FROM courses WHERE title = ?1
            "#,
            params![title],
            |row| {
                let title: String = row.get(0)?;
                let link: Option<String> = row.get(1)?;
                let instructor: Option<String> = row.get(2)?;
                let lessons_json: String = row.get(3)?;
                let embedding_bytes: Vec<u8> = row.get(4)?;
                let indexed_at_str: String = row.get(5)?;
                Ok((title, link, instructor, lessons_json, embedding_bytes, indexed_at_str))
            },
        );

        match row {
            Ok((title, link, instructor, lessons_json, embedding_bytes, indexed_at_str)) => {
                let lessons = serde_json::from_str(&lessons_json)?;
                Ok(Some(CourseRecord {
                    course: Course {
                        title,
                        link,
                        instructor,
                        lessons,
                    },
                    embedding: Self::bytes_to_embedding(&embedding_bytes),
                    indexed_at: Self::parse_timestamp(&indexed_at_str),
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn list_courses(&self) -> Result<Vec<CourseSummary>> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT c.title, c.instructor, c.link, c.lessons_json, c.indexed_at,
                   (SELECT COUNT(*) FROM chunks WHERE course_title = c.title) AS chunk_count
            FROM courses c
            ORDER BY c.indexed_at DESC
            "#,
        )?;

        let summaries = stmt.query_map([], |row| {
            let lessons_json: String = row.get(3)?;
            let indexed_at_str: String = row.get(4)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                lessons_json,
                indexed_at_str,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in summaries.filter_map(|r| r.ok()) {
            let (title, instructor, link, lessons_json, indexed_at_str, chunk_count) = row;
            let lessons: Vec<crate::course::Lesson> = serde_json::from_str(&lessons_json)?;
            result.push(CourseSummary {
                title,
                instructor,
                link,
                lesson_count: lessons.len() as u32,
                chunk_count: chunk_count as u32,
                indexed_at: Self::parse_timestamp(&indexed_at_str),
            });
        }

        Ok(result)
    }

    async fn is_course_indexed(&self, title: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM courses WHERE title = ?1",
            params![title],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn delete_course(&self, title: &str) -> Result<usize> {
        let conn = self.lock_conn()?;

        conn.execute("DELETE FROM courses WHERE title = ?1", params![title])?;
        let deleted = conn.execute("DELETE FROM chunks WHERE course_title = ?1", params![title])?;

        info!("Deleted course '{}' ({} chunks)", title, deleted);
        Ok(deleted)
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::Lesson;

    fn sample_record() -> CourseRecord {
        CourseRecord::new(
            Course {
                title: "Introduction to Testing".to_string(),
                link: Some("https://example.com/testing-course".to_string()),
                instructor: Some("Test Instructor".to_string()),
                lessons: vec![
                    Lesson {
                        number: 0,
                        title: "Getting Started".to_string(),
                        link: Some("https://example.com/testing-course/lesson-0".to_string()),
                    },
                    Lesson {
                        number: 1,
                        title: "Unit Testing Basics".to_string(),
                        link: None,
                    },
                ],
            },
            vec![1.0, 0.0, 0.0],
        )
    }

    #[tokio::test]
    async fn test_sqlite_course_roundtrip() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store.add_course(&sample_record()).await.unwrap();

        assert!(store
            .is_course_indexed("Introduction to Testing")
            .await
            .unwrap());

        let fetched = store
            .get_course("Introduction to Testing")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.course.lessons.len(), 2);
        assert_eq!(fetched.course.lessons[0].title, "Getting Started");
        assert_eq!(fetched.embedding, vec![1.0, 0.0, 0.0]);

        assert!(store.get_course("Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_chunk_search_with_filters() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.add_course(&sample_record()).await.unwrap();

        let chunks = vec![
            ChunkRecord::new(
                "Introduction to Testing".to_string(),
                Some(0),
                0,
                "intro content".to_string(),
                vec![1.0, 0.0, 0.0],
            ),
            ChunkRecord::new(
                "Introduction to Testing".to_string(),
                Some(1),
                1,
                "unit testing content".to_string(),
                vec![0.0, 1.0, 0.0],
            ),
        ];
        store.add_chunks(&chunks).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 2);

        let all = store
            .search_chunks(&[1.0, 0.0, 0.0], 10, None, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].chunk.content, "intro content");

        let lesson1 = store
            .search_chunks(&[1.0, 0.0, 0.0], 10, Some("Introduction to Testing"), Some(1))
            .await
            .unwrap();
        assert_eq!(lesson1.len(), 1);
        assert_eq!(lesson1[0].chunk.content, "unit testing content");

        let other_course = store
            .search_chunks(&[1.0, 0.0, 0.0], 10, Some("Other Course"), None)
            .await
            .unwrap();
        assert!(other_course.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_nearest_course() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.add_course(&sample_record()).await.unwrap();

        let hit = store.nearest_course(&[0.9, 0.1, 0.0]).await.unwrap().unwrap();
        assert_eq!(hit.title, "Introduction to Testing");
    }

    #[tokio::test]
    async fn test_sqlite_delete_course() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.add_course(&sample_record()).await.unwrap();
        store
            .add_chunks(&[ChunkRecord::new(
                "Introduction to Testing".to_string(),
                None,
                0,
                "content".to_string(),
                vec![1.0, 0.0, 0.0],
            )])
            .await
            .unwrap();

        let deleted = store.delete_course("Introduction to Testing").await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.course_count().await.unwrap(), 0);
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sqlite_zero_limit_rejected() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let err = store
            .search_chunks(&[1.0, 0.0, 0.0], 0, None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[tokio::test]
    async fn test_sqlite_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        let store = SqliteVectorStore::new(&path).unwrap();
        store.add_course(&sample_record()).await.unwrap();
        drop(store);

        let reopened = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(reopened.course_count().await.unwrap(), 1);
    }
}
