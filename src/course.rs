//! Course data model and the ingestion document format.
//!
//! Courses are identified by their title everywhere downstream; there is no
//! separate numeric ID. All records are immutable once ingested.

use serde::{Deserialize, Serialize};

/// A course with its ordered lesson list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Canonical course title (unique across the catalog).
    pub title: String,
    /// Link to the course page.
    #[serde(default)]
    pub link: Option<String>,
    /// Course instructor.
    #[serde(default)]
    pub instructor: Option<String>,
    /// Lessons in course order.
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Look up a lesson by its number.
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.number == number)
    }

    /// Link for a lesson, if the course carries one.
    pub fn lesson_link(&self, number: u32) -> Option<&str> {
        self.lesson(number).and_then(|l| l.link.as_deref())
    }
}

/// A single lesson within a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number (unique within its course).
    pub number: u32,
    /// Lesson title.
    pub title: String,
    /// Link to the lesson page.
    #[serde(default)]
    pub link: Option<String>,
}

/// One pre-chunked span of course text as produced by the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Chunk text.
    pub content: String,
    /// Title of the owning course.
    pub course_title: String,
    /// Lesson this chunk belongs to, if any.
    #[serde(default)]
    pub lesson_number: Option<u32>,
    /// Position of this chunk within the course.
    pub chunk_index: u32,
}

/// On-disk ingestion format: course metadata plus its pre-chunked content.
///
/// Chunking happens upstream; Pensum only consumes these records.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseDocument {
    #[serde(flatten)]
    pub course: Course,
    /// Ordered chunk list. `chunk_index` defaults to list position.
    pub chunks: Vec<RawChunk>,
}

/// A chunk as it appears in a course document file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChunk {
    pub content: String,
    #[serde(default)]
    pub lesson_number: Option<u32>,
    #[serde(default)]
    pub chunk_index: Option<u32>,
}

impl CourseDocument {
    /// Materialize the document's chunks with their owning course title and
    /// positional indices filled in.
    pub fn content_chunks(&self) -> Vec<CourseChunk> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(i, raw)| CourseChunk {
                content: raw.content.clone(),
                course_title: self.course.title.clone(),
                lesson_number: raw.lesson_number,
                chunk_index: raw.chunk_index.unwrap_or(i as u32),
            })
            .collect()
    }
}
