//! Shared test fixtures: a deterministic embedder, a scripted chat model,
//! and a pre-populated sample catalog.

use crate::chat_model::{ChatModel, ModelReply, ToolInvocation};
use crate::course::{Course, CourseChunk, Lesson};
use crate::embedding::Embedder;
use crate::error::{PensumError, Result};
use crate::vector_store::{ChunkRecord, CourseRecord, MemoryVectorStore, VectorStore};
use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionTool};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Deterministic bag-of-words embedder. Texts sharing tokens get similar
/// vectors, which is enough for ranking and resolution tests without any
/// network access.
pub struct FakeEmbedder {
    dimensions: usize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self { dimensions: 16 }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hash: u64 = 7;
            for byte in token.bytes() {
                hash = hash.wrapping_mul(31).wrapping_add(byte as u64);
            }
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// The sample course used across tests.
pub fn sample_course() -> Course {
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
                link: Some("https://example.com/testing-course/lesson-1".to_string()),
            },
            Lesson {
                number: 2,
                title: "Integration Testing".to_string(),
                link: Some("https://example.com/testing-course/lesson-2".to_string()),
            },
        ],
    }
}

/// Pre-chunked content for the sample course.
pub fn sample_chunks() -> Vec<CourseChunk> {
    vec![
        CourseChunk {
            content: "This is the introduction to testing. Testing is crucial for software quality."
                .to_string(),
            course_title: "Introduction to Testing".to_string(),
            lesson_number: Some(0),
            chunk_index: 0,
        },
        CourseChunk {
            content: "Unit testing focuses on testing individual components in isolation. Each test should verify one specific behavior."
                .to_string(),
            course_title: "Introduction to Testing".to_string(),
            lesson_number: Some(1),
            chunk_index: 1,
        },
        CourseChunk {
            content: "Integration tests verify that components work together correctly. They test the interactions between modules."
                .to_string(),
            course_title: "Introduction to Testing".to_string(),
            lesson_number: Some(2),
            chunk_index: 2,
        },
    ]
}

/// An in-memory store populated with the sample catalog.
pub async fn populated_memory_store() -> Arc<MemoryVectorStore> {
    let embedder = FakeEmbedder::new();
    let store = MemoryVectorStore::new();
    let course = sample_course();

    let course_record = CourseRecord::new(course.clone(), embedder.embed_text(&course.title));
    let chunk_records: Vec<ChunkRecord> = sample_chunks()
        .into_iter()
        .map(|c| {
            let embedding = embedder.embed_text(&c.content);
            ChunkRecord::new(c.course_title, c.lesson_number, c.chunk_index, c.content, embedding)
        })
        .collect();

    store.add_course(&course_record).await.unwrap();
    store.add_chunks(&chunk_records).await.unwrap();

    Arc::new(store)
}

/// A recorded model call: the messages sent and whether tools were offered.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<ChatCompletionRequestMessage>,
    pub tools_offered: bool,
}

/// Chat model that replays a fixed script of replies and records every call.
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<ModelReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedChatModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: Option<&[ChatCompletionTool]>,
    ) -> Result<ModelReply> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools_offered: tools.is_some(),
        });

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PensumError::Assistant("scripted replies exhausted".to_string()))
    }
}

/// Chat model that never completes; used for timeout tests.
pub struct StallingChatModel;

#[async_trait]
impl ChatModel for StallingChatModel {
    async fn complete(
        &self,
        _messages: &[ChatCompletionRequestMessage],
        _tools: Option<&[ChatCompletionTool]>,
    ) -> Result<ModelReply> {
        std::future::pending().await
    }
}

/// Build a terminal text reply.
pub fn text_reply(content: &str) -> ModelReply {
    ModelReply {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
    }
}

/// Build a tool-request reply with a single invocation.
pub fn tool_reply(id: &str, name: &str, arguments: &str) -> ModelReply {
    ModelReply {
        content: None,
        tool_calls: vec![ToolInvocation {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }],
    }
}
