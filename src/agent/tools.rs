//! Tool definitions and execution for the course assistant.
//!
//! The tool set is closed: every invocable capability is a [`ToolRequest`]
//! variant with a schema entry in [`tool_definitions`]. Execution never
//! raises; every failure comes back as a human-readable string so the model
//! can react to it conversationally.

use crate::error::{PensumError, Result};
use crate::retrieval::{RetrievalStore, SearchFailure};
use crate::vector_store::ScoredChunk;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// The closed set of tools the model may invoke.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    /// Semantic search over course content.
    SearchContent {
        query: String,
        course_name: Option<String>,
        lesson_number: Option<u32>,
    },

    /// Ordered lesson list for a course.
    CourseOutline { course_name: String },
}

/// A structured reference attached to an answer for traceability.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CitationSource {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub lesson_link: Option<String>,
    /// Display label, e.g. "Introduction to Testing - Lesson 1".
    pub label: String,
}

impl CitationSource {
    fn for_chunk(chunk: &crate::vector_store::ChunkRecord, lesson_link: Option<String>) -> Self {
        let label = match chunk.lesson_number {
            Some(n) => format!("{} - Lesson {}", chunk.course_title, n),
            None => chunk.course_title.clone(),
        };
        Self {
            course_title: chunk.course_title.clone(),
            lesson_number: chunk.lesson_number,
            lesson_link,
            label,
        }
    }
}

/// Registry of the assistant's tools, scoped to a single query execution.
///
/// Citation sources accumulate across tool calls within one answer cycle and
/// are handed over exactly once through [`ToolRegistry::drain_sources`].
/// Concurrent queries must each use their own registry.
pub struct ToolRegistry {
    retrieval: Arc<RetrievalStore>,
    last_sources: Mutex<Vec<CitationSource>>,
}

impl ToolRegistry {
    /// Create a registry over the given retrieval store.
    pub fn new(retrieval: Arc<RetrievalStore>) -> Self {
        Self {
            retrieval,
            last_sources: Mutex::new(Vec::new()),
        }
    }

    /// Schemas for every registered tool.
    pub fn get_all_definitions(&self) -> Vec<ChatCompletionTool> {
        tool_definitions()
    }

    /// Execute a named tool. All failure modes are encoded in the returned
    /// string; this never errors.
    #[instrument(skip(self, arguments))]
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        match parse_tool_call(name, arguments) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!("Rejected tool call '{}': {}", name, e);
                format!("Failed to parse tool call: {}", e)
            }
        }
    }

    /// Return the sources accumulated during the current answer cycle and
    /// clear the slot. Callers drain exactly once per cycle; a second drain
    /// yields an empty list.
    pub fn drain_sources(&self) -> Vec<CitationSource> {
        std::mem::take(&mut *self.last_sources.lock().unwrap())
    }

    async fn dispatch(&self, request: ToolRequest) -> String {
        match request {
            ToolRequest::SearchContent {
                query,
                course_name,
                lesson_number,
            } => {
                self.execute_search(&query, course_name.as_deref(), lesson_number)
                    .await
            }
            ToolRequest::CourseOutline { course_name } => {
                self.execute_outline(&course_name).await
            }
        }
    }

    async fn execute_search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> String {
        // Resolve the fuzzy course name first; a miss short-circuits without
        // touching the content collection.
        let course_title = match course_name {
            Some(name) => match self.retrieval.resolve_course_name(name).await {
                Ok(Some(title)) => Some(title),
                Ok(None) => return format!("No course found matching '{}'", name),
                Err(e) => return format!("Course lookup failed: {}", e),
            },
            None => None,
        };

        let hits = match self
            .retrieval
            .search_content(query, course_title.as_deref(), lesson_number)
            .await
        {
            Ok(hits) => hits,
            Err(SearchFailure::Misconfigured { configured }) => {
                return format!(
                    "Configuration error: max_results is {} but must be a positive integer. \
                     Update [rag] max_results in the configuration and retry.",
                    configured
                );
            }
            Err(SearchFailure::Backend(message)) => return message,
        };

        if hits.is_empty() {
            let mut message = String::from("No relevant content found");
            if let Some(title) = &course_title {
                message.push_str(&format!(" in course '{}'", title));
            }
            if let Some(n) = lesson_number {
                message.push_str(&format!(" in lesson {}", n));
            }
            return message;
        }

        info!("Content search returned {} chunks", hits.len());

        let mut blocks = Vec::with_capacity(hits.len());
        let mut sources = Vec::with_capacity(hits.len());
        for hit in &hits {
            blocks.push(self.format_hit(hit));
            sources.push(self.source_for(hit).await);
        }

        self.record_sources(sources);
        blocks.join("\n\n")
    }

    async fn execute_outline(&self, course_name: &str) -> String {
        let title = match self.retrieval.resolve_course_name(course_name).await {
            Ok(Some(title)) => title,
            Ok(None) => return format!("No course found matching '{}'", course_name),
            Err(e) => return format!("Course lookup failed: {}", e),
        };

        let record = match self.retrieval.store().get_course(&title).await {
            Ok(Some(record)) => record,
            Ok(None) => return format!("No course found matching '{}'", course_name),
            Err(e) => return format!("Course lookup failed: {}", e),
        };

        let course = record.course;
        let mut out = format!("Course: {}", course.title);
        if let Some(link) = &course.link {
            out.push_str(&format!("\nCourse link: {}", link));
        }
        if let Some(instructor) = &course.instructor {
            out.push_str(&format!("\nInstructor: {}", instructor));
        }
        out.push_str(&format!("\nLessons ({}):", course.lessons.len()));
        for lesson in &course.lessons {
            out.push_str(&format!("\nLesson {}: {}", lesson.number, lesson.title));
        }
        out
    }

    fn format_hit(&self, hit: &ScoredChunk) -> String {
        let header = match hit.chunk.lesson_number {
            Some(n) => format!("[{} - Lesson {}]", hit.chunk.course_title, n),
            None => format!("[{}]", hit.chunk.course_title),
        };
        format!("{}\n{}", header, hit.chunk.content)
    }

    async fn source_for(&self, hit: &ScoredChunk) -> CitationSource {
        let lesson_link = match hit.chunk.lesson_number {
            Some(n) => self
                .retrieval
                .lesson_link(&hit.chunk.course_title, n)
                .await
                .ok()
                .flatten(),
            None => None,
        };
        CitationSource::for_chunk(&hit.chunk, lesson_link)
    }

    fn record_sources(&self, sources: Vec<CitationSource>) {
        self.last_sources.lock().unwrap().extend(sources);
    }
}

/// Parse a tool call from the model's function-call format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolRequest> {
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| PensumError::Assistant(format!("Invalid tool arguments: {}", e)))?;

    match name {
        "search_course_content" => {
            let query = args["query"]
                .as_str()
                .ok_or_else(|| PensumError::Assistant("Missing 'query' argument".to_string()))?
                .to_string();
            let course_name = args["course_name"].as_str().map(str::to_string);
            let lesson_number = args["lesson_number"].as_u64().map(|n| n as u32);
            Ok(ToolRequest::SearchContent {
                query,
                course_name,
                lesson_number,
            })
        }
        "get_course_outline" => {
            let course_name = args["course_name"]
                .as_str()
                .ok_or_else(|| {
                    PensumError::Assistant("Missing 'course_name' argument".to_string())
                })?
                .to_string();
            Ok(ToolRequest::CourseOutline { course_name })
        }
        _ => Err(PensumError::Assistant(format!("Unknown tool: {}", name))),
    }
}

/// Function/tool definitions offered to the chat model.
pub fn tool_definitions() -> Vec<ChatCompletionTool> {
    vec![
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "search_course_content".to_string(),
                description: Some(
                    "Search course materials for specific content. \
                     Use this for questions about what a course teaches."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "What to search for in the course content"
                        },
                        "course_name": {
                            "type": "string",
                            "description": "Course title (partial names are resolved, e.g. 'MCP' or 'Introduction')"
                        },
                        "lesson_number": {
                            "type": "integer",
                            "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                        }
                    },
                    "required": ["query"]
                })),
                strict: None,
            },
        },
        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: "get_course_outline".to_string(),
                description: Some(
                    "Get a course's outline: its title, link, and the complete ordered \
                     lesson list. Use this for questions about course structure or syllabus."
                        .to_string(),
                ),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "course_name": {
                            "type": "string",
                            "description": "Course title (partial names are resolved)"
                        }
                    },
                    "required": ["course_name"]
                })),
                strict: None,
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::RetrievalStore;
    use crate::testing::{populated_memory_store, FakeEmbedder};
    use crate::vector_store::MemoryVectorStore;

    async fn registry_with(max_results: usize) -> ToolRegistry {
        ToolRegistry::new(Arc::new(RetrievalStore::new(
            populated_memory_store().await,
            Arc::new(FakeEmbedder::new()),
            max_results,
        )))
    }

    #[test]
    fn test_parse_search_tool() {
        let request = parse_tool_call(
            "search_course_content",
            r#"{"query": "unit testing", "course_name": "Testing", "lesson_number": 2}"#,
        )
        .unwrap();

        assert_eq!(
            request,
            ToolRequest::SearchContent {
                query: "unit testing".to_string(),
                course_name: Some("Testing".to_string()),
                lesson_number: Some(2),
            }
        );
    }

    #[test]
    fn test_parse_outline_tool() {
        let request =
            parse_tool_call("get_course_outline", r#"{"course_name": "Testing"}"#).unwrap();
        assert_eq!(
            request,
            ToolRequest::CourseOutline {
                course_name: "Testing".to_string()
            }
        );
    }

    #[test]
    fn test_parse_unknown_tool() {
        assert!(parse_tool_call("delete_everything", "{}").is_err());
        assert!(parse_tool_call("search_course_content", "not json").is_err());
        assert!(parse_tool_call("search_course_content", "{}").is_err());
    }

    #[test]
    fn test_tool_definitions_expose_both_tools() {
        let defs = tool_definitions();
        let names: Vec<_> = defs.iter().map(|d| d.function.name.as_str()).collect();
        assert_eq!(names, vec!["search_course_content", "get_course_outline"]);
    }

    #[tokio::test]
    async fn test_search_formats_labeled_blocks() {
        let registry = registry_with(5).await;

        let result = registry
            .execute(
                "search_course_content",
                r#"{"query": "unit testing components isolation"}"#,
            )
            .await;

        assert!(result.contains("[Introduction to Testing - Lesson"));
        assert!(result.contains("isolation"));
    }

    #[tokio::test]
    async fn test_search_records_sources_with_lesson_links() {
        let registry = registry_with(5).await;

        registry
            .execute(
                "search_course_content",
                r#"{"query": "unit testing components isolation", "lesson_number": 1}"#,
            )
            .await;

        let sources = registry.drain_sources();
        assert!(!sources.is_empty());
        assert_eq!(sources[0].course_title, "Introduction to Testing");
        assert_eq!(sources[0].lesson_number, Some(1));
        assert_eq!(sources[0].label, "Introduction to Testing - Lesson 1");
        assert_eq!(
            sources[0].lesson_link.as_deref(),
            Some("https://example.com/testing-course/lesson-1")
        );
    }

    #[tokio::test]
    async fn test_sources_accumulate_within_one_cycle() {
        let registry = registry_with(5).await;

        registry
            .execute(
                "search_course_content",
                r#"{"query": "testing", "lesson_number": 1}"#,
            )
            .await;
        registry
            .execute(
                "search_course_content",
                r#"{"query": "integration", "lesson_number": 2}"#,
            )
            .await;

        let sources = registry.drain_sources();
        let lessons: Vec<_> = sources.iter().filter_map(|s| s.lesson_number).collect();
        assert!(lessons.contains(&1));
        assert!(lessons.contains(&2));
    }

    #[tokio::test]
    async fn test_drain_sources_clears_slot() {
        let registry = registry_with(5).await;

        registry
            .execute("search_course_content", r#"{"query": "testing"}"#)
            .await;

        let first = registry.drain_sources();
        assert!(!first.is_empty());

        let second = registry.drain_sources();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_search_unknown_course_resolves_to_nearest() {
        // Single-course catalog: even a dissimilar name resolves to the one
        // course. Asserting the resolved title, not a miss.
        let registry = registry_with(5).await;

        let result = registry
            .execute(
                "search_course_content",
                r#"{"query": "testing", "course_name": "NonExistent Course"}"#,
            )
            .await;

        assert!(result.contains("Introduction to Testing"));
        assert!(!result.starts_with("No course found"));
    }

    #[tokio::test]
    async fn test_search_empty_catalog_reports_no_course() {
        let registry = ToolRegistry::new(Arc::new(RetrievalStore::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(FakeEmbedder::new()),
            5,
        )));

        let result = registry
            .execute(
                "search_course_content",
                r#"{"query": "testing", "course_name": "Anything"}"#,
            )
            .await;

        assert_eq!(result, "No course found matching 'Anything'");
    }

    #[tokio::test]
    async fn test_search_no_results_message_is_qualified() {
        let registry = registry_with(5).await;

        // Lesson 42 has no chunks, so the filtered search comes back empty.
        let result = registry
            .execute(
                "search_course_content",
                r#"{"query": "testing", "course_name": "Testing", "lesson_number": 42}"#,
            )
            .await;

        assert!(result.starts_with("No relevant content found"));
        assert!(result.contains("in course 'Introduction to Testing'"));
        assert!(result.contains("in lesson 42"));
    }

    #[tokio::test]
    async fn test_zero_result_cap_reports_configuration_error() {
        let registry = registry_with(0).await;

        let result = registry
            .execute("search_course_content", r#"{"query": "testing"}"#)
            .await;

        assert!(result.contains("Configuration error"));
        assert!(result.contains("max_results"));
        assert!(!result.starts_with("No relevant content found"));
        assert!(registry.drain_sources().is_empty());
    }

    #[tokio::test]
    async fn test_outline_lists_lessons_in_order() {
        let registry = registry_with(5).await;

        let result = registry
            .execute("get_course_outline", r#"{"course_name": "Testing"}"#)
            .await;

        assert!(result.contains("Course: Introduction to Testing"));
        assert!(result.contains("Course link: https://example.com/testing-course"));
        let l0 = result.find("Lesson 0: Getting Started").unwrap();
        let l1 = result.find("Lesson 1: Unit Testing Basics").unwrap();
        let l2 = result.find("Lesson 2: Integration Testing").unwrap();
        assert!(l0 < l1 && l1 < l2);

        // Outline lookups do not contribute citation sources.
        assert!(registry.drain_sources().is_empty());
    }

    #[tokio::test]
    async fn test_execute_never_errors_on_bad_input() {
        let registry = registry_with(5).await;

        let result = registry.execute("search_course_content", "not json").await;
        assert!(result.starts_with("Failed to parse tool call"));

        let result = registry.execute("unknown_tool", "{}").await;
        assert!(result.contains("Unknown tool"));
    }
}
