//! Pipeline orchestrator for Pensum.
//!
//! Wires the configured components together and drives queries end to end:
//! session history in, bounded tool loop, answer and citation sources out.

use crate::agent::{Agent, CitationSource, ToolRegistry};
use crate::chat_model::{ChatModel, OpenAIChatModel};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{PensumError, Result};
use crate::ingest::{IngestResult, IngestSummary, Ingestor};
use crate::retrieval::RetrievalStore;
use crate::session::SessionManager;
use crate::vector_store::{CourseSummary, SqliteVectorStore, VectorStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for the Pensum pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    chat_model: Arc<dyn ChatModel>,
    embedder: Arc<dyn Embedder>,
    retrieval: Arc<RetrievalStore>,
    sessions: SessionManager,
}

impl Orchestrator {
    /// Create a new orchestrator with default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let vector_store: Arc<dyn VectorStore> =
            Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);

        let chat_model: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::new(
            &settings.rag.model,
            settings.rag.max_answer_tokens,
        ));

        Self::with_components(settings, prompts, chat_model, vector_store, embedder)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        chat_model: Arc<dyn ChatModel>,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let retrieval = Arc::new(RetrievalStore::new(
            vector_store,
            embedder.clone(),
            settings.rag.max_results,
        ));
        let sessions = SessionManager::new(settings.rag.max_history);

        Ok(Self {
            settings,
            prompts,
            chat_model,
            embedder,
            retrieval,
            sessions,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Get the retrieval store.
    pub fn retrieval(&self) -> Arc<RetrievalStore> {
        self.retrieval.clone()
    }

    /// Ingest a single course document.
    pub async fn ingest_course_file(&self, path: &Path, force: bool) -> Result<IngestResult> {
        self.ingestor().ingest_file(path, force).await
    }

    /// Ingest a folder of course documents.
    pub async fn ingest_course_dir(&self, path: &Path, force: bool) -> Result<IngestSummary> {
        self.ingestor().ingest_dir(path, force).await
    }

    fn ingestor(&self) -> Ingestor {
        Ingestor::new(self.retrieval.store(), self.embedder.clone())
    }

    /// Answer a question. Returns the final answer with the citation sources
    /// accumulated by the tools that ran for it.
    ///
    /// With a session ID, the session's past exchanges are injected as
    /// context and the completed exchange is folded back in afterwards. The
    /// whole run is bounded by the configured query timeout.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn query(&self, question: &str, session_id: Option<&str>) -> Result<QueryOutcome> {
        let history = session_id.and_then(|id| self.sessions.history(id));

        // Fresh registry per query: the citation-source slot must never be
        // shared between concurrent queries.
        let registry = ToolRegistry::new(self.retrieval.clone());
        let agent = Agent::new(
            self.chat_model.clone(),
            registry,
            &self.prompts.assistant_system(),
        )
        .with_max_rounds(self.settings.rag.max_tool_rounds);

        let outcome = tokio::time::timeout(
            self.settings.rag.query_timeout(),
            agent.run(question, history.as_deref()),
        )
        .await
        .map_err(|_| {
            PensumError::Assistant(format!(
                "query timed out after {} seconds",
                self.settings.rag.query_timeout_seconds
            ))
        })??;

        if let Some(id) = session_id {
            self.sessions.add_exchange(id, question, &outcome.answer);
        }

        info!(
            "Answered query with {} tool rounds and {} sources",
            outcome.tool_rounds,
            outcome.sources.len()
        );

        Ok(QueryOutcome {
            answer: outcome.answer,
            sources: outcome.sources,
        })
    }

    /// Catalog analytics: how many courses are indexed and their titles.
    pub async fn analytics(&self) -> Result<CourseAnalytics> {
        let courses = self.retrieval.store().list_courses().await?;
        Ok(CourseAnalytics {
            total_courses: courses.len(),
            course_titles: courses.into_iter().map(|c| c.title).collect(),
        })
    }

    /// List indexed courses with their summary information.
    pub async fn list_courses(&self) -> Result<Vec<CourseSummary>> {
        self.retrieval.store().list_courses().await
    }
}

/// Final result of one query: the caller-facing contract.
#[derive(Debug)]
pub struct QueryOutcome {
    /// Natural-language answer.
    pub answer: String,
    /// Citation sources in tool-call order.
    pub sources: Vec<CitationSource>,
}

/// Catalog statistics.
#[derive(Debug, serde::Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        populated_memory_store, text_reply, tool_reply, FakeEmbedder, ScriptedChatModel,
        StallingChatModel,
    };

    async fn orchestrator_with(model: Arc<dyn ChatModel>) -> Orchestrator {
        let mut settings = Settings::default();
        settings.rag.query_timeout_seconds = 5;

        Orchestrator::with_components(
            settings,
            Prompts::default(),
            model,
            populated_memory_store().await,
            Arc::new(FakeEmbedder::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_query_returns_answer_and_sources() {
        let model = Arc::new(ScriptedChatModel::new(vec![
            tool_reply(
                "call-1",
                "search_course_content",
                r#"{"query": "unit testing"}"#,
            ),
            text_reply("Unit testing verifies isolated components."),
        ]));
        let orchestrator = orchestrator_with(model).await;

        let outcome = orchestrator
            .query("What is unit testing?", None)
            .await
            .unwrap();

        assert_eq!(outcome.answer, "Unit testing verifies isolated components.");
        assert!(!outcome.sources.is_empty());
        assert_eq!(outcome.sources[0].course_title, "Introduction to Testing");
    }

    #[tokio::test]
    async fn test_sources_do_not_leak_across_queries() {
        let model = Arc::new(ScriptedChatModel::new(vec![
            tool_reply(
                "call-1",
                "search_course_content",
                r#"{"query": "unit testing"}"#,
            ),
            text_reply("First answer."),
            text_reply("Second answer, no tools."),
        ]));
        let orchestrator = orchestrator_with(model).await;

        let first = orchestrator.query("What is unit testing?", None).await.unwrap();
        assert!(!first.sources.is_empty());

        let second = orchestrator.query("Thanks!", None).await.unwrap();
        assert!(second.sources.is_empty());
    }

    #[tokio::test]
    async fn test_session_history_round_trip() {
        let model = Arc::new(ScriptedChatModel::new(vec![
            text_reply("Testing verifies behavior."),
            text_reply("Yes, start with unit tests."),
        ]));
        let orchestrator = orchestrator_with(model).await;

        let session_id = orchestrator.sessions().create_session();
        orchestrator
            .query("What is testing?", Some(&session_id))
            .await
            .unwrap();
        orchestrator
            .query("Should I do it?", Some(&session_id))
            .await
            .unwrap();

        let history = orchestrator.sessions().history(&session_id).unwrap();
        assert!(history.contains("What is testing?"));
        assert!(history.contains("Testing verifies behavior."));
        assert!(history.contains("Should I do it?"));
    }

    #[tokio::test]
    async fn test_query_timeout_is_enforced() {
        let mut settings = Settings::default();
        settings.rag.query_timeout_seconds = 1;

        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(StallingChatModel),
            populated_memory_store().await,
            Arc::new(FakeEmbedder::new()),
        )
        .unwrap();

        let err = orchestrator.query("Hello?", None).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_analytics() {
        let model = Arc::new(ScriptedChatModel::new(vec![]));
        let orchestrator = orchestrator_with(model).await;

        let analytics = orchestrator.analytics().await.unwrap();
        assert_eq!(analytics.total_courses, 1);
        assert_eq!(analytics.course_titles, vec!["Introduction to Testing"]);
    }
}
