//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    course: Option<String>,
    lesson: Option<u32>,
    limit: usize,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    settings.rag.max_results = limit;
    let orchestrator = Orchestrator::new(settings)?;
    let retrieval = orchestrator.retrieval();

    let spinner = Output::spinner("Searching...");

    // Resolve the optional course filter the same way the assistant's tools do.
    let course_title = match &course {
        Some(name) => match retrieval.resolve_course_name(name).await {
            Ok(Some(title)) => Some(title),
            Ok(None) => {
                spinner.finish_and_clear();
                Output::warning(&format!("No course found matching '{}'", name));
                return Ok(());
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Course lookup failed: {}", e));
                return Err(e.into());
            }
        },
        None => None,
    };

    let results = retrieval
        .search_content(query, course_title.as_deref(), lesson)
        .await;
    spinner.finish_and_clear();

    match results {
        Ok(hits) if hits.is_empty() => {
            Output::warning("No results found matching your query.");
        }
        Ok(hits) => {
            Output::success(&format!("Found {} results", hits.len()));
            for hit in &hits {
                let label = match hit.chunk.lesson_number {
                    Some(n) => format!("{} - Lesson {}", hit.chunk.course_title, n),
                    None => hit.chunk.course_title.clone(),
                };
                Output::search_result(&label, hit.score, &hit.chunk.content, None);
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(anyhow::anyhow!("{}", e));
        }
    }

    Ok(())
}
