//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(path: &str, force: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        Output::info("Run 'pensum doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let path = Path::new(path);

    let spinner = Output::spinner("Ingesting course documents...");

    if path.is_dir() {
        match orchestrator.ingest_course_dir(path, force).await {
            Ok(summary) => {
                spinner.finish_and_clear();
                Output::success(&format!(
                    "Ingested {} courses ({} chunks), skipped {} already indexed",
                    summary.courses_added, summary.chunks_added, summary.skipped
                ));
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Ingest failed: {}", e));
                return Err(e.into());
            }
        }
    } else {
        match orchestrator.ingest_course_file(path, force).await {
            Ok(result) if result.skipped => {
                spinner.finish_and_clear();
                Output::info(&format!(
                    "Course '{}' is already indexed (use --force to re-ingest)",
                    result.course_title
                ));
            }
            Ok(result) => {
                spinner.finish_and_clear();
                Output::success(&format!(
                    "Ingested '{}' ({} chunks)",
                    result.course_title, result.chunks_indexed
                ));
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Ingest failed: {}", e));
                return Err(e.into());
            }
        }
    }

    Ok(())
}
