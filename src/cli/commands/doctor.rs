//! Doctor command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::{SqliteVectorStore, VectorStore};
use anyhow::Result;

/// Run the doctor command.
pub async fn run_doctor(settings: Settings) -> Result<()> {
    Output::header("Pensum Doctor");
    println!();

    // Configuration
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::success(&format!("Config file: {:?}", config_path));
    } else {
        Output::info(&format!(
            "No config file at {:?} (using defaults)",
            config_path
        ));
    }

    // API key
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Output::success("OPENAI_API_KEY is set"),
        _ => Output::error("OPENAI_API_KEY is not set"),
    }

    // Result cap sanity: zero silently breaks every content search.
    if settings.rag.max_results == 0 {
        Output::error("rag.max_results is 0; content searches will always fail");
    } else {
        Output::success(&format!("rag.max_results = {}", settings.rag.max_results));
    }

    // Catalog
    let db_path = settings.sqlite_path();
    if db_path.exists() {
        let store = SqliteVectorStore::new(&db_path)?;
        let courses = store.course_count().await?;
        let chunks = store.chunk_count().await?;
        Output::success(&format!(
            "Catalog: {:?} ({} courses, {} chunks)",
            db_path, courses, chunks
        ));
    } else {
        Output::info(&format!(
            "No catalog yet at {:?} (run 'pensum ingest' first)",
            db_path
        ));
    }

    Ok(())
}
