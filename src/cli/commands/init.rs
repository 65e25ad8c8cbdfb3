//! Init command implementation.

use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the init command.
pub fn run_init(settings: &Settings) -> Result<()> {
    Output::header("Pensum Setup");

    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!("Config already exists at {:?}", config_path));
    } else {
        settings.save()?;
        Output::success(&format!("Created config at {:?}", config_path));
    }

    std::fs::create_dir_all(settings.data_dir())?;
    Output::success(&format!("Data directory: {:?}", settings.data_dir()));

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Output::success("OPENAI_API_KEY is set"),
        _ => {
            Output::warning("OPENAI_API_KEY is not set");
            Output::info("Set it with: export OPENAI_API_KEY='sk-...'");
        }
    }

    println!();
    Output::info("Next steps:");
    Output::list_item("pensum ingest <docs-folder>   # index course documents");
    Output::list_item("pensum ask \"What does lesson 2 cover?\"");

    Ok(())
}
