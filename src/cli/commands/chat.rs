//! Interactive chat command.
//!
//! Runs the same query pipeline as `ask`, with a per-run session so
//! follow-up questions see the previous exchanges.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'pensum doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.rag.model = model;
    }

    let orchestrator = Orchestrator::new(settings)?;
    let mut session_id = orchestrator.sessions().create_session();

    println!("\n{}", style("Pensum Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset the conversation.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            orchestrator.sessions().clear(&session_id);
            session_id = orchestrator.sessions().create_session();
            Output::info("Conversation history cleared.");
            continue;
        }

        match orchestrator.query(input, Some(&session_id)).await {
            Ok(outcome) => {
                println!("\n{} {}\n", style("Pensum:").cyan().bold(), outcome.answer);

                if !outcome.sources.is_empty() {
                    for source in &outcome.sources {
                        println!(
                            "  {}",
                            style(format!("[{}]", source.label)).dim()
                        );
                    }
                    println!();
                }
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
