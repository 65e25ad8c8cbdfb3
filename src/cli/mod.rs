//! CLI module for Pensum.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Pensum - Course Material Q&A
///
/// A local-first CLI tool for asking questions about course materials.
/// The name "Pensum" comes from the Norwegian word for "required reading."
#[derive(Parser, Debug)]
#[command(name = "pensum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Pensum and write the default configuration
    Init,

    /// Check configuration and catalog health
    Doctor,

    /// Ingest course documents (a JSON file or a folder of them)
    Ingest {
        /// Course document file, or a folder containing *.json documents
        path: String,

        /// Re-ingest courses that are already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// Ask a question about your course catalog
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,

        /// Session ID for conversational context
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Search course content directly (no LLM)
    Search {
        /// Search query
        query: String,

        /// Restrict to a course (partial names are resolved)
        #[arg(short, long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(short, long)]
        lesson: Option<u32>,

        /// Maximum number of results
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// Show a course's outline (lessons with numbers and titles)
    Outline {
        /// Course title (partial names are resolved)
        course: String,
    },

    /// Start an interactive chat session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List indexed courses
    List,

    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
