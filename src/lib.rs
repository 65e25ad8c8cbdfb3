//! Pensum - Course Material Q&A
//!
//! A local-first CLI tool for asking questions about course materials.
//!
//! The name "Pensum" comes from the Norwegian word for "required reading."
//!
//! # Overview
//!
//! Pensum allows you to:
//! - Ingest pre-chunked course documents into a searchable vector catalog
//! - Ask questions answered by an LLM that decides, per query, whether and
//!   how to invoke retrieval tools
//! - Get answers with citation sources (course, lesson, link)
//! - Keep short per-session conversation history across questions
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `course` - Course data model and ingestion document format
//! - `ingest` - Course document ingestion
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction (courses + chunks)
//! - `retrieval` - Name resolution and filtered content search
//! - `chat_model` - Chat completion abstraction
//! - `agent` - Tool registry and the bounded multi-round tool loop
//! - `session` - Per-session conversation history
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use pensum::config::Settings;
//! use pensum::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let outcome = orchestrator
//!         .query("What does lesson 2 of the MCP course cover?", None)
//!         .await?;
//!     println!("{}", outcome.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat_model;
pub mod cli;
pub mod config;
pub mod course;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod openai;
pub mod orchestrator;
pub mod retrieval;
pub mod session;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PensumError, Result};
