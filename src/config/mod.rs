//! Configuration management for Pensum.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, PromptSettings, RagSettings, Settings,
    VectorStoreSettings,
};
