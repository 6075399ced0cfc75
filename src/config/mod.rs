//! Configuration module for Spor.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, ConfidenceSettings, EmbeddingSettings, EmptyRetrieval, GeneralSettings,
    GenerationProviderKind, GenerationSettings, PromptSettings, RetrievalSettings, ServerSettings,
    Settings, TranscriptProvider, TranscriptSettings,
};
