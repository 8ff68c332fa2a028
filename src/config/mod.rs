//! Configuration module for vidqa.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QaPrompts, SummarizePrompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, OpenAISettings, PromptSettings, QaSettings,
    ServerSettings, Settings, SplitterSettings, SummarizeSettings, TranscriptionSettings,
    VectorStoreSettings, API_KEY_ENV,
};
