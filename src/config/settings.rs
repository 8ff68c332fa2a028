//! Configuration settings for vidqa.

use crate::error::{Result, VidqaError};
use crate::openai::ApiCredentials;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub transcription: TranscriptionSettings,
    pub embedding: EmbeddingSettings,
    pub splitter: SplitterSettings,
    pub vector_store: VectorStoreSettings,
    pub summarize: SummarizeSettings,
    pub qa: QaSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory holding vector stores and downloaded audio.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "docs".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Hosted API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct OpenAISettings {
    /// API key. Falls back to the `OPENAI_API_KEY` environment variable.
    pub api_key: Option<String>,
    /// Alternative API base URL.
    pub api_base: Option<String>,
}

/// Transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Speech-to-text model.
    pub model: String,
    /// Directory (relative to the data dir unless absolute) for downloaded audio.
    pub save_dir: String,
    /// Duration in seconds of each audio piece sent to the API. Capped so a
    /// piece never exceeds the upload limit.
    pub chunk_duration_seconds: u32,
    /// Maximum video duration to process (in seconds).
    pub max_duration_seconds: u32,
    /// Audio pieces transcribed at the same time.
    pub max_concurrent_chunks: usize,
    /// Optional language hint (ISO-639-1).
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            save_dir: "youtube".to_string(),
            chunk_duration_seconds: 1200,
            max_duration_seconds: 7200, // 2 hours
            max_concurrent_chunks: 1,
            language: None,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Text splitting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
}

impl Default for SplitterSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 150,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Backend name ("qdrant" or "chroma").
    pub backend: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            backend: "qdrant".to_string(),
        }
    }
}

/// Summarizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizeSettings {
    /// Chat model for summaries.
    pub model: String,
    /// Context window of the model, in tokens.
    pub context_window_tokens: usize,
    /// Tokens kept free for the completion.
    pub completion_reserve_tokens: usize,
    /// Upper bound for combined summaries before they are collapsed again.
    pub reduce_token_max: usize,
    /// Pieces summarized at the same time during the map step.
    pub max_concurrent: usize,
}

impl Default for SummarizeSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo-16k".to_string(),
            context_window_tokens: 16385,
            completion_reserve_tokens: 1024,
            reduce_token_max: 3000,
            max_concurrent: 2,
        }
    }
}

/// Conversational QA settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaSettings {
    /// Chat model override. When unset the model is picked by date.
    pub model: Option<String>,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Turns kept in conversation memory.
    pub max_history_turns: usize,
}

impl Default for QaSettings {
    fn default() -> Self {
        Self {
            model: None,
            top_k: 4,
            max_history_turns: 10,
        }
    }
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Browser sessions kept in memory; the least recently used is evicted first.
    pub max_sessions: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_sessions: 1000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidqa")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Directory for downloaded audio.
    pub fn audio_dir(&self) -> PathBuf {
        let dir = Self::expand_path(&self.transcription.save_dir);
        if dir.is_absolute() {
            dir
        } else {
            self.data_dir().join(dir)
        }
    }

    /// Resolve the API credential from the config file or the environment.
    pub fn credentials(&self) -> Result<ApiCredentials> {
        let key = match self.openai.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => key.to_string(),
            None => std::env::var(API_KEY_ENV)
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    VidqaError::Config(format!(
                        "{} not set. Set it with: export {}='sk-...'",
                        API_KEY_ENV, API_KEY_ENV
                    ))
                })?,
        };

        Ok(ApiCredentials::new(key).with_api_base(self.openai.api_base.clone()))
    }
}
