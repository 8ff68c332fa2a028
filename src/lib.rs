//! vidqa - ask questions about a YouTube video
//!
//! Paste a video URL and a question; vidqa downloads the audio, transcribes it
//! with Whisper, indexes the transcript in a local vector store and answers
//! with retrieval over the transcript. Follow-up questions keep the
//! conversation going.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `audio_source` - YouTube URL parsing and metadata
//! - `audio` - Audio download and splitting
//! - `transcription` - Speech-to-text and the transcript loader
//! - `chunking` - Recursive character splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Named vector store backends
//! - `indexer` - Split, embed and store
//! - `llm` - Chat models and model selection
//! - `summarize` - Single-prompt and map-reduce summaries
//! - `rag` - Conversational question answering
//! - `orchestrator` - Pipeline coordination
//! - `web` - The HTML form and JSON endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use vidqa::config::Settings;
//! use vidqa::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     let mut memory = orchestrator.new_memory();
//!
//!     let answer = orchestrator
//!         .answer("https://www.youtube.com/watch?v=nM_3d37lmcM", "Who is the guest?", &mut memory)
//!         .await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod audio_source;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod summarize;
pub mod transcription;
pub mod vector_store;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, VidqaError};
