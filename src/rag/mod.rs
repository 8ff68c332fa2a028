//! Conversational question answering over an indexed transcript.
//!
//! A follow-up question is first rewritten into a standalone one using the
//! conversation so far, then answered from the transcript chunks most similar
//! to it.

mod memory;
mod qa;
mod retriever;

pub use memory::{ConversationMemory, Turn};
pub use qa::{ConversationalQa, QaAnswer};
pub use retriever::{format_context, Retriever};

use crate::transcription::format_timestamp;
use crate::vector_store::SearchResult;
use serde::Serialize;

/// A transcript chunk used to answer a question.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    /// Chunk text.
    pub text: String,
    /// Video title, when known.
    pub title: Option<String>,
    /// Formatted start of the audio piece the chunk came from (e.g., "20:00").
    pub timestamp: String,
    /// Watch URL starting at that point.
    pub url: String,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for Source {
    fn from(result: SearchResult) -> Self {
        let meta = &result.entry.metadata;
        Self {
            timestamp: format_timestamp(meta.start_seconds),
            url: meta.timestamp_url(),
            title: meta.title.clone(),
            text: result.entry.text,
            score: result.score,
        }
    }
}
