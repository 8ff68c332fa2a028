//! Transcript summarization.
//!
//! The whole transcript is first sent in a single prompt. When that prompt does
//! not fit the model, either by the local token estimate or because the API
//! rejects it, the transcript is summarized piece by piece and the partial
//! summaries are combined.

use crate::chunking::RecursiveCharacterSplitter;
use crate::config::{Prompts, SummarizeSettings};
use crate::error::{Result, VidqaError};
use crate::llm::{ChatMessage, ChatModel};
use crate::transcription::{join_documents, Document};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Rough characters-per-token ratio for English text.
pub const CHARS_PER_TOKEN: usize = 4;

/// Collapse rounds before the remaining summaries are combined as they are.
const MAX_COLLAPSE_ROUNDS: usize = 4;

/// Estimate the token count of `text`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Which strategy produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStrategy {
    /// Whole transcript in one prompt.
    Stuff,
    /// Pieces summarized separately, then combined.
    MapReduce,
}

impl std::fmt::Display for SummaryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryStrategy::Stuff => write!(f, "stuff"),
            SummaryStrategy::MapReduce => write!(f, "map-reduce"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub text: String,
    pub strategy: SummaryStrategy,
}

/// Summarizes documents with a chat model.
pub struct Summarizer {
    model: Arc<dyn ChatModel>,
    prompts: Prompts,
    context_window_tokens: usize,
    completion_reserve_tokens: usize,
    reduce_token_max: usize,
    max_concurrent: usize,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ChatModel>, prompts: Prompts, settings: &SummarizeSettings) -> Self {
        Self {
            model,
            prompts,
            context_window_tokens: settings.context_window_tokens,
            completion_reserve_tokens: settings.completion_reserve_tokens,
            reduce_token_max: settings.reduce_token_max.max(1),
            max_concurrent: settings.max_concurrent.max(1),
        }
    }

    /// Tokens available for the prompt itself.
    fn prompt_budget(&self) -> usize {
        self.context_window_tokens
            .saturating_sub(self.completion_reserve_tokens)
    }

    /// Summarize documents, falling back to map-reduce when the input is too long.
    #[instrument(skip_all, fields(documents = documents.len(), model = %self.model.name()))]
    pub async fn summarize(&self, documents: &[Document]) -> Result<Summary> {
        let text = join_documents(documents);
        if text.is_empty() {
            return Err(VidqaError::InvalidInput("Nothing to summarize".to_string()));
        }

        match self.run_prompt(&self.prompts.summarize.summary, &text).await {
            Ok(summary) => {
                info!("Summarized {} documents in a single prompt", documents.len());
                Ok(Summary {
                    text: summary,
                    strategy: SummaryStrategy::Stuff,
                })
            }
            Err(VidqaError::ContextWindowExceeded { tokens, limit }) => {
                warn!(
                    "Transcript too long for one prompt ({} tokens, limit {}), using map-reduce",
                    tokens, limit
                );
                let summary = self.map_reduce(documents).await?;
                Ok(Summary {
                    text: summary,
                    strategy: SummaryStrategy::MapReduce,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Render `template` around `text` and send it, checking the estimate first.
    async fn run_prompt(&self, template: &str, text: &str) -> Result<String> {
        let prompt = self.prompts.render_text(template, text);
        let tokens = estimate_tokens(&prompt);
        let limit = self.prompt_budget();
        if tokens > limit {
            return Err(VidqaError::ContextWindowExceeded { tokens, limit });
        }

        self.model.complete(&[ChatMessage::User(prompt)]).await
    }

    async fn map_reduce(&self, documents: &[Document]) -> Result<String> {
        let pieces = self.map_inputs(documents)?;
        info!("Map step over {} pieces", pieces.len());

        let template = &self.prompts.summarize.summary;
        let mut summaries: Vec<String> = stream::iter(pieces)
            .map(|piece| async move { self.run_prompt(template, &piece).await })
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        let mut rounds = 0;
        while estimate_tokens(&summaries.join("\n\n")) > self.reduce_token_max {
            if rounds == MAX_COLLAPSE_ROUNDS {
                warn!(
                    "Partial summaries still exceed {} tokens after {} collapse rounds, combining anyway",
                    self.reduce_token_max, rounds
                );
                break;
            }
            rounds += 1;
            summaries = self.collapse(summaries).await?;
            debug!("Collapse round {} left {} summaries", rounds, summaries.len());
        }

        self.run_prompt(&self.prompts.summarize.combine, &summaries.join("\n\n"))
            .await
    }

    /// Texts for the map step. Documents whose prompt would not fit are split.
    fn map_inputs(&self, documents: &[Document]) -> Result<Vec<String>> {
        let template = &self.prompts.summarize.summary;
        let budget = self.prompt_budget();
        let overhead = estimate_tokens(&self.prompts.render_text(template, ""));
        let piece_chars = budget.saturating_sub(overhead) * CHARS_PER_TOKEN;
        if piece_chars == 0 {
            return Err(VidqaError::Summarize(format!(
                "Summary prompt alone needs {} tokens, more than the {} available",
                overhead, budget
            )));
        }

        let splitter = RecursiveCharacterSplitter::new(piece_chars, 0)?;
        let mut pieces = Vec::new();
        for doc in documents {
            let text = doc.text.trim();
            if text.is_empty() {
                continue;
            }
            if estimate_tokens(text) + overhead <= budget {
                pieces.push(text.to_string());
                continue;
            }
            pieces.extend(splitter.split_text(text).into_iter().map(|s| s.text.to_string()));
        }

        Ok(pieces)
    }

    /// Combine neighbouring summaries in batches of at most `reduce_token_max` tokens.
    async fn collapse(&self, summaries: Vec<String>) -> Result<Vec<String>> {
        let mut batches: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_tokens = 0;

        for summary in summaries {
            let tokens = estimate_tokens(&summary);
            if !current.is_empty() && current_tokens + tokens > self.reduce_token_max {
                batches.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            current_tokens += tokens;
            current.push(summary);
        }
        if !current.is_empty() {
            batches.push(current);
        }

        let template = &self.prompts.summarize.combine;
        stream::iter(batches)
            .map(|batch| async move { self.run_prompt(template, &batch.join("\n\n")).await })
            .buffered(self.max_concurrent)
            .try_collect()
            .await
    }
}
