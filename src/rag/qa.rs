//! Question answering with conversation memory.

use super::{format_context, ConversationMemory, Retriever, Source};
use crate::config::Prompts;
use crate::error::{Result, VidqaError};
use crate::llm::{ChatMessage, ChatModel};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// An answer with the chunks it was based on.
#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    /// The standalone question used for retrieval.
    pub generated_question: String,
    pub sources: Vec<Source>,
}

/// Retrieval QA chain over one vector store.
pub struct ConversationalQa {
    model: Arc<dyn ChatModel>,
    retriever: Retriever,
    prompts: Prompts,
}

impl ConversationalQa {
    pub fn new(model: Arc<dyn ChatModel>, retriever: Retriever, prompts: Prompts) -> Self {
        Self {
            model,
            retriever,
            prompts,
        }
    }

    /// Answer `question`, using and extending `memory`.
    #[instrument(skip(self, memory), fields(model = %self.model.name(), history = memory.len()))]
    pub async fn ask(&self, memory: &mut ConversationMemory, question: &str) -> Result<QaAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(VidqaError::InvalidInput("Question is empty".to_string()));
        }

        let generated_question = if memory.is_empty() {
            question.to_string()
        } else {
            self.condense(memory, question).await?
        };

        let sources = self.retriever.retrieve(&generated_question).await?;

        let mut vars = HashMap::new();
        vars.insert("context".to_string(), format_context(&sources));
        let system = self.prompts.render_with_custom(&self.prompts.qa.system, &vars);

        let answer = self
            .model
            .complete(&[
                ChatMessage::System(system),
                ChatMessage::User(generated_question.clone()),
            ])
            .await?;

        memory.push(question, answer.clone());
        info!("Answered with {} sources", sources.len());

        Ok(QaAnswer {
            answer,
            generated_question,
            sources,
        })
    }

    /// Rewrite a follow-up into a standalone question.
    async fn condense(&self, memory: &ConversationMemory, question: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("chat_history".to_string(), memory.format_history());
        vars.insert("question".to_string(), question.to_string());
        let prompt = self.prompts.render_with_custom(&self.prompts.qa.condense, &vars);

        let standalone = self.model.complete(&[ChatMessage::User(prompt)]).await?;
        let standalone = standalone.trim();
        debug!("Condensed question: {}", standalone);

        if standalone.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(standalone.to_string())
        }
    }
}
