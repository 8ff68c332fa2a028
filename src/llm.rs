//! Chat-completion access and model selection.

use crate::error::{Result, VidqaError};
use crate::openai::{create_client, map_api_error, ApiCredentials};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use tracing::{debug, instrument};

/// Chat model used for conversations before the cutover date.
pub const LEGACY_CHAT_MODEL: &str = "gpt-3.5-turbo-0301";

/// Chat model used on and after the cutover date.
pub const CURRENT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// First day on which [`CURRENT_CHAT_MODEL`] is selected.
const MODEL_CUTOVER: (i32, u32, u32) = (2023, 9, 2);

/// Pick the conversational model for a given day.
pub fn select_chat_model(today: NaiveDate) -> &'static str {
    if (today.year(), today.month(), today.day()) < MODEL_CUTOVER {
        LEGACY_CHAT_MODEL
    } else {
        CURRENT_CHAT_MODEL
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant(String),
}

impl ChatMessage {
    pub fn content(&self) -> &str {
        match self {
            ChatMessage::System(c) | ChatMessage::User(c) | ChatMessage::Assistant(c) => c,
        }
    }

    fn to_request(&self) -> Result<ChatCompletionRequestMessage> {
        let message: ChatCompletionRequestMessage = match self {
            ChatMessage::System(content) => ChatCompletionRequestSystemMessageArgs::default()
                .content(content.clone())
                .build()
                .map_err(|e| VidqaError::OpenAI(e.to_string()))?
                .into(),
            ChatMessage::User(content) => ChatCompletionRequestUserMessageArgs::default()
                .content(content.clone())
                .build()
                .map_err(|e| VidqaError::OpenAI(e.to_string()))?
                .into(),
            ChatMessage::Assistant(content) => ChatCompletionRequestAssistantMessageArgs::default()
                .content(content.clone())
                .build()
                .map_err(|e| VidqaError::OpenAI(e.to_string()))?
                .into(),
        };
        Ok(message)
    }
}

/// A chat-completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier.
    fn name(&self) -> &str;

    /// Complete a conversation and return the assistant's reply.
    ///
    /// Prompts that do not fit the model fail with
    /// [`VidqaError::ContextWindowExceeded`].
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Chat model served by the OpenAI API.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    /// Create a deterministic (temperature 0) chat model.
    pub fn new(credentials: &ApiCredentials, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: create_client(credentials)?,
            model: model.into(),
            temperature: 0.0,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let messages = messages
            .iter()
            .map(ChatMessage::to_request)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| VidqaError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| map_api_error("Chat completion failed", e))?;

        if let Some(usage) = &response.usage {
            debug!(
                "Chat usage: {} prompt + {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VidqaError::OpenAI("Empty response from chat model".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_model_selection_around_cutover() {
        assert_eq!(select_chat_model(day(2023, 9, 1)), LEGACY_CHAT_MODEL);
        assert_eq!(select_chat_model(day(2023, 9, 2)), CURRENT_CHAT_MODEL);
        assert_eq!(select_chat_model(day(2023, 9, 3)), CURRENT_CHAT_MODEL);
    }

    #[test]
    fn test_model_selection_far_from_cutover() {
        assert_eq!(select_chat_model(day(2023, 1, 15)), LEGACY_CHAT_MODEL);
        assert_eq!(select_chat_model(day(2022, 12, 31)), LEGACY_CHAT_MODEL);
        assert_eq!(select_chat_model(day(2025, 3, 1)), CURRENT_CHAT_MODEL);
        assert_eq!(select_chat_model(day(2024, 1, 1)), CURRENT_CHAT_MODEL);
    }

    #[test]
    fn test_message_conversion() {
        let msg = ChatMessage::User("hello".to_string());
        assert_eq!(msg.content(), "hello");
        assert!(matches!(
            msg.to_request().unwrap(),
            ChatCompletionRequestMessage::User(_)
        ));
    }

    #[test]
    fn test_openai_chat_model_name() {
        let model = OpenAIChatModel::new(&ApiCredentials::new("sk-test"), CURRENT_CHAT_MODEL).unwrap();
        assert_eq!(model.name(), "gpt-3.5-turbo");
    }
}
