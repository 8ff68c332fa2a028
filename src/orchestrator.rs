//! Pipeline orchestrator for vidqa.
//!
//! Coordinates one submission from URL to answer: load the transcript, index
//! it, then answer the question against the fresh index.

use crate::chunking::RecursiveCharacterSplitter;
use crate::config::{Prompts, QaSettings, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, VidqaError};
use crate::indexer::Indexer;
use crate::llm::{select_chat_model, ChatModel, OpenAIChatModel};
use crate::rag::{ConversationMemory, ConversationalQa, QaAnswer, Retriever};
use crate::summarize::{Summarizer, Summary};
use crate::transcription::{DocumentLoader, WhisperTranscriber, YoutubeLoader};
use crate::vector_store::Backend;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Conversational model name: the configured override, else the date rule.
pub fn qa_model_name(settings: &QaSettings, today: NaiveDate) -> String {
    match settings.model.as_deref().filter(|m| !m.is_empty()) {
        Some(model) => model.to_string(),
        None => select_chat_model(today).to_string(),
    }
}

/// The main orchestrator for the vidqa pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn Embedder>,
    qa_model: Arc<dyn ChatModel>,
    summary_model: Arc<dyn ChatModel>,
    /// Runs share the on-disk collections, so only one may index at a time.
    run_lock: Mutex<()>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the hosted services.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let credentials = settings.credentials()?;

        let transcriber = Arc::new(WhisperTranscriber::with_config(
            &credentials,
            &settings.transcription,
        )?);
        let loader = Arc::new(YoutubeLoader::new(
            transcriber,
            settings.audio_dir(),
            settings.transcription.max_duration_seconds,
        ));

        let embedder = Arc::new(OpenAIEmbedder::with_config(&credentials, &settings.embedding)?);

        let today = chrono::Local::now().date_naive();
        let qa_model_name = qa_model_name(&settings.qa, today);
        info!("Using {} for questions", qa_model_name);
        let qa_model = Arc::new(OpenAIChatModel::new(&credentials, qa_model_name)?);
        let summary_model = Arc::new(OpenAIChatModel::new(&credentials, settings.summarize.model.clone())?);

        Ok(Self::with_components(
            settings,
            prompts,
            loader,
            embedder,
            qa_model,
            summary_model,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        loader: Arc<dyn DocumentLoader>,
        embedder: Arc<dyn Embedder>,
        qa_model: Arc<dyn ChatModel>,
        summary_model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            settings,
            prompts,
            loader,
            embedder,
            qa_model,
            summary_model,
            run_lock: Mutex::new(()),
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Empty memory sized by the QA settings.
    pub fn new_memory(&self) -> ConversationMemory {
        ConversationMemory::new(self.settings.qa.max_history_turns)
    }

    /// Transcribe and index `url`, then answer `question` against it.
    #[instrument(skip(self, memory))]
    pub async fn answer(
        &self,
        url: &str,
        question: &str,
        memory: &mut ConversationMemory,
    ) -> Result<QaAnswer> {
        let url = url.trim();
        if url.is_empty() {
            return Err(VidqaError::InvalidInput("URL is empty".to_string()));
        }
        if question.trim().is_empty() {
            return Err(VidqaError::InvalidInput("Question is empty".to_string()));
        }
        // Fail before the expensive download
        let _: Backend = self.settings.vector_store.backend.parse()?;

        let _guard = self.run_lock.lock().await;

        info!("Loading transcript");
        let documents = self.loader.load(url).await?;
        info!("Loaded {} transcript documents", documents.len());

        let splitter = RecursiveCharacterSplitter::from_settings(&self.settings.splitter)?;
        let indexer = Indexer::new(splitter, self.embedder.clone(), self.settings.data_dir());
        let store = indexer
            .index(&documents, &self.settings.vector_store.backend)
            .await?;

        let retriever =
            Retriever::new(store, self.embedder.clone()).with_top_k(self.settings.qa.top_k);
        let qa = ConversationalQa::new(self.qa_model.clone(), retriever, self.prompts.clone());

        qa.ask(memory, question).await
    }

    /// Transcribe `url` and summarize it.
    #[instrument(skip(self))]
    pub async fn summarize(&self, url: &str) -> Result<Summary> {
        let url = url.trim();
        if url.is_empty() {
            return Err(VidqaError::InvalidInput("URL is empty".to_string()));
        }

        let documents = self.loader.load(url).await?;
        let summarizer = Summarizer::new(
            self.summary_model.clone(),
            self.prompts.clone(),
            &self.settings.summarize,
        );
        summarizer.summarize(&documents).await
    }
}
