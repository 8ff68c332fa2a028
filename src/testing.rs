//! Test doubles for the external services.

use crate::embedding::Embedder;
use crate::error::{Result, VidqaError};
use crate::llm::ChatMessage;
use crate::llm::ChatModel;
use crate::transcription::{Document, DocumentLoader, DocumentMetadata};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=nM_3d37lmcM";

/// Bag-of-words embedder: texts sharing words get similar vectors.
pub struct MockEmbedder {
    dimensions: usize,
    pub calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dimensions];
        for word in text.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if word.is_empty() {
                continue;
            }
            let bucket = word.bytes().fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % self.dimensions] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

type Handler = Box<dyn Fn(&[ChatMessage]) -> Result<String> + Send + Sync>;

/// Chat model whose replies come from a closure; records every request.
pub struct ScriptedChat {
    handler: Handler,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn new(handler: impl Fn(&[ChatMessage]) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fixed(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        (self.handler)(messages)
    }
}

/// Loader returning fixed documents for one URL.
pub struct StaticLoader {
    documents: Vec<Document>,
    pub loads: AtomicUsize,
}

impl StaticLoader {
    pub fn new(texts: &[&str]) -> Self {
        let documents = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Document::new(
                    *text,
                    DocumentMetadata {
                        source: VIDEO_URL.to_string(),
                        title: Some("Test Video".to_string()),
                        chunk: i,
                        start_seconds: i as f64 * 1200.0,
                        end_seconds: (i + 1) as f64 * 1200.0,
                    },
                )
            })
            .collect();

        Self {
            documents,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }
}

#[async_trait]
impl DocumentLoader for StaticLoader {
    async fn load(&self, url: &str) -> Result<Vec<Document>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if url.trim().is_empty() {
            return Err(VidqaError::InvalidInput("empty URL".to_string()));
        }
        Ok(self.documents.clone())
    }
}
