//! Indexing documents into a vector store.

use crate::chunking::RecursiveCharacterSplitter;
use crate::embedding::Embedder;
use crate::error::{Result, VidqaError};
use crate::transcription::Document;
use crate::vector_store::{open_store, Backend, Entry, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Splits, embeds and stores documents.
pub struct Indexer {
    splitter: RecursiveCharacterSplitter,
    embedder: Arc<dyn Embedder>,
    data_dir: PathBuf,
}

impl Indexer {
    pub fn new(
        splitter: RecursiveCharacterSplitter,
        embedder: Arc<dyn Embedder>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            splitter,
            embedder,
            data_dir: data_dir.into(),
        }
    }

    /// Index `documents` into the named backend and return a handle for search.
    ///
    /// The backend's collection is emptied first, so search only sees the
    /// chunks of `documents`.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub async fn index(&self, documents: &[Document], backend: &str) -> Result<Arc<dyn VectorStore>> {
        let backend: Backend = backend.parse()?;
        let profile = backend.profile();

        let chunks = self.splitter.split_documents(documents);
        if chunks.is_empty() {
            return Err(VidqaError::InvalidInput(
                "Transcript is empty, nothing to index".to_string(),
            ));
        }
        info!("Split {} documents into {} chunks", documents.len(), chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(VidqaError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let entries: Vec<Entry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Entry::from_chunk(chunk, embedding))
            .collect();

        let store = open_store(backend, &self.data_dir)?;
        let dropped = store.recreate()?;
        if dropped > 0 {
            debug!("Dropped {} entries from the previous run", dropped);
        }
        let added = store.add(&entries).await?;

        info!(
            "Indexed {} chunks into {} collection '{}'",
            added, backend, profile.collection
        );

        Ok(Arc::new(store))
    }
}
