//! Similarity retrieval for questions.

use super::Source;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Finds the transcript chunks closest to a query.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            top_k: 4,
        }
    }

    /// Set the number of chunks returned per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// The `top_k` most similar chunks, best first.
    #[instrument(skip(self), fields(collection = %self.store.collection()))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Source>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self
            .store
            .similarity_search(&query_embedding, self.top_k)
            .await?;

        debug!("Retrieved {} chunks", results.len());
        Ok(results.into_iter().map(Source::from).collect())
    }
}

/// Join source texts into the context block of the answer prompt.
pub fn format_context(sources: &[Source]) -> String {
    sources
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEmbedder;
    use crate::vector_store::{test_entry, Distance, MemoryVectorStore};

    #[tokio::test]
    async fn test_retrieve_returns_top_k_best_first() {
        let embedder = Arc::new(MockEmbedder::new(32));
        let store = Arc::new(MemoryVectorStore::new("youtube_docs", Distance::Cosine));
        let texts = [
            "the borrow checker rejects aliasing",
            "cargo builds crates",
            "the borrow checker and lifetimes",
        ];
        let entries: Vec<_> = texts
            .iter()
            .map(|t| test_entry(t, embedder.vector(t)))
            .collect();
        store.add(&entries).await.unwrap();

        let retriever = Retriever::new(store, embedder).with_top_k(2);
        let sources = retriever.retrieve("borrow checker").await.unwrap();

        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|s| s.text.contains("borrow checker")));
        assert!(sources[0].score >= sources[1].score);
        assert_eq!(sources[0].url, "https://www.youtube.com/watch?v=nM_3d37lmcM&t=0s");
        assert_eq!(sources[0].timestamp, "00:00");
    }

    #[test]
    fn test_format_context_joins_texts() {
        let source = |text: &str| Source {
            text: text.to_string(),
            title: None,
            timestamp: "00:00".to_string(),
            url: String::new(),
            score: 1.0,
        };
        assert_eq!(format_context(&[source("one"), source("two")]), "one\n\ntwo");
    }
}
