//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{check_dimensions, rank, Distance, Entry, SearchResult, VectorStore};
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    dimensions: Option<usize>,
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    collection: String,
    distance: Distance,
    inner: RwLock<Inner>,
}

impl MemoryVectorStore {
    pub fn new(collection: impl Into<String>, distance: Distance) -> Self {
        Self {
            collection: collection.into(),
            distance,
            inner: RwLock::new(Inner::default()),
        }
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> VidqaError {
        VidqaError::VectorStore(format!("Store lock poisoned: {}", e))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add(&self, entries: &[Entry]) -> Result<usize> {
        let mut inner = self.inner.write().map_err(Self::poisoned)?;
        inner.dimensions = check_dimensions(inner.dimensions, entries)?;
        inner.entries.extend_from_slice(entries);
        Ok(entries.len())
    }

    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let inner = self.inner.read().map_err(Self::poisoned)?;
        Ok(rank(inner.entries.iter().cloned(), query, self.distance, k))
    }

    async fn count(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(Self::poisoned)?;
        Ok(inner.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_entry;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new("youtube_docs", Distance::Cosine);

        store
            .add(&[
                test_entry("Hello world", vec![1.0, 0.0, 0.0]),
                test_entry("Goodbye world", vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);

        let results = store.similarity_search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].entry.text, "Hello world");

        assert!(store.add(&[test_entry("bad", vec![1.0])]).await.is_err());
    }

    #[test]
    fn test_euclid_ranks_nearest_first() {
        let store = MemoryVectorStore::new("langchain", Distance::Euclid);

        tokio_test::block_on(async {
            store
                .add(&[
                    test_entry("far", vec![3.0, 4.0]),
                    test_entry("near", vec![0.0, 1.0]),
                ])
                .await
                .unwrap();

            let results = store.similarity_search(&[0.0, 0.0], 1).await.unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].entry.text, "near");
            assert!((results[0].score - 0.5).abs() < 1e-6);
        });
    }
}
