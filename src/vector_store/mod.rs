//! Vector store abstraction for vidqa.
//!
//! Two named backends are supported, "qdrant" and "chroma". Both persist to a
//! SQLite file under the data directory; they differ in file location,
//! collection name and distance metric (see [`BackendProfile`]). Indexing
//! always starts from an empty collection, so a store only ever holds the
//! chunks of the last indexed video.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::error::{Result, VidqaError};
use crate::transcription::DocumentMetadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A chunk stored with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    /// Chunk text.
    pub text: String,
    /// Byte offset of the chunk within its source document.
    pub start_index: usize,
    /// Source document metadata.
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn from_chunk(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: chunk.text,
            start_index: chunk.start_index,
            metadata: chunk.metadata,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: Entry,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// How vectors are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    Cosine,
    Euclid,
}

impl Distance {
    /// Similarity between two vectors; higher means closer.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Distance::Cosine => cosine_similarity(a, b),
            Distance::Euclid => 1.0 / (1.0 + euclidean_distance(a, b)),
        }
    }
}

impl std::str::FromStr for Distance {
    type Err = VidqaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(Distance::Cosine),
            "euclid" => Ok(Distance::Euclid),
            other => Err(VidqaError::VectorStore(format!("Unknown distance: {}", other))),
        }
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Distance::Cosine => write!(f, "cosine"),
            Distance::Euclid => write!(f, "euclid"),
        }
    }
}

/// Named vector store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Qdrant,
    Chroma,
}

impl std::str::FromStr for Backend {
    type Err = VidqaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "qdrant" => Ok(Backend::Qdrant),
            "chroma" => Ok(Backend::Chroma),
            _ => Err(VidqaError::UnsupportedBackend(s.to_string())),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Qdrant => write!(f, "qdrant"),
            Backend::Chroma => write!(f, "chroma"),
        }
    }
}

/// Storage layout of a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendProfile {
    /// Store file, relative to the data directory.
    pub relative_path: &'static str,
    pub collection: &'static str,
    pub distance: Distance,
}

impl Backend {
    pub fn profile(&self) -> BackendProfile {
        match self {
            Backend::Qdrant => BackendProfile {
                relative_path: "qdrant/storage.sqlite",
                collection: "youtube_docs",
                distance: Distance::Cosine,
            },
            Backend::Chroma => BackendProfile {
                relative_path: "chroma/chroma.sqlite3",
                collection: "langchain",
                distance: Distance::Euclid,
            },
        }
    }

    /// Location of this backend's store file.
    pub fn store_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.profile().relative_path)
    }
}

/// Open (creating if needed) the on-disk store for `backend`.
pub fn open_store(backend: Backend, data_dir: &Path) -> Result<SqliteVectorStore> {
    let profile = backend.profile();
    SqliteVectorStore::open(&backend.store_path(data_dir), profile.collection, profile.distance)
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the collection this handle reads and writes.
    fn collection(&self) -> &str;

    /// Store new entries. Returns how many were written.
    async fn add(&self, entries: &[Entry]) -> Result<usize>;

    /// The `k` entries most similar to `query`, best first.
    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Number of entries in the collection.
    async fn count(&self) -> Result<usize>;
}

/// Validate that every entry matches the collection's dimensionality.
///
/// `expected` is `None` for an empty collection, in which case the first entry
/// fixes it. Returns the dimensionality in effect.
pub(crate) fn check_dimensions(expected: Option<usize>, entries: &[Entry]) -> Result<Option<usize>> {
    let mut dims = expected;
    for entry in entries {
        let len = entry.embedding.len();
        if len == 0 {
            return Err(VidqaError::VectorStore("Entry has an empty embedding".to_string()));
        }
        match dims {
            Some(d) if d != len => {
                return Err(VidqaError::VectorStore(format!(
                    "Embedding dimension mismatch: collection has {}, entry has {}",
                    d, len
                )));
            }
            Some(_) => {}
            None => dims = Some(len),
        }
    }
    Ok(dims)
}

/// Rank entries by similarity to `query` and keep the best `k`.
pub(crate) fn rank(
    entries: impl IntoIterator<Item = Entry>,
    query: &[f32],
    distance: Distance,
    k: usize,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = entries
        .into_iter()
        .map(|entry| {
            let score = distance.score(query, &entry.embedding);
            SearchResult { entry, score }
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(k);
    results
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Euclidean (L2) distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
pub(crate) fn test_entry(text: &str, embedding: Vec<f32>) -> Entry {
    Entry::from_chunk(
        Chunk {
            text: text.to_string(),
            start_index: 0,
            metadata: DocumentMetadata {
                source: "https://www.youtube.com/watch?v=nM_3d37lmcM".to_string(),
                title: Some("Test Video".to_string()),
                chunk: 0,
                start_seconds: 0.0,
                end_seconds: 30.0,
            },
        },
        embedding,
    )
}
