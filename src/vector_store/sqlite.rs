//! SQLite-based vector store implementation.
//!
//! Similarity is computed in Rust over the collection's rows. Each collection
//! records its distance metric and, once the first entry lands, its embedding
//! dimensionality.

use super::{check_dimensions, rank, Distance, Entry, SearchResult, VectorStore};
use crate::error::{Result, VidqaError};
use crate::transcription::DocumentMetadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        distance TEXT NOT NULL,
        dimensions INTEGER,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS entries (
        id TEXT PRIMARY KEY,
        collection TEXT NOT NULL,
        content TEXT NOT NULL,
        start_index INTEGER NOT NULL,
        metadata_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_collection ON entries(collection);
"#;

/// SQLite-based vector store bound to one collection.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    collection: String,
    distance: Distance,
}

impl SqliteVectorStore {
    /// Open the store at `path`, creating the file and collection if needed.
    #[instrument(skip_all, fields(collection = collection))]
    pub fn open(path: &Path, collection: &str, distance: Distance) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self::init(conn, collection, distance)?;
        info!("Opened vector store at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(collection: &str, distance: Distance) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, collection, distance)
    }

    fn init(conn: Connection, collection: &str, requested: Distance) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;

        conn.execute(
            "INSERT OR IGNORE INTO collections (name, distance, dimensions, created_at) VALUES (?1, ?2, NULL, ?3)",
            params![collection, requested.to_string(), Utc::now().to_rfc3339()],
        )?;

        // An existing collection keeps the metric it was created with
        let stored: String = conn.query_row(
            "SELECT distance FROM collections WHERE name = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        let distance: Distance = stored.parse()?;
        if distance != requested {
            warn!(
                "Collection {} uses {} distance, ignoring requested {}",
                collection, distance, requested
            );
        }

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
            distance,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VidqaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Embedding dimensionality of the collection, if it holds any entries yet.
    pub fn dimensions(&self) -> Result<Option<usize>> {
        let conn = self.lock()?;
        Self::stored_dimensions(&conn, &self.collection)
    }

    fn stored_dimensions(conn: &Connection, collection: &str) -> Result<Option<usize>> {
        let dims: Option<i64> = conn
            .query_row(
                "SELECT dimensions FROM collections WHERE name = ?1",
                params![collection],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?
            .flatten();
        Ok(dims.map(|d| d as usize))
    }

    /// Drop every entry of the collection and forget its dimensionality.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub fn recreate(&self) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let deleted = tx.execute(
            "DELETE FROM entries WHERE collection = ?1",
            params![self.collection],
        )?;
        tx.execute(
            "UPDATE collections SET dimensions = NULL WHERE name = ?1",
            params![self.collection],
        )?;
        tx.commit()?;

        info!("Recreated collection {} ({} entries dropped)", self.collection, deleted);
        Ok(deleted)
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn load_entries(&self) -> Result<Vec<Entry>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, content, start_index, metadata_json, embedding, created_at
            FROM entries
            WHERE collection = ?1
            "#,
        )?;

        let rows = stmt.query_map(params![self.collection], |row| {
            let id: String = row.get(0)?;
            let content: String = row.get(1)?;
            let start_index: i64 = row.get(2)?;
            let metadata_json: String = row.get(3)?;
            let embedding: Vec<u8> = row.get(4)?;
            let created_at: String = row.get(5)?;
            Ok((id, content, start_index, metadata_json, embedding, created_at))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, text, start_index, metadata_json, embedding, created_at) = row?;
            let metadata: DocumentMetadata = serde_json::from_str(&metadata_json)?;

            entries.push(Entry {
                id: uuid::Uuid::parse_str(&id).unwrap_or_default(),
                text,
                start_index: start_index as usize,
                metadata,
                embedding: Self::bytes_to_embedding(&embedding),
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            });
        }

        Ok(entries)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    #[instrument(skip(self, entries), fields(collection = %self.collection, count = entries.len()))]
    async fn add(&self, entries: &[Entry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let current = Self::stored_dimensions(&conn, &self.collection)?;
        let dims = check_dimensions(current, entries)?;

        let tx = conn.unchecked_transaction()?;

        if current.is_none() {
            tx.execute(
                "UPDATE collections SET dimensions = ?1 WHERE name = ?2",
                params![dims.map(|d| d as i64), self.collection],
            )?;
        }

        for entry in entries {
            let metadata_json = serde_json::to_string(&entry.metadata)?;

            tx.execute(
                r#"
                INSERT INTO entries
                (id, collection, content, start_index, metadata_json, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    entry.id.to_string(),
                    self.collection,
                    entry.text,
                    entry.start_index as i64,
                    metadata_json,
                    Self::embedding_to_bytes(&entry.embedding),
                    entry.created_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Added {} entries to {}", entries.len(), self.collection);
        Ok(entries.len())
    }

    #[instrument(skip(self, query), fields(collection = %self.collection))]
    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if let Some(dims) = self.dimensions()? {
            if dims != query.len() {
                return Err(VidqaError::VectorStore(format!(
                    "Query has {} dimensions, collection {} has {}",
                    query.len(),
                    self.collection,
                    dims
                )));
            }
        }

        let results = rank(self.load_entries()?, query, self.distance, k);
        debug!("Found {} matching entries", results.len());
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
