//! Splitting transcripts into overlapping chunks for indexing.

mod recursive;

pub use recursive::{RecursiveCharacterSplitter, DEFAULT_SEPARATORS};

use crate::transcription::{Document, DocumentMetadata};
use serde::{Deserialize, Serialize};

/// A chunk of text borrowed from a larger string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    /// Byte offset of `text` within the string that was split.
    pub start_index: usize,
    pub text: &'a str,
}

/// A bounded-length piece of a [`Document`], ready to embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Byte offset of `text` within the parent document's text.
    pub start_index: usize,
    /// Metadata of the parent document.
    pub metadata: DocumentMetadata,
}

impl RecursiveCharacterSplitter {
    /// Split every document, carrying document metadata onto its chunks.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.text).into_iter().map(move |split| Chunk {
                    text: split.text.to_string(),
                    start_index: split.start_index,
                    metadata: doc.metadata.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_documents_keeps_metadata_and_order() {
        let meta = |chunk: usize| DocumentMetadata {
            source: "https://www.youtube.com/watch?v=nM_3d37lmcM".to_string(),
            title: Some("Interview".to_string()),
            chunk,
            start_seconds: chunk as f64 * 1200.0,
            end_seconds: (chunk + 1) as f64 * 1200.0,
        };
        let docs = vec![
            Document::new("first piece of audio", meta(0)),
            Document::new("second piece of audio", meta(1)),
        ];

        let splitter = RecursiveCharacterSplitter::new(12, 0).unwrap();
        let chunks = splitter.split_documents(&docs);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first piece", "of audio", "second piece", "of audio"]);
        assert_eq!(chunks[1].metadata.chunk, 0);
        assert_eq!(chunks[2].metadata.chunk, 1);
        assert_eq!(chunks[3].start_index, 13);
    }
}
