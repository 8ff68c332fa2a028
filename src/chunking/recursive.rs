//! Recursive character splitting.
//!
//! Text is cut on the first separator (in preference order) that occurs in it.
//! Pieces that are still too long are cut again with the next separator, and
//! short neighbouring pieces are merged back up to the chunk size, keeping a
//! tail of the previous chunk as overlap. Separators stay attached to the piece
//! that follows them, so every chunk is a literal substring of the input.

use super::Split;
use crate::config::SplitterSettings;
use crate::error::{Result, VidqaError};
use std::collections::VecDeque;
use tracing::warn;

/// Paragraph, line, word, character.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Splits text into overlapping chunks of bounded length.
///
/// Lengths are counted in characters, not bytes.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

/// A contiguous slice of the input, with its byte offset.
#[derive(Debug, Clone, Copy)]
struct Piece<'a> {
    start: usize,
    text: &'a str,
    chars: usize,
}

impl<'a> Piece<'a> {
    fn new(start: usize, text: &'a str) -> Self {
        Self {
            start,
            text,
            chars: text.chars().count(),
        }
    }

    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separators.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(VidqaError::InvalidInput("chunk size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(VidqaError::InvalidInput(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_settings(settings: &SplitterSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    /// Replace the separator list. An empty string means "split anywhere".
    pub fn with_separators<S: Into<String>>(mut self, separators: impl IntoIterator<Item = S>) -> Self {
        self.separators = separators.into_iter().map(Into::into).collect();
        if self.separators.is_empty() {
            self.separators.push(String::new());
        }
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks. Each returned [`Split`] borrows from `text`.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<Split<'a>> {
        let mut out = Vec::new();
        self.split_recursive(text, Piece::new(0, text), &self.separators, &mut out);
        out
    }

    fn split_recursive<'a>(
        &self,
        root: &'a str,
        piece: Piece<'a>,
        separators: &[String],
        out: &mut Vec<Split<'a>>,
    ) {
        let (separator, rest) = choose_separator(piece.text, separators);
        let pieces = split_on(piece, separator);

        let mut good: Vec<Piece<'a>> = Vec::new();
        for p in pieces {
            if p.chars < self.chunk_size {
                good.push(p);
                continue;
            }

            if !good.is_empty() {
                self.merge(root, &good, out);
                good.clear();
            }

            if rest.is_empty() {
                push_trimmed(root, p.start, p.end(), out);
            } else {
                self.split_recursive(root, p, rest, out);
            }
        }

        if !good.is_empty() {
            self.merge(root, &good, out);
        }
    }

    /// Merge consecutive pieces into chunks of at most `chunk_size` characters.
    fn merge<'a>(&self, root: &'a str, pieces: &[Piece<'a>], out: &mut Vec<Split<'a>>) {
        let mut current: VecDeque<Piece<'a>> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            if total + piece.chars > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }

                if let (Some(first), Some(last)) = (current.front(), current.back()) {
                    push_trimmed(root, first.start, last.end(), out);

                    // Keep a tail no longer than the overlap that still leaves room
                    while total > self.chunk_overlap
                        || (total + piece.chars > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(dropped) => total -= dropped.chars,
                            None => break,
                        }
                    }
                }
            }

            current.push_back(*piece);
            total += piece.chars;
        }

        if let (Some(first), Some(last)) = (current.front(), current.back()) {
            push_trimmed(root, first.start, last.end(), out);
        }
    }
}

/// First separator present in `text`, plus the finer separators after it.
fn choose_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    let mut chosen: (&str, &[String]) = (separators.last().map(String::as_str).unwrap_or(""), &[]);

    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            chosen = ("", &[]);
            break;
        }
        if text.contains(sep.as_str()) {
            chosen = (sep.as_str(), &separators[i + 1..]);
            break;
        }
    }

    chosen
}

/// Cut a piece before every occurrence of `separator`; empty means per character.
fn split_on<'a>(piece: Piece<'a>, separator: &str) -> Vec<Piece<'a>> {
    let text = piece.text;

    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| Piece::new(piece.start + i, &text[i..i + c.len_utf8()]))
            .collect();
    }

    let mut bounds: Vec<usize> = text.match_indices(separator).map(|(i, _)| i).collect();
    bounds.push(text.len());

    let mut pieces = Vec::with_capacity(bounds.len());
    let mut from = 0;
    for to in bounds {
        if to > from {
            pieces.push(Piece::new(piece.start + from, &text[from..to]));
        }
        from = to;
    }
    pieces
}

/// Emit `root[start..end]` with surrounding whitespace removed, unless blank.
fn push_trimmed<'a>(root: &'a str, start: usize, end: usize, out: &mut Vec<Split<'a>>) {
    let raw = &root[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let leading = raw.len() - raw.trim_start().len();
    out.push(Split {
        start_index: start + leading,
        text: trimmed,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(splits: &[Split<'a>]) -> Vec<&'a str> {
        splits.iter().map(|s| s.text).collect()
    }

    /// Several paragraphs of varied sentences, roughly `paragraphs * 600` chars.
    fn transcript(paragraphs: usize) -> String {
        let words = [
            "alignment", "reward", "model", "policy", "gradient", "human", "feedback",
            "the", "of", "and", "we", "think", "training", "data", "ChatGPT", "über",
        ];
        (0..paragraphs)
            .map(|p| {
                (0..90)
                    .map(|w| words[(p * 7 + w * 3) % words.len()])
                    .collect::<Vec<_>>()
                    .join(" ")
                    + "."
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(RecursiveCharacterSplitter::new(0, 0).is_err());
        assert!(RecursiveCharacterSplitter::new(100, 100).is_err());
        assert!(RecursiveCharacterSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = RecursiveCharacterSplitter::new(1500, 150).unwrap();
        let splits = splitter.split_text("  Hello there.\n\nGeneral Kenobi.  ");
        assert_eq!(texts(&splits), vec!["Hello there.\n\nGeneral Kenobi."]);
        assert_eq!(splits[0].start_index, 2);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        let splitter = RecursiveCharacterSplitter::new(10, 2).unwrap();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let splitter = RecursiveCharacterSplitter::new(20, 5).unwrap();
        let splits = splitter.split_text("aaaa bbbb cccc dddd\n\neeee ffff gggg hhhh");
        assert_eq!(texts(&splits), vec!["aaaa bbbb cccc dddd", "eeee ffff gggg hhhh"]);
    }

    #[test]
    fn test_word_level_overlap() {
        let splitter = RecursiveCharacterSplitter::new(10, 4).unwrap();
        let splits = splitter.split_text("aaa bbb ccc ddd eee");
        assert_eq!(texts(&splits), vec!["aaa bbb", "bbb ccc", "ccc ddd", "ddd eee"]);
    }

    #[test]
    fn test_character_fallback_has_exact_overlap() {
        let text: String = "abcdefghij".repeat(400);
        let splitter = RecursiveCharacterSplitter::new(1500, 150).unwrap();
        let splits = splitter.split_text(&text);

        let starts: Vec<usize> = splits.iter().map(|s| s.start_index).collect();
        assert_eq!(starts, vec![0, 1350, 2700]);

        for pair in splits.windows(2) {
            let prev_end = pair[0].start_index + pair[0].text.len();
            assert_eq!(prev_end - pair[1].start_index, 150);
        }
        assert_eq!(splits.last().unwrap().text.len(), 1300);
    }

    #[test]
    fn test_chunks_are_bounded_and_reconstruct_the_text() {
        let text = transcript(40);
        let splitter = RecursiveCharacterSplitter::new(1500, 150).unwrap();
        let splits = splitter.split_text(&text);
        assert!(splits.len() > 1);

        let mut covered = vec![false; text.len()];
        for split in &splits {
            assert!(split.text.chars().count() <= 1500);
            // Each chunk is the source text at its recorded offset
            assert_eq!(&text[split.start_index..split.start_index + split.text.len()], split.text);
            for flag in &mut covered[split.start_index..split.start_index + split.text.len()] {
                *flag = true;
            }
        }

        // Only whitespace may fall between chunks
        for (i, c) in text.char_indices() {
            assert!(covered[i] || c.is_whitespace(), "uncovered {:?} at {}", c, i);
        }
    }

    #[test]
    fn test_adjacent_overlap_never_exceeds_configured() {
        let text = transcript(3).replace("\n\n", " ");
        let splitter = RecursiveCharacterSplitter::new(300, 40).unwrap();
        let splits = splitter.split_text(&text);
        assert!(splits.len() > 2);

        let mut saw_overlap = false;
        for pair in splits.windows(2) {
            let prev_end = pair[0].start_index + pair[0].text.len();
            assert!(pair[1].start_index >= pair[0].start_index);
            if prev_end > pair[1].start_index {
                let shared = text[pair[1].start_index..prev_end].chars().count();
                assert!(shared <= 40, "overlap of {} chars", shared);
                saw_overlap = true;
            }
        }
        assert!(saw_overlap);
    }

    #[test]
    fn test_custom_separators() {
        let splitter = RecursiveCharacterSplitter::new(8, 0)
            .unwrap()
            .with_separators(["|", ""]);
        let splits = splitter.split_text("abc|def|ghi");
        assert_eq!(texts(&splits), vec!["abc|def", "|ghi"]);
    }
}
