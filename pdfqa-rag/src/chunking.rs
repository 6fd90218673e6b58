//! Paragraph-aware document chunking.
//!
//! Text is normalized, split into paragraphs (or sentences when the text has
//! no blank-line structure), and the resulting pieces are packed greedily into
//! chunks. Pieces are never split, so `chunk_size` is a soft target: a single
//! piece longer than `chunk_size` becomes a chunk of its own.
//!
//! Consecutive chunks overlap by whole pieces. When a chunk is closed, the
//! trailing pieces that fit within `chunk_overlap` are carried into the next
//! chunk.

use std::sync::LazyLock;

use regex::Regex;

/// Separator placed between pieces inside a chunk.
const PIECE_SEPARATOR: &str = "\n\n";

/// Length charged for joining a piece into a chunk.
const JOIN_COST: usize = PIECE_SEPARATOR.len();

static HORIZONTAL_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("horizontal whitespace pattern is valid"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern is valid"));

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank line pattern is valid"));

/// A strategy for splitting extracted text into chunk strings.
pub trait Chunker: Send + Sync {
    /// Split text into ordered chunks.
    ///
    /// Returns an empty `Vec` if the text is empty or whitespace only.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Packs paragraphs (or sentences) into overlapping chunks.
///
/// # Example
///
/// ```rust
/// use pdfqa_rag::{Chunker, ParagraphChunker};
///
/// let chunker = ParagraphChunker::new(500, 50);
/// let chunks = chunker.chunk("Leave Policy\n\nEmployees get 18 Annual Leaves per year.");
/// assert_eq!(chunks.len(), 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParagraphChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ParagraphChunker {
    /// Create a new `ParagraphChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: soft target for characters per chunk
    /// * `chunk_overlap`: character budget for pieces carried into the next chunk
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Collapse horizontal whitespace runs, cap blank lines at one, and trim.
///
/// Paragraph breaks (`\n\n`) survive normalization. The function is
/// idempotent.
pub fn normalize_whitespace(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = HORIZONTAL_WHITESPACE.replace_all(text, " ");
    let text = EXCESS_NEWLINES.replace_all(&text, PIECE_SEPARATOR);
    text.trim().to_string()
}

/// Split normalized text into the pieces that get packed into chunks.
///
/// Blank lines delimit paragraphs. Text with a single paragraph falls back to
/// sentence boundaries.
fn split_pieces(text: &str) -> Vec<&str> {
    let paragraphs: Vec<&str> =
        BLANK_LINE.split(text).map(str::trim).filter(|p| !p.is_empty()).collect();

    match paragraphs.as_slice() {
        [single] => split_sentences(single),
        _ => paragraphs,
    }
}

/// Split after `.`, `!` or `?` when followed by whitespace, dropping that whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = i + c.len_utf8();
        let mut resume = end;
        while let Some(&(j, w)) = chars.peek() {
            if !w.is_whitespace() {
                break;
            }
            resume = j + w.len_utf8();
            chars.next();
        }
        if resume > end {
            sentences.push(&text[start..end]);
            start = resume;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences.into_iter().filter(|s| !s.trim().is_empty()).collect()
}

fn piece_cost(piece: &str) -> usize {
    piece.chars().count() + JOIN_COST
}

/// Split `text` into overlapping, paragraph-aware chunks.
///
/// Output depends only on the three arguments.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return Vec::new();
    }

    let pieces = split_pieces(&text);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for piece in pieces {
        let cost = piece_cost(piece);
        if current_len + cost > chunk_size && !current.is_empty() {
            chunks.push(current.join(PIECE_SEPARATOR));
            current = overlap_seed(&current, chunk_overlap);
            current_len = current.iter().map(|p| piece_cost(p)).sum();
        }
        current.push(piece);
        current_len += cost;
    }

    if !current.is_empty() {
        chunks.push(current.join(PIECE_SEPARATOR));
    }
    chunks
}

/// Trailing whole pieces of a closed chunk that fit in the overlap budget.
fn overlap_seed<'a>(closed: &[&'a str], chunk_overlap: usize) -> Vec<&'a str> {
    let mut seed_len = 0;
    let mut taken = 0;
    for piece in closed.iter().rev() {
        let cost = piece_cost(piece);
        if seed_len + cost > chunk_overlap {
            break;
        }
        seed_len += cost;
        taken += 1;
    }
    closed[closed.len() - taken..].to_vec()
}
