//! Structure-aware document chunking.
//!
//! Provides the `Chunker` trait and the `StructuredChunker` implementation,
//! which splits teaching material along chapter/section markers before
//! falling back to size-bounded paragraph and sentence packing.

use regex::Regex;
use std::sync::OnceLock;

use super::config::ChunkingConfig;
use super::types::Chunk;

/// Metadata key recording how a chunk was produced.
pub const SPLIT_KEY: &str = "split";

static CHAPTER_PATTERN: OnceLock<Regex> = OnceLock::new();
static SECTION_PATTERN: OnceLock<Regex> = OnceLock::new();
static PARAGRAPH_BREAK: OnceLock<Regex> = OnceLock::new();

fn chapter_pattern() -> &'static Regex {
    CHAPTER_PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^(?:Chapter|CHAPTER|Unit|UNIT)[ \t]+(\d+)[:. \t]*(.*)")
            .expect("chapter pattern is valid")
    })
}

fn section_pattern() -> &'static Regex {
    SECTION_PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^(?:Section[ \t]+)?(\d+\.\d+)[:. \t]*(.*)")
            .expect("section pattern is valid")
    })
}

fn paragraph_break() -> &'static Regex {
    PARAGRAPH_BREAK.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph pattern is valid"))
}

/// Trait for document chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split document text into ordered chunks.
    fn chunk(&self, text: &str) -> Vec<Chunk>;
}

/// How a segment was turned into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// The segment fit within the size budget.
    Whole,
    /// Packed by blank-line separated paragraphs.
    Paragraph,
    /// Packed by sentence boundaries.
    Sentence,
}

impl SplitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whole => "whole",
            Self::Paragraph => "paragraph",
            Self::Sentence => "sentence",
        }
    }
}

/// A structural marker found at the start of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Marker {
    Chapter { number: String, title: String },
    Section { number: String, title: String },
}

impl Marker {
    fn label(&self) -> String {
        let (kind, number, title) = match self {
            Self::Chapter { number, title } => ("Chapter", number, title),
            Self::Section { number, title } => ("Section", number, title),
        };
        if title.is_empty() {
            format!("{kind} {number}")
        } else {
            format!("{kind} {number}: {title}")
        }
    }
}

/// A contiguous span of text between markers.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment<'a> {
    text: &'a str,
    chapter: Option<String>,
    section: Option<String>,
}

/// Chunker that respects chapter and section boundaries.
///
/// Algorithm:
/// 1. Find chapter and section markers (line-anchored) and order them by offset
/// 2. Cut the text at every marker, carrying the current chapter forward
/// 3. Re-split oversized segments by paragraphs, then sentences, with overlap
/// 4. Number the resulting chunks with one running counter
#[derive(Debug, Clone, Default)]
pub struct StructuredChunker {
    config: ChunkingConfig,
}

impl StructuredChunker {
    /// Create a chunker with the given size limits.
    ///
    /// Limits that fail [`ChunkingConfig::validate`] are clamped: `chunk_size`
    /// to at least 1 and `chunk_overlap` to below `chunk_size`, so the overlap
    /// seed can never carry a whole previous chunk forward.
    pub fn new(config: ChunkingConfig) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!(target: "chunker", "clamping chunking limits: {e}");
        }
        let chunk_size = config.chunk_size.max(1);
        let chunk_overlap = config.chunk_overlap.min(chunk_size - 1);
        Self {
            config: ChunkingConfig::new(chunk_size, chunk_overlap),
        }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    fn split_by_size(&self, text: &str) -> (Vec<String>, SplitStrategy) {
        let paragraphs: Vec<&str> = paragraph_break()
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if paragraphs.len() > 1 {
            let packed = pack(&paragraphs, "\n\n", &self.config);
            if !packed.is_empty() {
                return (packed, SplitStrategy::Paragraph);
            }
        }

        let sentences = split_sentences(text);
        let packed = pack(&sentences, " ", &self.config);
        if !packed.is_empty() {
            return (packed, SplitStrategy::Sentence);
        }

        (vec![text.to_string()], SplitStrategy::Whole)
    }
}

impl Chunker for StructuredChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        let segments = split_segments(text);
        let mut chunks = Vec::new();

        for segment in &segments {
            let (pieces, strategy) = if char_len(segment.text) > self.config.chunk_size {
                self.split_by_size(segment.text)
            } else {
                (vec![segment.text.to_string()], SplitStrategy::Whole)
            };

            for piece in pieces {
                let mut chunk = Chunk::new(piece, chunks.len())
                    .with_labels(segment.chapter.clone(), segment.section.clone());
                chunk
                    .metadata
                    .insert(SPLIT_KEY.to_string(), strategy.as_str().to_string());
                chunks.push(chunk);
            }
        }

        tracing::debug!(
            target: "chunker",
            "split {} chars into {} segments, {} chunks",
            text.len(),
            segments.len(),
            chunks.len()
        );

        chunks
    }
}

/// Collect chapter and section markers ordered by their byte offset.
fn find_markers(text: &str) -> Vec<(usize, Marker)> {
    let mut markers: Vec<(usize, Marker)> = chapter_pattern()
        .captures_iter(text)
        .map(|caps| {
            let start = caps.get(0).map_or(0, |m| m.start());
            let marker = Marker::Chapter {
                number: caps[1].to_string(),
                title: caps[2].trim().to_string(),
            };
            (start, marker)
        })
        .collect();

    markers.extend(section_pattern().captures_iter(text).map(|caps| {
        let start = caps.get(0).map_or(0, |m| m.start());
        let marker = Marker::Section {
            number: caps[1].to_string(),
            title: caps[2].trim().to_string(),
        };
        (start, marker)
    }));

    // Stable sort keeps a chapter ahead of a section at the same offset.
    markers.sort_by_key(|(start, _)| *start);
    markers
}

/// Cut text at every marker, labelling each span.
fn split_segments(text: &str) -> Vec<Segment<'_>> {
    let markers = find_markers(text);

    let Some((first_offset, _)) = markers.first() else {
        let whole = text.trim();
        if whole.is_empty() {
            return Vec::new();
        }
        return vec![Segment {
            text: whole,
            chapter: None,
            section: None,
        }];
    };

    let mut segments = Vec::with_capacity(markers.len() + 1);

    let leading = text[..*first_offset].trim();
    if !leading.is_empty() {
        segments.push(Segment {
            text: leading,
            chapter: None,
            section: None,
        });
    }

    let mut current_chapter: Option<String> = None;
    for (i, (start, marker)) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(text.len(), |(next, _)| *next);
        let body = text[*start..end].trim();

        let section = match marker {
            Marker::Chapter { .. } => {
                current_chapter = Some(marker.label());
                None
            }
            Marker::Section { .. } => Some(marker.label()),
        };

        segments.push(Segment {
            text: body,
            chapter: current_chapter.clone(),
            section,
        });
    }

    segments
}

/// Split text after `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(boundary, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }

        let sentence = text[start..boundary].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }

        while chars.peek().is_some_and(|(_, w)| w.is_whitespace()) {
            chars.next();
        }
        start = chars.peek().map_or(text.len(), |(offset, _)| *offset);
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }

    sentences
}

/// Greedily pack pieces into chunks of at most `chunk_size` characters.
///
/// A new chunk starts with the last `chunk_overlap` characters of the previous
/// buffer. The tail is cut on a character boundary, not a word boundary.
fn pack(pieces: &[&str], separator: &str, config: &ChunkingConfig) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        if !current.is_empty()
            && char_len(&current) + char_len(piece) + separator_len > config.chunk_size
        {
            chunks.push(current.trim().to_string());

            let tail = overlap_tail(&current, config.chunk_overlap);
            current = if tail.is_empty() {
                piece.to_string()
            } else {
                format!("{tail}{separator}{piece}")
            };
        } else if current.is_empty() {
            current.push_str(piece);
        } else {
            current.push_str(separator);
            current.push_str(piece);
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// Last `overlap` characters of `buffer`, clamped to the buffer length.
fn overlap_tail(buffer: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    let total = char_len(buffer);
    if total <= overlap {
        return buffer;
    }
    let start = buffer
        .char_indices()
        .nth(total - overlap)
        .map_or(0, |(offset, _)| offset);
    &buffer[start..]
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
