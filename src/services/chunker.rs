//! Recursive hierarchical text splitter.
//!
//! Splits a document into parent spans, then re-runs the same algorithm on
//! each parent to produce child spans. Splitting walks a prioritized separator
//! list (paragraph break, newline, CJK and Latin sentence terminators,
//! semicolons, commas, space) and falls back to character windows when no
//! separator partitions the text. Adjacent spans receive an injected overlap
//! prefix taken from the tail of their predecessor.
//!
//! Positions are half-open character offsets into the source document. Spans
//! that carry an injected overlap prefix are re-located by substring search
//! with a midpoint probe as fallback; positions are advisory for display and
//! must not be treated as identity.

use crate::domain::errors::DomainResult;
use crate::domain::models::chunk::ChunkStrategy;

/// Separator priority, most to least semantic. The empty string marks the
/// character-window fallback.
const SEPARATORS: &[&str] = &[
    "\n\n", "\n", "。", "！", "？", ".", "!", "?", ";", "；", ",", "，", " ", "",
];

/// A located text span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub content: String,
    pub start: usize,
    pub end: usize,
}

/// A parent span with its ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSpan {
    pub content: String,
    pub start: usize,
    pub end: usize,
    pub children: Vec<Span>,
}

/// Recursive hierarchical splitter for one strategy.
pub struct Chunker {
    strategy: ChunkStrategy,
}

impl Chunker {
    pub fn new(strategy: ChunkStrategy) -> DomainResult<Self> {
        strategy.validate()?;
        Ok(Self { strategy })
    }

    pub fn strategy(&self) -> &ChunkStrategy {
        &self.strategy
    }

    /// Split a document into parent spans, each carrying its child spans.
    pub fn chunk_document(&self, text: &str) -> Vec<ParentSpan> {
        if text.is_empty() {
            return Vec::new();
        }

        let total = char_len(text);
        if total <= self.strategy.child_chunk_size {
            return vec![ParentSpan {
                content: text.to_string(),
                start: 0,
                end: total,
                children: vec![Span {
                    content: text.to_string(),
                    start: 0,
                    end: total,
                }],
            }];
        }

        let parent_contents = split_with_overlap(
            text,
            self.strategy.parent_chunk_size,
            self.strategy.parent_overlap(),
        );

        let mut parents = Vec::with_capacity(parent_contents.len());
        let mut cursor = 0usize;
        for content in parent_contents {
            let (start, end) = locate_span(text, &content, cursor);
            cursor = start.saturating_add(1);
            let children = self.chunk_children(&content, start);
            parents.push(ParentSpan {
                content,
                start,
                end,
                children,
            });
        }
        parents
    }

    fn chunk_children(&self, parent_content: &str, parent_start: usize) -> Vec<Span> {
        let contents = split_with_overlap(
            parent_content,
            self.strategy.child_chunk_size,
            self.strategy.child_overlap(),
        );

        let mut children = Vec::with_capacity(contents.len());
        let mut cursor = 0usize;
        for content in contents {
            let (rel_start, rel_end) = locate_span(parent_content, &content, cursor);
            cursor = rel_start.saturating_add(1);
            children.push(Span {
                content,
                start: parent_start + rel_start,
                end: parent_start + rel_end,
            });
        }
        children
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` into spans of at most `size` characters, then inject the
/// overlap prefix between adjacent spans.
fn split_with_overlap(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let (mut spans, separator) = split_at_level(text, size, overlap, 0);
    // Character windows already step with overlap built in.
    if overlap > 0 && spans.len() > 1 && !separator.is_empty() {
        inject_overlap(&mut spans, overlap, separator);
    }
    spans
}

/// Walk separators from `start_index`, returning the spans and the separator
/// that partitioned the text at this level.
fn split_at_level(
    text: &str,
    size: usize,
    overlap: usize,
    start_index: usize,
) -> (Vec<String>, &'static str) {
    if char_len(text) <= size {
        return (vec![text.to_string()], "");
    }

    for index in start_index..SEPARATORS.len() {
        let separator = SEPARATORS[index];
        if separator.is_empty() {
            return (split_by_characters(text, size, overlap), "");
        }

        let fragments: Vec<&str> = text.split_inclusive(separator).collect();
        if fragments.len() <= 1 {
            continue;
        }

        return (
            accumulate_fragments(&fragments, size, overlap, index),
            separator,
        );
    }

    // The empty-string fallback above always returns.
    (vec![text.to_string()], "")
}

/// Greedily pack adjacent fragments into spans of at most `size` characters.
/// A single fragment larger than `size` is re-split with the next separator.
fn accumulate_fragments(
    fragments: &[&str],
    size: usize,
    overlap: usize,
    separator_index: usize,
) -> Vec<String> {
    let mut spans = Vec::new();
    let mut acc = String::new();
    let mut acc_len = 0usize;

    for fragment in fragments {
        let fragment_len = char_len(fragment);

        if fragment_len > size {
            if acc_len > 0 {
                spans.push(std::mem::take(&mut acc));
                acc_len = 0;
            }
            let (sub_spans, _) = split_at_level(fragment, size, overlap, separator_index + 1);
            spans.extend(sub_spans);
            continue;
        }

        if acc_len > 0 && acc_len + fragment_len > size {
            spans.push(std::mem::take(&mut acc));
            acc_len = 0;
        }

        acc.push_str(fragment);
        acc_len += fragment_len;
    }

    if acc_len > 0 {
        spans.push(acc);
    }

    spans
}

/// Character-window fallback with overlap stepping. A non-positive step would
/// loop forever, so the remaining text is emitted as a single chunk instead.
fn split_by_characters(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let step = size.saturating_sub(overlap);
    if step == 0 {
        tracing::warn!(
            chunk_size = size,
            overlap,
            "overlap leaves no forward step; emitting remaining text as one chunk"
        );
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        spans.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    spans
}

/// Prepend to each non-first span the last `overlap` characters of its
/// predecessor, trimmed at the first separator occurrence so the injected
/// prefix starts on a semantic boundary.
fn inject_overlap(spans: &mut [String], overlap: usize, separator: &str) {
    let originals: Vec<String> = spans.to_vec();
    for i in 1..spans.len() {
        let tail = overlap_tail(&originals[i - 1], overlap, separator);
        if !tail.is_empty() {
            spans[i] = format!("{tail}{}", spans[i]);
        }
    }
}

fn overlap_tail(previous: &str, overlap: usize, separator: &str) -> String {
    let chars: Vec<char> = previous.chars().collect();
    let start = chars.len().saturating_sub(overlap);
    let tail: String = chars[start..].iter().collect();
    if let Some(position) = tail.find(separator) {
        return tail[position + separator.len()..].to_string();
    }
    tail
}

/// Locate `span` inside `source`, preferring matches at or after `from_char`.
/// Returns half-open character offsets, best-effort.
fn locate_span(source: &str, span: &str, from_char: usize) -> (usize, usize) {
    let span_len = char_len(span);
    if span_len == 0 {
        return (from_char, from_char);
    }

    if let Some(start) = find_from(source, span, from_char) {
        return (start, start + span_len);
    }
    if let Some(start) = find_from(source, span, 0) {
        return (start, start + span_len);
    }

    // Midpoint probe: match a short window from the middle of the span and
    // extrapolate its start.
    let probe_len = (span_len / 2).clamp(1, 32);
    let probe_start = (span_len / 2).saturating_sub(probe_len / 2);
    let probe: String = span.chars().skip(probe_start).take(probe_len).collect();
    let total = char_len(source);
    if let Some(probe_position) = find_from(source, &probe, 0) {
        let start = probe_position.saturating_sub(probe_start).min(total);
        let end = (start + span_len).min(total);
        return (start, end);
    }

    let start = from_char.min(total);
    (start, (start + span_len).min(total))
}

/// Find `needle` in `source` at or after the given character offset, returning
/// the match's character offset.
fn find_from(source: &str, needle: &str, from_char: usize) -> Option<usize> {
    let byte_from = char_to_byte(source, from_char)?;
    source[byte_from..].find(needle).map(|relative| {
        let absolute = byte_from + relative;
        source[..absolute].chars().count()
    })
}

fn char_to_byte(source: &str, char_offset: usize) -> Option<usize> {
    if char_offset == 0 {
        return Some(0);
    }
    match source.char_indices().nth(char_offset) {
        Some((byte, _)) => Some(byte),
        None if char_len(source) == char_offset => Some(source.len()),
        None => None,
    }
}
