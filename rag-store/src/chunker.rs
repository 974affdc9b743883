//! Deterministic text chunking with character offsets.
//!
//! Offsets and sizes are counted in Unicode scalar values (`char`), never bytes,
//! so multi-byte text is cut on valid boundaries.

use serde::Serialize;
use tracing::debug;

use crate::config::{ChunkStrategy, ChunkingConfig};
use crate::errors::RagError;

/// A contiguous span of the source text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub text: String,
    /// Position in the document's chunk sequence, starting at 0.
    pub index: usize,
    /// Inclusive start, in chars.
    pub char_start: usize,
    /// Exclusive end, in chars.
    pub char_end: usize,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Fixed-window chunking: chunk `i` starts at `i * (size - overlap)` and spans
/// at most `size` chars.
///
/// Whitespace-only input yields an empty vector.
///
/// # Errors
/// [`RagError::InvalidConfiguration`] if `size == 0` or `overlap >= size`.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Vec<Chunk>, RagError> {
    chunk_with(
        text,
        &ChunkingConfig {
            size,
            overlap,
            strategy: ChunkStrategy::Fixed,
        },
    )
}

/// Chunks `text` using the strategy in `cfg`.
pub fn chunk_with(text: &str, cfg: &ChunkingConfig) -> Result<Vec<Chunk>, RagError> {
    cfg.validate()?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    // bounds[i] = byte offset of char i; bounds[n] = text.len()
    let mut bounds: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    let n = bounds.len();
    bounds.push(text.len());

    let spans = match cfg.strategy {
        ChunkStrategy::Fixed => fixed_spans(n, cfg.size, cfg.overlap),
        ChunkStrategy::Sentence => {
            let chars: Vec<char> = text.chars().collect();
            sentence_spans(&chars, cfg.size, cfg.overlap)
        }
    };

    let chunks: Vec<Chunk> = spans
        .into_iter()
        .enumerate()
        .map(|(index, (s, e))| Chunk {
            text: text[bounds[s]..bounds[e]].to_string(),
            index,
            char_start: s,
            char_end: e,
        })
        .collect();

    debug!(
        chars = n,
        size = cfg.size,
        overlap = cfg.overlap,
        strategy = ?cfg.strategy,
        chunks = chunks.len(),
        "chunked text"
    );
    Ok(chunks)
}

fn fixed_spans(n: usize, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let step = size - overlap;
    let mut out = Vec::with_capacity(n / step + 1);
    let mut start = 0usize;
    loop {
        let end = (start + size).min(n);
        out.push((start, end));
        if end == n {
            break;
        }
        start += step;
    }
    out
}

/// Greedy sentence packing.
///
/// Cut points are sentence ends (`.`, `!`, `?` followed by whitespace) and line
/// breaks; runs longer than `size - overlap` get hard cuts. Each chunk ends on the last cut
/// point that fits, and the next one starts at the earliest cut point inside the
/// last `overlap` chars, so overlap is made of whole sentences. A chunk always
/// adds text past the previous chunk's end; if the carried overlap leaves no room
/// for that, the overlap is dropped.
fn sentence_spans(chars: &[char], size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let n = chars.len();
    let cuts = cut_points(chars, size - overlap);

    let mut out = Vec::new();
    let mut start = 0usize;
    let mut prev_end = 0usize;
    loop {
        let mut end = last_cut_at_most(&cuts, start + size);
        if end <= prev_end {
            start = prev_end;
            end = last_cut_at_most(&cuts, start + size);
        }
        if end <= start {
            end = (start + size).min(n);
        }
        out.push((start, end));
        if end == n {
            break;
        }

        let k = cuts.partition_point(|&c| c < end.saturating_sub(overlap));
        start = match cuts.get(k) {
            Some(&c) if c > start && c < end => c,
            _ => end,
        };
        prev_end = end;
    }
    out
}

fn last_cut_at_most(cuts: &[usize], limit: usize) -> usize {
    match cuts.partition_point(|&c| c <= limit) {
        0 => 0,
        i => cuts[i - 1],
    }
}

/// Sorted cut points in `(0, n]`, always ending with `n`, no gap wider than `max_gap`.
fn cut_points(chars: &[char], max_gap: usize) -> Vec<usize> {
    let n = chars.len();
    let mut natural = Vec::new();
    let mut i = 0usize;
    while i < n {
        let c = chars[i];
        if c == '\n' {
            natural.push(i + 1);
        } else if matches!(c, '.' | '!' | '?')
            && chars.get(i + 1).is_none_or(|next| next.is_whitespace())
        {
            let mut j = i + 1;
            while j < n && chars[j].is_whitespace() && chars[j] != '\n' {
                j += 1;
            }
            natural.push(j);
            i = j;
            continue;
        }
        i += 1;
    }
    if natural.last() != Some(&n) {
        natural.push(n);
    }

    let mut cuts = Vec::with_capacity(natural.len());
    let mut prev = 0usize;
    for c in natural {
        if c <= prev {
            continue;
        }
        while c - prev > max_gap {
            prev += max_gap;
            cuts.push(prev);
        }
        cuts.push(c);
        prev = c;
    }
    cuts
}
