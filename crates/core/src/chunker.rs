//! Text → overlapping character windows aligned to sentence boundaries
//! (spec §4.3). Grounded on the teacher's `semantic.rs::extract_chunks`
//! size-bounded splitting loop, generalized from structural (blank-line)
//! boundaries to sentence boundaries.

/// One chunk as produced by [`chunk`] — just the ordinal and its text; the
/// caller (scheduler) attaches source metadata and embeddings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawChunk {
    pub ordinal: usize,
    pub text: String,
}

/// Tunable window parameters (defaults: 1000 chars / 200 overlap, spec §4.3).
#[derive(Clone, Copy, Debug)]
pub struct ChunkerConfig {
    pub target_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { target_chars: 1000, overlap_chars: 200 }
    }
}

/// Fraction of `target_chars` within which a sentence boundary is preferred
/// over a hard cut (spec §4.3: "±10% of target").
const BOUNDARY_TOLERANCE: f64 = 0.10;

/// Split `text` into overlapping, sentence-aligned windows.
///
/// Pure function: identical input always yields identical ordinals and
/// texts (spec §8.2). Produces zero chunks for empty/whitespace-only input,
/// otherwise at least one.
pub fn chunk(text: &str, config: &ChunkerConfig) -> Vec<RawChunk> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    // Sentence boundaries as char offsets into `text`; converted to byte
    // offsets once up front via `char_indices` below.
    let boundaries = sentence_end_offsets(text);

    let char_len = text.chars().count();
    let char_indices: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    // Map a char index to a byte offset; char_indices has char_len entries
    // plus we treat text.len() as the end-of-string byte offset.
    let byte_at = |char_idx: usize| -> usize {
        if char_idx >= char_indices.len() {
            text.len()
        } else {
            char_indices[char_idx]
        }
    };

    let target = config.target_chars.max(1);
    let overlap = config.overlap_chars.min(target.saturating_sub(1));
    let tolerance = ((target as f64) * BOUNDARY_TOLERANCE).round() as usize;

    let mut chunks = Vec::new();
    let mut start_char = 0usize;
    let mut ordinal = 0usize;

    while start_char < char_len {
        let ideal_end_char = (start_char + target).min(char_len);

        let end_char = if ideal_end_char >= char_len {
            char_len
        } else {
            // Prefer a sentence boundary within [ideal_end - tolerance, ideal_end + tolerance].
            let lo = ideal_end_char.saturating_sub(tolerance);
            let hi = (ideal_end_char + tolerance).min(char_len);
            find_boundary_in_range(&boundaries, lo, hi).unwrap_or(ideal_end_char)
        };

        let start_byte = byte_at(start_char);
        let end_byte = byte_at(end_char);
        let piece = text[start_byte..end_byte].trim();

        if !piece.is_empty() {
            chunks.push(RawChunk { ordinal, text: piece.to_string() });
            ordinal += 1;
        }

        if end_char >= char_len {
            break;
        }

        // Next window starts `overlap` chars back from this window's end,
        // but must make forward progress.
        let next_start = end_char.saturating_sub(overlap);
        start_char = if next_start > start_char { next_start } else { end_char };
    }

    chunks
}

/// Char offsets (into `text`'s char sequence) immediately after a sentence
/// terminator (`.`, `!`, `?`) followed by whitespace or end of string.
fn sentence_end_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '.' | '!' | '?') {
            let next_is_boundary =
                chars.get(i + 1).map(|c| c.is_whitespace()).unwrap_or(true);
            if next_is_boundary {
                offsets.push(i + 1);
            }
        }
    }
    offsets
}

fn find_boundary_in_range(boundaries: &[usize], lo: usize, hi: usize) -> Option<usize> {
    // Prefer the boundary closest to the midpoint of [lo, hi]; ties go to
    // the earlier one (deterministic).
    let mid = (lo + hi) / 2;
    boundaries
        .iter()
        .copied()
        .filter(|&b| b >= lo && b <= hi)
        .min_by_key(|&b| (b as i64 - mid as i64).unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", &ChunkerConfig::default()).is_empty());
        assert!(chunk("   \n\t", &ChunkerConfig::default()).is_empty());
    }

    #[test]
    fn short_input_yields_one_chunk() {
        let chunks = chunk("Python is a language.", &ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].ordinal, 0);
    }

    #[test]
    fn deterministic_repeated_calls() {
        let text = "Sentence one. Sentence two! Sentence three? ".repeat(200);
        let cfg = ChunkerConfig::default();
        assert_eq!(chunk(&text, &cfg), chunk(&text, &cfg));
    }

    #[test]
    fn long_text_produces_overlapping_windows() {
        let text = "word ".repeat(2000);
        let chunks = chunk(&text, &ChunkerConfig::default());
        assert!(chunks.len() > 1);
        for w in chunks.windows(2) {
            assert_eq!(w[1].ordinal, w[0].ordinal + 1);
        }
    }

    #[test]
    fn dense_contiguous_ordinals() {
        let text = "word ".repeat(5000);
        let chunks = chunk(&text, &ChunkerConfig::default());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.ordinal, i);
        }
    }
}
