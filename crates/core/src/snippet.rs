//! Snippet generation and highlighting (spec §4.10).
//!
//! Kept pure and UI-agnostic per SPEC_FULL §10 design notes: this module
//! only finds and marks spans; clients decide how to render the `**…**`
//! markers.

use crate::tokenizer::tokenize;

/// Default snippet window width in characters (spec §4.10).
pub const DEFAULT_WINDOW: usize = 200;

/// Neutral highlight marker wrapped around matched token spans.
const MARK_OPEN: &str = "**";
const MARK_CLOSE: &str = "**";

/// Build a snippet around the position in `text` that maximizes distinct
/// query-token matches within `window` characters, expanded to word
/// boundaries and ellipsis-prefixed/suffixed when truncated.
pub fn snippet(text: &str, query_tokens: &[String], window: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let char_len = chars.len();
    if char_len <= window {
        return text.to_string();
    }

    let query_set: std::collections::HashSet<&str> =
        query_tokens.iter().map(|s| s.as_str()).collect();

    // Positions (char offsets) of every token occurrence that matches a
    // query token, derived by walking the same alphanumeric-split boundaries
    // the tokenizer uses, so offsets line up with `chars`.
    let occurrences = matching_token_positions(text, &query_set);

    let best_start = if occurrences.is_empty() {
        0
    } else {
        best_window_start(&occurrences, char_len, window)
    };

    let raw_end = (best_start + window).min(char_len);
    let (start, end) = expand_to_whitespace(&chars, best_start, raw_end);

    let mut out = String::new();
    if start > 0 {
        out.push('…');
    }
    out.push_str(&chars[start..end].iter().collect::<String>());
    if end < char_len {
        out.push('…');
    }
    out
}

/// Like [`snippet`] but wraps matched query-token spans with [`MARK_OPEN`]/
/// [`MARK_CLOSE`] markers for UIs that want inline highlighting.
pub fn highlighted_snippet(text: &str, query_tokens: &[String], window: usize) -> String {
    let base = snippet(text, query_tokens, window);
    if query_tokens.is_empty() {
        return base;
    }
    let query_set: std::collections::HashSet<&str> =
        query_tokens.iter().map(|s| s.as_str()).collect();
    highlight_spans(&base, &query_set)
}

/// Char offsets of tokens in `text` that match a query token, using the same
/// alphanumeric-boundary split as [`crate::tokenizer::tokenize`].
fn matching_token_positions(text: &str, query_set: &std::collections::HashSet<&str>) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut char_idx = 0usize;
    let mut token_start: Option<usize> = None;
    let mut token = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() {
            if token_start.is_none() {
                token_start = Some(char_idx);
            }
            token.push(c.to_ascii_lowercase());
        } else if let Some(start) = token_start.take() {
            if query_set.contains(token.as_str()) {
                positions.push(start);
            }
            token.clear();
        }
        char_idx += 1;
    }
    if let Some(start) = token_start {
        if query_set.contains(token.as_str()) {
            positions.push(start);
        }
    }
    positions
}

/// Find the window start that maximizes distinct matches inside
/// `[start, start+window)`; ties go to the earliest start (spec §4.10).
fn best_window_start(occurrences: &[usize], char_len: usize, window: usize) -> usize {
    let mut best_start = 0usize;
    let mut best_count = -1i64;

    for &candidate in occurrences {
        let start = candidate.min(char_len.saturating_sub(window));
        let end = (start + window).min(char_len);
        let count = occurrences.iter().filter(|&&p| p >= start && p < end).count() as i64;
        if count > best_count {
            best_count = count;
            best_start = start;
        }
    }
    best_start
}

/// Expand `[start, end)` outward to the nearest whitespace so words aren't
/// sliced mid-token (spec §4.10 "expanded to the nearest whitespace").
fn expand_to_whitespace(chars: &[char], start: usize, end: usize) -> (usize, usize) {
    let mut s = start;
    while s > 0 && !chars[s - 1].is_whitespace() {
        s -= 1;
    }
    let mut e = end;
    while e < chars.len() && !chars[e].is_whitespace() {
        e += 1;
    }
    (s, e)
}

/// Wrap matched-token spans in `text` with highlight markers.
fn highlight_spans(text: &str, query_set: &std::collections::HashSet<&str>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut token = String::new();
    let mut pending_sep = String::new();

    let flush_token = |token: &mut String, out: &mut String| {
        if token.is_empty() {
            return;
        }
        if query_set.contains(token.to_lowercase().as_str()) {
            out.push_str(MARK_OPEN);
            out.push_str(token);
            out.push_str(MARK_CLOSE);
        } else {
            out.push_str(token);
        }
        token.clear();
    };

    for c in text.chars() {
        if c.is_alphanumeric() {
            if !pending_sep.is_empty() {
                out.push_str(&pending_sep);
                pending_sep.clear();
            }
            token.push(c);
        } else {
            flush_token(&mut token, &mut out);
            pending_sep.push(c);
        }
    }
    flush_token(&mut token, &mut out);
    out.push_str(&pending_sep);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_returned_whole() {
        let s = snippet("hello world", &["hello".to_string()], 200);
        assert_eq!(s, "hello world");
    }

    #[test]
    fn long_text_centers_on_matches_with_ellipsis() {
        let filler_a = "lorem ipsum dolor sit amet ".repeat(20);
        let text = format!("{filler_a} python is great {filler_a}");
        let s = snippet(&text, &["python".to_string()], 60);
        assert!(s.contains("python"));
        assert!(s.starts_with('…'));
        assert!(s.ends_with('…'));
    }

    #[test]
    fn highlighted_snippet_wraps_matches() {
        let s = highlighted_snippet("python is great", &["python".to_string()], 200);
        assert_eq!(s, "**python** is great");
    }

    #[test]
    fn empty_text_yields_empty_snippet() {
        assert_eq!(snippet("", &["x".to_string()], 200), "");
    }
}
