/// Query tokens shorter than this are dropped.
pub const MIN_TERM_CHARS: usize = 2;

/// Split a query into lowercased whitespace-separated terms, dropping
/// single-character noise.
pub fn tokenize_query(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_lowercase)
        .collect()
}

/// Greedy in-order subsequence match of `term` against `text`.
///
/// Scans `text` once, advancing through `term` each time the next expected
/// character shows up. Returns the fraction of `term` characters matched,
/// so missing or extra characters in the text are tolerated but reordered
/// characters are not. Both inputs are expected to be lowercased already.
///
/// ```
/// use discovery::text_util::fuzzy_ratio;
///
/// assert_eq!(fuzzy_ratio("cnt", "counting"), 1.0);
/// assert_eq!(fuzzy_ratio("tc", "cat"), 0.5);
/// ```
pub fn fuzzy_ratio(term: &str, text: &str) -> f32 {
    let term: Vec<char> = term.chars().collect();
    if term.is_empty() {
        return 0.0;
    }

    let mut cursor = 0;
    for c in text.chars() {
        if cursor == term.len() {
            break;
        }
        if c == term[cursor] {
            cursor += 1;
        }
    }

    cursor as f32 / term.len() as f32
}
