//! Character-safe text helpers shared by the extractor and the pipeline.

/// Truncate to at most `max_chars` characters (never splits a code point).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Placeholder appended by [`shorten`] when text was cut.
pub const SHORTEN_PLACEHOLDER: &str = "...";

/// Collapse whitespace and fit `text` into `width` characters.
///
/// Cuts at a word boundary and appends [`SHORTEN_PLACEHOLDER`]. The result
/// never exceeds `width` characters; if not even the first word fits, the
/// placeholder alone is returned (or nothing, when `width` is smaller than
/// the placeholder).
pub fn shorten(text: &str, width: usize) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let placeholder_len = SHORTEN_PLACEHOLDER.chars().count();
    if width < placeholder_len {
        return String::new();
    }

    let budget = width - placeholder_len;
    let mut out = String::new();
    let mut used = 0;
    for word in collapsed.split(' ') {
        let word_len = word.chars().count();
        let needed = if out.is_empty() { word_len } else { word_len + 1 };
        if used + needed > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        used += needed;
    }

    if out.is_empty() {
        return SHORTEN_PLACEHOLDER.to_string();
    }
    // Separate the placeholder from the last word when there is room
    if used + 1 + placeholder_len <= width {
        out.push(' ');
    }
    out.push_str(SHORTEN_PLACEHOLDER);
    out
}
