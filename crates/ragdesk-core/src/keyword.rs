//! Substring keyword fallback.
//!
//! Used when the question could not be embedded or the store holds no
//! comparable vectors. Deliberately crude: the first whitespace-delimited
//! token of the lower-cased question is matched as a substring of each
//! chunk's lower-cased content, in storage order.
//!
//! If nothing matches but the store is not empty, the first stored chunk is
//! returned, so the answerer always has some material when any document
//! exists.

/// Default number of keyword matches returned.
pub const DEFAULT_KEYWORD_LIMIT: usize = 3;

/// First whitespace-delimited token of the lower-cased question.
///
/// A blank question yields `""`, which every chunk contains.
pub fn first_token(question: &str) -> String {
    question
        .to_lowercase()
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string()
}

/// Select up to `limit` items whose text contains the question's first
/// token, falling back to the first item when none match.
pub fn keyword_matches<'a, T, F>(question: &str, items: &'a [T], text: F, limit: usize) -> Vec<&'a T>
where
    F: Fn(&T) -> &str,
{
    let token = first_token(question);

    let mut matched: Vec<&T> = items
        .iter()
        .filter(|item| text(item).to_lowercase().contains(token.as_str()))
        .take(limit)
        .collect();

    if matched.is_empty() {
        if let Some(first) = items.first() {
            matched.push(first);
        }
    }

    matched
}
