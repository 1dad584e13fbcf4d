//! Text preparation for embedding input and gloss comparison.

use crate::vocabulary::VocabularyEntry;

/// Maximum content length for embedding input (characters, not tokens)
const MAX_CONTENT_LENGTH: usize = 512;

/// Ellipsis suffix when content is truncated
const TRUNCATION_SUFFIX: &str = "...";

/// Normalize a gloss for comparison: trim, collapse inner whitespace, lowercase.
pub fn normalize_gloss(gloss: &str) -> String {
    gloss
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Build the text embedded for a stored entry: `"{writing} {reading} {meaning}"`.
///
/// Empty parts are dropped so a missing reading doesn't leave a double space.
pub fn entry_text(entry: &VocabularyEntry) -> String {
    let content = [
        entry.writing.trim(),
        entry.reading.trim(),
        entry.meaning.trim(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ");

    truncate_content(&content)
}

/// Truncate content to MAX_CONTENT_LENGTH characters, adding ellipsis if truncated.
fn truncate_content(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_LENGTH {
        return content.to_string();
    }

    let max_chars = MAX_CONTENT_LENGTH - TRUNCATION_SUFFIX.len();
    let truncated: String = content.chars().take(max_chars).collect();

    format!("{}{}", truncated, TRUNCATION_SUFFIX)
}
