//! Derived reading fields: word count, reading time and excerpt.
//!
//! All functions are pure. Lengths are measured in characters.
//!
//! # Example
//!
//! ```rust
//! use stash_core::derive::{excerpt, reading_time, word_count};
//!
//! let text = "A short article body.";
//! assert_eq!(word_count(Some(text)), 4);
//! assert_eq!(reading_time(4, 200), 1);
//! assert_eq!(excerpt(Some(text), 300).as_deref(), Some(text));
//! ```

/// Reading speed used when none is configured.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

/// Maximum excerpt length in characters, before the ellipsis.
pub const DEFAULT_EXCERPT_LENGTH: usize = 300;

/// Marker appended to truncated excerpts.
pub const ELLIPSIS: &str = "...";

/// Number of whitespace-delimited tokens in `text`; 0 for `None` or empty text.
pub fn word_count(text: Option<&str>) -> usize {
    text.map_or(0, |t| t.split_whitespace().count())
}

/// Estimated reading time in whole minutes.
///
/// Zero words read in zero minutes; anything else takes at least one minute.
/// The ratio is rounded half to even, so 250 words at 200 wpm is 1 minute and
/// 500 words is 2. A `words_per_minute` of 0 is treated as 1.
pub fn reading_time(word_count: usize, words_per_minute: u32) -> u32 {
    if word_count == 0 {
        return 0;
    }

    let minutes = (word_count as f64 / f64::from(words_per_minute.max(1))).round_ties_even();
    (minutes as u32).max(1)
}

/// Short preview of `content`.
///
/// Returns `None` for `None` or empty content and the content unchanged when it
/// fits in `max_length` characters. Longer content is cut to `max_length`
/// characters, moved back to the last whitespace so no word is split, and
/// terminated with [`ELLIPSIS`]. Without any whitespace to cut at, the raw cut
/// is kept.
pub fn excerpt(content: Option<&str>, max_length: usize) -> Option<String> {
    let content = content.filter(|c| !c.is_empty())?;

    let Some((cut, _)) = content.char_indices().nth(max_length) else {
        return Some(content.to_string());
    };

    let head = &content[..cut];
    let head = match head.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        Some((index, _)) if index > 0 => head[..index].trim_end(),
        _ => head,
    };

    Some(format!("{head}{ELLIPSIS}"))
}
