//! Splits a "thinking" segment out of raw decoded model output.
//!
//! Reasoning-tuned models wrap their intermediate reasoning in delimiter
//! tags (`<think>...</think>` and variants). This is a best-effort tag
//! search, not a markup parser: the first pattern pair that yields a
//! well-formed non-overlapping span wins, and anything malformed falls
//! through to "no thinking segment".

use once_cell::sync::Lazy;
use regex::Regex;

/// A start/end delimiter pair, matched case-insensitively.
#[derive(Debug, Clone)]
pub struct TagPair {
    start: Regex,
    end: Regex,
}

impl TagPair {
    pub fn new(start: &str, end: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            start: Regex::new(&format!("(?i){start}"))?,
            end: Regex::new(&format!("(?i){end}"))?,
        })
    }
}

static DEFAULT_TAG_PAIRS: Lazy<Vec<TagPair>> = Lazy::new(|| {
    vec![
        TagPair::new(r"<think>", r"</think>").expect("valid tag pattern"),
        TagPair::new(r"<\|think\|>", r"<\|/think\|>").expect("valid tag pattern"),
    ]
});

/// Splits `text` into `(thinking, content)` using the default tag pairs.
pub fn split_thinking(text: &str) -> (String, String) {
    split_with(text, &DEFAULT_TAG_PAIRS)
}

/// Splits `text` into `(thinking, content)` trying `pairs` in order.
///
/// For a pair to match, the first occurrence of the end tag must begin at
/// or after the end of the first occurrence of the start tag. The thinking
/// text is the span strictly between the tags, trimmed; the content is
/// everything before the start tag joined with everything after the end
/// tag, trimmed. Without a well-formed span the whole trimmed input is
/// returned as content.
pub fn split_with(text: &str, pairs: &[TagPair]) -> (String, String) {
    for pair in pairs {
        if let (Some(start), Some(end)) = (pair.start.find(text), pair.end.find(text)) {
            if end.start() >= start.end() {
                let thinking = text[start.end()..end.start()].trim().to_string();
                let mut content = String::new();
                content.push_str(&text[..start.start()]);
                content.push_str(&text[end.end()..]);
                return (thinking, content.trim().to_string());
            }
        }
    }
    (String::new(), text.trim().to_string())
}
