//! Emotion tag extraction — `[joy]`, `[anger]`, … markers embedded in
//! agent-generated text, resolved against the active model's emotion map.

use crate::descriptor::EmotionMap;

/// Scan `text` left-to-right for `[token]` markers and resolve each against
/// `map`. Returns the mapped expression ids in encounter order, duplicates
/// preserved. Unknown tokens, nested brackets, and unterminated `[` are
/// treated as literal text. Never fails.
pub fn extract(text: &str, map: &EmotionMap) -> Vec<u32> {
    extract_and_strip(text, map).0
}

/// Like [`extract`], additionally returning the text with every matched tag
/// removed — the form surfaced to viewers in `display_text`.
pub fn extract_and_strip(text: &str, map: &EmotionMap) -> (Vec<u32>, String) {
    let mut ids = Vec::new();
    let mut stripped = String::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        // '[' is single-byte ASCII, so a byte match is also a char match.
        if text.as_bytes()[i] == b'[' {
            if let Some((token_len, id)) = longest_tag_match(&text[i + 1..], map) {
                ids.push(id);
                i += token_len + 2; // '[' + token + ']'
                continue;
            }
        }
        let Some(ch) = text[i..].chars().next() else {
            break;
        };
        stripped.push(ch);
        i += ch.len_utf8();
    }

    (ids, stripped)
}

/// Longest map key that matches the start of `rest` (case-insensitive) and
/// is immediately followed by `]`. Returns (key byte length, expression id).
fn longest_tag_match(rest: &str, map: &EmotionMap) -> Option<(usize, u32)> {
    let mut best: Option<(usize, u32)> = None;
    for (key, id) in map.iter() {
        if rest.as_bytes().get(key.len()) != Some(&b']') {
            continue;
        }
        let matches = rest
            .get(..key.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(key));
        if matches && best.map_or(true, |(len, _)| key.len() > len) {
            best = Some((key.len(), id));
        }
    }
    best
}
