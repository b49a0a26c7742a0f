//! Heuristic spam rejection for ingested chat.
//!
//! Stateless pattern rules plus two bounded windows: a per-user rate window
//! and a global duplicate window. Rules are evaluated in a fixed order and
//! the first match wins.

use chrono::{DateTime, Duration, Utc};
use marionette_core::types::{ChatMessage, SpamVerdict};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

const MIN_TEXT_CHARS: usize = 2;
const MAX_TEXT_CHARS: usize = 500;
/// Emoji-heavy shorties: this many emoji in under `SHORT_TEXT_CHARS` chars.
const EMOJI_LIMIT: usize = 5;
const SHORT_TEXT_CHARS: usize = 20;
const RATE_WINDOW_SECS: i64 = 60;
/// More messages than this inside the rate window is flooding.
const RATE_LIMIT: usize = 5;
const USER_WINDOW_CAP: usize = 10;
const GLOBAL_WINDOW_CAP: usize = 50;
const DUPLICATE_LIMIT: usize = 3;
/// Users silent this long are swept from the rate map.
const USER_IDLE_SWEEP_SECS: i64 = 300;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)\S+").unwrap()
});
static SHOUTING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]{5,}").unwrap());
static SYMBOL_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[!@#$%^&*()]{3,}").unwrap());

const SPAM_KEYWORDS: [&str; 9] = [
    "buy now",
    "click here",
    "free money",
    "guaranteed profit",
    "pump it",
    "to the moon",
    "scam",
    "hack",
    "cheat",
];

#[derive(Default)]
struct Windows {
    /// user_id -> recent message timestamps, newest at the back.
    per_user: HashMap<String, VecDeque<DateTime<Utc>>>,
    /// Normalized text of the most recent messages across all users.
    global: VecDeque<String>,
}

pub struct SpamFilter {
    windows: Mutex<Windows>,
}

impl SpamFilter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(Windows::default()),
        }
    }

    /// Record `msg` into the windows and classify it.
    pub fn check(&self, msg: &ChatMessage) -> SpamVerdict {
        let text = msg.text.as_str();
        let chars = text.chars().count();

        let (rate_count, duplicate_count) = {
            let mut windows = self.windows.lock().unwrap();
            windows.record(msg)
        };

        if chars < MIN_TEXT_CHARS || chars > MAX_TEXT_CHARS {
            return SpamVerdict::spam("message_length");
        }
        if URL_RE.is_match(text) {
            return SpamVerdict::spam("url");
        }
        if SHOUTING_RE.is_match(text) {
            return SpamVerdict::spam("excessive_caps");
        }
        if SYMBOL_RUN_RE.is_match(text) {
            return SpamVerdict::spam("symbol_run");
        }
        if has_repeated_run(text, 5) {
            return SpamVerdict::spam("repeated_characters");
        }
        if chars < SHORT_TEXT_CHARS && emoji_count(text) >= EMOJI_LIMIT {
            return SpamVerdict::spam("emoji_flood");
        }
        if rate_count > RATE_LIMIT {
            return SpamVerdict::spam("rate_limit");
        }
        if duplicate_count >= DUPLICATE_LIMIT {
            return SpamVerdict::spam("duplicate_message");
        }
        let lowered = text.to_lowercase();
        if SPAM_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return SpamVerdict::spam("spam_keyword");
        }

        SpamVerdict::clean()
    }
}

impl Default for SpamFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Windows {
    /// Push `msg` into both windows, sweep stale users, and return
    /// (messages from this user inside the rate window, occurrences of this
    /// normalized text in the global window) — both counts include `msg`.
    fn record(&mut self, msg: &ChatMessage) -> (usize, usize) {
        // Sweep users with no activity inside the idle horizon.
        let horizon = msg.timestamp - Duration::seconds(USER_IDLE_SWEEP_SECS);
        self.per_user
            .retain(|_, window| window.back().is_some_and(|ts| *ts >= horizon));

        let window = self.per_user.entry(msg.user_id.clone()).or_default();
        window.push_back(msg.timestamp);
        while window.len() > USER_WINDOW_CAP {
            window.pop_front();
        }
        let rate_floor = msg.timestamp - Duration::seconds(RATE_WINDOW_SECS);
        let rate_count = window.iter().filter(|ts| **ts >= rate_floor).count();

        let normalized = normalize(&msg.text);
        self.global.push_back(normalized.clone());
        while self.global.len() > GLOBAL_WINDOW_CAP {
            self.global.pop_front();
        }
        let duplicate_count = self.global.iter().filter(|t| **t == normalized).count();

        (rate_count, duplicate_count)
    }
}

/// Whitespace-collapsed, lowercased form used for duplicate detection.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn emoji_count(text: &str) -> usize {
    text.chars()
        .filter(|c| ('\u{1F300}'..='\u{1F9FF}').contains(c))
        .count()
}

/// Any single character repeated `limit` or more times in a row.
fn has_repeated_run(text: &str, limit: usize) -> bool {
    let mut run = 0usize;
    let mut last: Option<char> = None;
    for c in text.chars() {
        if Some(c) == last {
            run += 1;
        } else {
            run = 1;
            last = Some(c);
        }
        if run >= limit {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(user: &str, text: &str) -> ChatMessage {
        ChatMessage::new("twitch", user, user, text)
    }

    fn msg_at(user: &str, text: &str, ts: DateTime<Utc>) -> ChatMessage {
        let mut m = msg(user, text);
        m.timestamp = ts;
        m
    }

    #[test]
    fn accepts_ordinary_chat() {
        let filter = SpamFilter::new();
        let verdict = filter.check(&msg("alice", "how was your day, Mari?"));
        assert!(!verdict.is_spam);
    }

    #[test]
    fn rejects_too_short_and_too_long() {
        let filter = SpamFilter::new();
        assert_eq!(filter.check(&msg("a", "x")).reason, "message_length");
        assert_eq!(
            filter.check(&msg("a", &"y".repeat(501))).reason,
            "message_length"
        );
        assert!(!filter.check(&msg("a", &"y z".repeat(100))).is_spam);
    }

    #[test]
    fn rejects_urls() {
        let filter = SpamFilter::new();
        assert_eq!(
            filter.check(&msg("a", "join https://totally.legit/win")).reason,
            "url"
        );
        assert_eq!(filter.check(&msg("a", "visit www.site.com now!")).reason, "url");
    }

    #[test]
    fn rejects_shouting_and_symbol_runs() {
        let filter = SpamFilter::new();
        assert_eq!(filter.check(&msg("a", "this is AMAZING stuff")).reason, "excessive_caps");
        assert_eq!(filter.check(&msg("a", "wow!!! ok")).reason, "symbol_run");
    }

    #[test]
    fn four_caps_pass() {
        let filter = SpamFilter::new();
        assert!(!filter.check(&msg("a", "I love ABBA songs")).is_spam);
    }

    #[test]
    fn rejects_repeated_character_runs() {
        let filter = SpamFilter::new();
        assert_eq!(
            filter.check(&msg("a", "yessssss that was great")).reason,
            "repeated_characters"
        );
        assert!(!filter.check(&msg("a", "yesss that was great")).is_spam);
    }

    #[test]
    fn emoji_flood_boundaries() {
        let filter = SpamFilter::new();
        // five distinct emoji in a 19-char message: spam
        let nineteen = format!("{}{}", "🎉🎂🎈🎁🎀", "abcdefghijklmn");
        assert_eq!(nineteen.chars().count(), 19);
        assert_eq!(filter.check(&msg("a", &nineteen)).reason, "emoji_flood");
        // same five emoji at 20 chars: clean
        let twenty = format!("{}{}", "🎉🎂🎈🎁🎀", "abcdefghijklmno");
        assert_eq!(twenty.chars().count(), 20);
        assert!(!filter.check(&msg("a", &twenty)).is_spam);
    }

    #[test]
    fn rate_limit_boundary() {
        let filter = SpamFilter::new();
        let base = Utc::now();
        for i in 0..5 {
            let m = msg_at("bob", &format!("message number {i}"), base + Duration::seconds(i));
            assert!(!filter.check(&m).is_spam, "message {i} should pass");
        }
        let sixth = msg_at("bob", "message number five", base + Duration::seconds(5));
        assert_eq!(filter.check(&sixth).reason, "rate_limit");
    }

    #[test]
    fn rate_window_slides() {
        let filter = SpamFilter::new();
        let base = Utc::now();
        for i in 0..5 {
            filter.check(&msg_at("bob", &format!("older message {i}"), base + Duration::seconds(i)));
        }
        // a minute later the window has rolled off
        let later = msg_at("bob", "fresh message", base + Duration::seconds(70));
        assert!(!filter.check(&later).is_spam);
    }

    #[test]
    fn duplicate_message_on_third_copy() {
        let filter = SpamFilter::new();
        assert!(!filter.check(&msg("bob", "GM")).is_spam);
        assert!(!filter.check(&msg("bob", "gm")).is_spam);
        assert_eq!(filter.check(&msg("bob", " GM ")).reason, "duplicate_message");
    }

    #[test]
    fn duplicates_from_different_users_count_together() {
        let filter = SpamFilter::new();
        filter.check(&msg("a", "first one here"));
        filter.check(&msg("b", "first one here"));
        assert_eq!(
            filter.check(&msg("c", "first one here")).reason,
            "duplicate_message"
        );
    }

    #[test]
    fn rejects_keyword_spam() {
        let filter = SpamFilter::new();
        assert_eq!(
            filter.check(&msg("a", "this coin will go to the moon")).reason,
            "spam_keyword"
        );
        assert_eq!(filter.check(&msg("a", "Buy Now before it ends")).reason, "spam_keyword");
    }

    #[test]
    fn idle_users_are_swept() {
        let filter = SpamFilter::new();
        let base = Utc::now();
        for i in 0..5 {
            filter.check(&msg_at("bob", &format!("warm up {i}"), base + Duration::seconds(i)));
        }
        // ten minutes later bob's window is gone; five quick messages pass again
        for i in 0..5 {
            let m = msg_at(
                "bob",
                &format!("back again {i}"),
                base + Duration::seconds(600 + i),
            );
            assert!(!filter.check(&m).is_spam, "post-sweep message {i}");
        }
    }
}
