//! Quality gating — which chat messages deserve a generated response.
//!
//! A per-user cooldown gate followed by a weighted feature score. Only
//! messages scoring past the threshold are answered, and answering stamps
//! the user's cooldown.

use chrono::{DateTime, Duration, Utc};
use marionette_core::types::{ChatMessage, QualityVerdict};
use std::collections::HashMap;
use std::sync::Mutex;

const COOLDOWN_SECS: i64 = 30;
/// Cooldown stamps older than this are swept on write.
const STAMP_SWEEP_SECS: i64 = 300;
const RESPONSE_THRESHOLD: f64 = 0.3;

const LENGTH_WEIGHT: f64 = 0.1;
const QUESTION_WEIGHT: f64 = 0.3;
const MENTION_WEIGHT: f64 = 0.2;
const ENGAGEMENT_WEIGHT: f64 = 0.2;
const UNIQUENESS_WEIGHT: f64 = 0.2;
/// Placeholder uniqueness value; a similarity model may replace it without
/// touching the rest of the contract.
const UNIQUENESS_BASELINE: f64 = 0.7;

pub struct QualityScorer {
    last_response: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl QualityScorer {
    pub fn new() -> Self {
        Self {
            last_response: Mutex::new(HashMap::new()),
        }
    }

    /// Gate-then-score. When the verdict is positive the user's
    /// last-response stamp is updated under the same lock.
    pub fn should_respond(&self, msg: &ChatMessage, character_name: &str) -> QualityVerdict {
        let mut stamps = self.last_response.lock().unwrap();

        if let Some(last) = stamps.get(&msg.user_id) {
            if msg.timestamp - *last < Duration::seconds(COOLDOWN_SECS) {
                return QualityVerdict {
                    respond: false,
                    score: 0.0,
                    reason: "cooldown".to_string(),
                };
            }
        }

        let score = score_message(&msg.text, character_name);
        let respond = score >= RESPONSE_THRESHOLD;
        if respond {
            let horizon = msg.timestamp - Duration::seconds(STAMP_SWEEP_SECS);
            stamps.retain(|_, ts| *ts >= horizon);
            stamps.insert(msg.user_id.clone(), msg.timestamp);
        }

        QualityVerdict {
            respond,
            score,
            reason: if respond {
                format!("score {score:.2}")
            } else {
                format!("low_score {score:.2}")
            },
        }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn score_message(text: &str, character_name: &str) -> f64 {
    LENGTH_WEIGHT * length_feature(text)
        + QUESTION_WEIGHT * question_feature(text)
        + MENTION_WEIGHT * mention_feature(text, character_name)
        + ENGAGEMENT_WEIGHT * engagement_feature(text)
        + UNIQUENESS_WEIGHT * UNIQUENESS_BASELINE
}

fn length_feature(text: &str) -> f64 {
    match text.chars().count() {
        10..=200 => 1.0,
        5..=9 | 201..=300 => 0.5,
        _ => 0.1,
    }
}

fn question_feature(text: &str) -> f64 {
    if text.contains('?') {
        1.0
    } else {
        0.0
    }
}

fn mention_feature(text: &str, character_name: &str) -> f64 {
    if !character_name.is_empty()
        && text.to_lowercase().contains(&character_name.to_lowercase())
    {
        1.0
    } else {
        0.0
    }
}

fn engagement_feature(text: &str) -> f64 {
    match text.chars().filter(|c| *c == '!').count() {
        1..=3 => 0.8,
        0 => 0.5,
        _ => 0.0,
    }
}
