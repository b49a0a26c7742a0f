//! Multi-candidate response selection — ask the agent for a few variants of
//! the same reply and keep the one that reads best.

use futures_util::future::join_all;
use serde_json::Value;
use tracing::warn;

use crate::engine::AgentEngine;

/// Suffixes appended to the base prompt to diversify the candidates.
const PROMPT_VARIANTS: [&str; 3] = ["", " (respond briefly)", " (respond naturally)"];

const LENGTH_WEIGHT: f64 = 0.4;
const UNIQUENESS_WEIGHT: f64 = 0.3;
const NATURALNESS_WEIGHT: f64 = 0.3;

/// Request one candidate per prompt variant, score them, and return the best.
///
/// A failed generation scores 0. When every candidate fails the empty string
/// is returned and the caller must not dispatch it.
pub async fn select_best(agent: &dyn AgentEngine, message: &str, context: &Value) -> String {
    let prompts: Vec<String> = PROMPT_VARIANTS
        .iter()
        .map(|suffix| format!("{message}{suffix}"))
        .collect();

    let results = join_all(
        prompts
            .iter()
            .map(|prompt| agent.generate(prompt, context)),
    )
    .await;

    let candidates: Vec<Option<String>> = results
        .into_iter()
        .enumerate()
        .map(|(i, r)| match r {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(candidate = i, error = %e, "candidate generation failed");
                None
            }
        })
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let Some(text) = candidate else {
            continue;
        };
        let score = score_candidate(text, &candidates, i);
        // Strict > keeps the lowest index on ties.
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }

    match best {
        Some((i, _)) => candidates[i].clone().unwrap_or_default(),
        None => String::new(),
    }
}

fn score_candidate(text: &str, all: &[Option<String>], index: usize) -> f64 {
    length_score(text) + uniqueness_score(text, all, index) + naturalness_score(text)
}

fn length_score(text: &str) -> f64 {
    let len = text.chars().count();
    let factor = match len {
        20..=150 => 1.0,
        10..=19 | 151..=200 => 0.5,
        _ => 0.25,
    };
    LENGTH_WEIGHT * factor
}

/// Penalize candidates that repeat the others, via mean Jaccard word overlap.
fn uniqueness_score(text: &str, all: &[Option<String>], index: usize) -> f64 {
    let others: Vec<&String> = all
        .iter()
        .enumerate()
        .filter(|(i, c)| *i != index && c.is_some())
        .filter_map(|(_, c)| c.as_ref())
        .collect();

    if others.is_empty() {
        return UNIQUENESS_WEIGHT;
    }

    let mean: f64 = others
        .iter()
        .map(|other| jaccard_word_similarity(text, other))
        .sum::<f64>()
        / others.len() as f64;

    UNIQUENESS_WEIGHT * (1.0 - mean)
}

/// Zero when any word appears three or more times within the first 20 words.
fn naturalness_score(text: &str) -> f64 {
    let mut counts = std::collections::HashMap::new();
    for word in text.split_whitespace().take(20) {
        let count = counts.entry(word.to_lowercase()).or_insert(0u32);
        *count += 1;
        if *count >= 3 {
            return 0.0;
        }
    }
    NATURALNESS_WEIGHT
}

fn jaccard_word_similarity(a: &str, b: &str) -> f64 {
    let set_a: std::collections::HashSet<String> =
        a.split_whitespace().map(str::to_lowercase).collect();
    let set_b: std::collections::HashSet<String> =
        b.split_whitespace().map(str::to_lowercase).collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}
