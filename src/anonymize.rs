//! Anonymization: assign opaque labels to role results before judging, parse
//! free-text rankings back out of judge responses, and reverse the mapping.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::Regex;

use crate::error::{CouncilError, CouncilResult};
use crate::role::Role;

/// A role's output, paired with an opaque label for the duration of one
/// deliberation's judging phase.
#[derive(Debug, Clone)]
pub struct AnonymousLabel {
    pub label: String,
    pub role_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct AnonymizedCollection {
    pub items: Vec<AnonymousLabel>,
}

impl AnonymizedCollection {
    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.label.as_str()).collect()
    }

    pub fn get(&self, label: &str) -> Option<&AnonymousLabel> {
        self.items.iter().find(|i| i.label == label)
    }
}

/// Build the per-pair label set judges will see. `enabled` controls identity
/// hiding: when `true`, labels are opaque `{prefix}{i}` tokens; when `false`,
/// labels are the role's own (duplicate-disambiguated) name, so judges see
/// real identities. `shuffle` is an independent concern — it only controls
/// whether presentation order is randomized, and applies either way.
pub fn anonymize(
    results: &[(Role, String)],
    prefix: &str,
    enabled: bool,
    shuffle: bool,
    seed: Option<u64>,
) -> CouncilResult<AnonymizedCollection> {
    if results.is_empty() {
        return Err(CouncilError::peer_review(
            "cannot anonymize an empty result set",
        ));
    }

    let mut order: Vec<usize> = (0..results.len()).collect();
    if shuffle {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        order.shuffle(&mut rng);
    }

    let mut seen_names: HashMap<String, usize> = HashMap::new();
    let mut items = Vec::with_capacity(results.len());
    for (i, idx) in order.into_iter().enumerate() {
        let (role, content) = &results[idx];
        let count = seen_names.entry(role.name.clone()).or_insert(0);
        *count += 1;
        let display_name = if *count > 1 {
            format!("{}#{}", role.name, count)
        } else {
            role.name.clone()
        };
        let label = if enabled {
            format!("{prefix}{}", i + 1)
        } else {
            display_name.clone()
        };
        items.push(AnonymousLabel {
            label,
            role_name: display_name,
            content: content.clone(),
        });
    }

    Ok(AnonymizedCollection { items })
}

/// Reverse the anonymization: map labels back to role names.
pub fn de_anonymize(collection: &AnonymizedCollection, text: &str) -> String {
    let mut out = text.to_string();
    for item in &collection.items {
        out = out.replace(&item.label, &item.role_name);
    }
    out
}

/// Aggregate several parsed rankings into a single ordered ranking.
/// `weights`, if shorter than `rankings`, is padded with `1.0`; if longer,
/// truncated to match — mirroring the original implementation's tolerance
/// for a partially-specified weight vector.
pub fn calculate_aggregate_rankings(
    rankings: &[Vec<String>],
    weights: &[f64],
    method: RankingAggregationMethod,
) -> Vec<(String, f64)> {
    let mut weights = weights.to_vec();
    weights.resize(rankings.len(), 1.0);

    let mut scores: HashMap<String, f64> = HashMap::new();
    let mut totals: HashMap<String, f64> = HashMap::new();

    for (ranking, weight) in rankings.iter().zip(weights.iter()) {
        let n = ranking.len();
        for (position, label) in ranking.iter().enumerate() {
            let contribution = match method {
                RankingAggregationMethod::Borda => (n - position) as f64,
                RankingAggregationMethod::AveragePosition => (position + 1) as f64,
            };
            *scores.entry(label.clone()).or_insert(0.0) += contribution * weight;
            *totals.entry(label.clone()).or_insert(0.0) += weight;
        }
    }

    let mut result: Vec<(String, f64)> = match method {
        RankingAggregationMethod::Borda => scores.into_iter().collect(),
        RankingAggregationMethod::AveragePosition => scores
            .into_iter()
            .map(|(label, total)| {
                let weight_sum = totals.get(&label).copied().unwrap_or(1.0);
                (label, total / weight_sum)
            })
            .collect(),
    };

    match method {
        RankingAggregationMethod::Borda => result.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap()),
        RankingAggregationMethod::AveragePosition => result.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap()),
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingAggregationMethod {
    Borda,
    AveragePosition,
}

/// Parse an ordered ranking of labels out of free text, trying several
/// strategies in order. If `ensure_all` is set, any `valid_labels` missing
/// from the detected ranking are appended at the tail.
pub fn parse_ranking(text: &str, valid_labels: &[String], ensure_all: bool) -> Vec<String> {
    let strategies: [fn(&str, &[String]) -> Vec<String>; 7] = [
        parse_arrow_notation,
        parse_numbered_list,
        parse_reverse_ranking,
        parse_table_format,
        parse_simple_list,
        parse_response_labels,
        parse_natural_language,
    ];

    let mut found = Vec::new();
    for strategy in strategies {
        let result = strategy(text, valid_labels);
        if !result.is_empty() {
            found = result;
            break;
        }
    }

    if ensure_all && !valid_labels.is_empty() {
        found = ensure_all_included(found, valid_labels);
    }

    found
}

fn normalize_token(token: &str) -> String {
    token
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '#')
        .to_string()
}

fn match_label<'a>(token: &str, valid_labels: &'a [String]) -> Option<&'a String> {
    let normalized = normalize_token(token).to_lowercase();
    valid_labels
        .iter()
        .find(|label| label.to_lowercase() == normalized)
}

fn extract_id(token: &str, valid_labels: &[String]) -> Option<String> {
    if let Some(found) = match_label(token, valid_labels) {
        return Some(found.clone());
    }
    static RE: once_cell::sync::Lazy<Regex> =
        once_cell::sync::Lazy::new(|| Regex::new(r"[A-Za-z]+\d+").unwrap());
    RE.find(token).map(|m| m.as_str().to_string())
}

fn ensure_all_included(mut found: Vec<String>, valid_labels: &[String]) -> Vec<String> {
    for label in valid_labels {
        if !found.iter().any(|f| f == label) {
            found.push(label.clone());
        }
    }
    found
}

fn parse_arrow_notation(text: &str, valid_labels: &[String]) -> Vec<String> {
    static RE: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        Regex::new(r"([A-Za-z0-9#]+)\s*(?:>>|>|→|->)\s*([A-Za-z0-9#]+)(?:\s*(?:>>|>|→|->)\s*([A-Za-z0-9#]+))*").unwrap()
    });
    let Some(m) = RE.find(text) else {
        return Vec::new();
    };
    let fragment = m.as_str();
    static SPLIT: once_cell::sync::Lazy<Regex> =
        once_cell::sync::Lazy::new(|| Regex::new(r">>|>|→|->").unwrap());
    let mut found = Vec::new();
    for tok in SPLIT.split(fragment) {
        if let Some(id) = extract_id(tok, valid_labels) {
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    found
}

fn parse_numbered_list(text: &str, valid_labels: &[String]) -> Vec<String> {
    static RE: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        Regex::new(r"(?m)^\s*(?:\d+[.)]|\d+(?:st|nd|rd|th)[:.]?|[-*•])\s*([A-Za-z0-9#]+)").unwrap()
    });
    let mut found = Vec::new();
    for cap in RE.captures_iter(text) {
        if let Some(id) = extract_id(&cap[1], valid_labels) {
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    found
}

fn parse_reverse_ranking(text: &str, valid_labels: &[String]) -> Vec<String> {
    static BEST: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        Regex::new(r"(?i)best\s*[:=]?\s*([A-Za-z0-9#]+)").unwrap()
    });
    static WORST: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        Regex::new(r"(?i)worst\s*[:=]?\s*([A-Za-z0-9#]+)").unwrap()
    });
    let best = BEST
        .captures(text)
        .and_then(|cap| extract_id(&cap[1], valid_labels));
    let worst = WORST
        .captures(text)
        .and_then(|cap| extract_id(&cap[1], valid_labels));
    match (best, worst) {
        (Some(b), Some(w)) if b != w => vec![b, w],
        (Some(b), None) => vec![b],
        _ => Vec::new(),
    }
}

fn parse_table_format(text: &str, valid_labels: &[String]) -> Vec<String> {
    let mut found = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('|') {
            continue;
        }
        let cells: Vec<&str> = trimmed.trim_matches('|').split('|').collect();
        for cell in cells {
            if let Some(id) = extract_id(cell, valid_labels) {
                if !found.contains(&id) {
                    found.push(id);
                }
            }
        }
    }
    // drop header/separator artifacts: a row of only dashes produces nothing
    found
}

fn parse_simple_list(text: &str, valid_labels: &[String]) -> Vec<String> {
    static RE: once_cell::sync::Lazy<Regex> =
        once_cell::sync::Lazy::new(|| Regex::new(r"[,;\n]").unwrap());
    let mut tokens = Vec::new();
    for tok in RE.split(text) {
        if let Some(id) = extract_id(tok, valid_labels) {
            if !tokens.contains(&id) {
                tokens.push(id);
            }
        }
    }
    if tokens.len() >= 2 {
        tokens
    } else {
        Vec::new()
    }
}

fn parse_response_labels(text: &str, valid_labels: &[String]) -> Vec<String> {
    static RE: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        Regex::new(r"(?i)response\s+([A-Za-z0-9#]+)").unwrap()
    });
    let mut found = Vec::new();
    for cap in RE.captures_iter(text) {
        if let Some(id) = extract_id(&cap[1], valid_labels) {
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    found
}

fn parse_natural_language(text: &str, valid_labels: &[String]) -> Vec<String> {
    let mut found = Vec::new();
    let mut positions: Vec<(usize, String)> = Vec::new();
    for label in valid_labels {
        if let Some(pos) = text.to_lowercase().find(&label.to_lowercase()) {
            positions.push((pos, label.clone()));
        }
    }
    positions.sort_by_key(|(pos, _)| *pos);
    for (_, label) in positions {
        if !found.contains(&label) {
            found.push(label);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["A1".into(), "A2".into(), "A3".into()]
    }

    #[test]
    fn anonymize_is_bijective_over_role_names() {
        let role_a = Role::new("alice", "p", "m");
        let role_b = Role::new("bob", "p", "m");
        let results = vec![
            (role_a.clone(), "first".to_string()),
            (role_b.clone(), "second".to_string()),
        ];
        let collection = anonymize(&results, "A", true, false, None).unwrap();
        assert_eq!(collection.items.len(), 2);
        let mut names: Vec<_> = collection.items.iter().map(|i| i.role_name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn disabled_anonymization_uses_real_names_as_labels() {
        let role_a = Role::new("alice", "p", "m");
        let role_b = Role::new("bob", "p", "m");
        let results = vec![
            (role_a, "first".to_string()),
            (role_b, "second".to_string()),
        ];
        let collection = anonymize(&results, "A", false, false, None).unwrap();
        let mut labels: Vec<_> = collection.items.iter().map(|i| i.label.clone()).collect();
        labels.sort();
        assert_eq!(labels, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn arrow_notation() {
        let result = parse_ranking("The best ranking is A1 > A2 > A3.", &labels(), true);
        assert_eq!(result, labels());
    }

    #[test]
    fn numbered_list() {
        let text = "1. A2\n2. A1\n3. A3";
        let result = parse_ranking(text, &labels(), true);
        assert_eq!(result, vec!["A2", "A1", "A3"]);
    }

    #[test]
    fn ensure_all_appends_missing() {
        let text = "A2 is best";
        let result = parse_ranking(text, &labels(), true);
        assert_eq!(result.len(), 3);
        assert!(result.contains(&"A1".to_string()));
    }

    #[test]
    fn repeated_tokens_do_not_duplicate_in_ranking() {
        let result = parse_ranking("A1 > A1 > A2 > A3", &labels(), true);
        assert_eq!(result, labels());
    }

    #[test]
    fn unparseable_returns_empty_without_ensure_all() {
        let result = parse_ranking("I cannot decide.", &labels(), false);
        assert!(result.is_empty());
    }

    #[test]
    fn aggregate_rankings_borda_favors_top_ranked() {
        let rankings = vec![
            vec!["A1".to_string(), "A2".to_string(), "A3".to_string()],
            vec!["A1".to_string(), "A3".to_string(), "A2".to_string()],
        ];
        let result = calculate_aggregate_rankings(&rankings, &[], RankingAggregationMethod::Borda);
        assert_eq!(result[0].0, "A1");
    }

    #[test]
    fn aggregate_rankings_pads_short_weight_vector() {
        let rankings = vec![
            vec!["A1".to_string(), "A2".to_string()],
            vec!["A2".to_string(), "A1".to_string()],
        ];
        let result = calculate_aggregate_rankings(&rankings, &[2.0], RankingAggregationMethod::AveragePosition);
        assert_eq!(result.len(), 2);
    }
}
