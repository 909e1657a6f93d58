//! Pairwise verdicts: the five-level preference a judge expresses between
//! two anonymized responses, and the regex-based extraction of that verdict
//! from free-text judge output.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairwiseVerdict {
    AMuchBetter,
    ABetter,
    Tie,
    BBetter,
    BMuchBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    A,
    B,
    Tie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Margin {
    Major,
    Minor,
    Tie,
}

impl PairwiseVerdict {
    /// Maps a verdict to the (winner, margin) pair used by the aggregators.
    pub fn winner_margin(self) -> (Winner, Margin) {
        match self {
            PairwiseVerdict::AMuchBetter => (Winner::A, Margin::Major),
            PairwiseVerdict::ABetter => (Winner::A, Margin::Minor),
            PairwiseVerdict::Tie => (Winner::Tie, Margin::Tie),
            PairwiseVerdict::BBetter => (Winner::B, Margin::Minor),
            PairwiseVerdict::BMuchBetter => (Winner::B, Margin::Major),
        }
    }
}

/// One parsed judgment: a judge comparing two specific items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseRecord {
    pub judge_model: String,
    pub item_a: String,
    pub item_b: String,
    pub winner: Winner,
    pub margin: Margin,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl PairwiseRecord {
    pub fn new(judge_model: impl Into<String>, item_a: impl Into<String>, item_b: impl Into<String>, verdict: PairwiseVerdict) -> Self {
        let (winner, margin) = verdict.winner_margin();
        Self {
            judge_model: judge_model.into(),
            item_a: item_a.into(),
            item_b: item_b.into(),
            winner,
            margin,
            metadata: serde_json::Value::Null,
        }
    }
}

fn escape(id: &str) -> String {
    regex::escape(id)
}

/// Extract a verdict relative to `id_a`/`id_b` from a judge's free-text
/// response. Tries an id-specific bracket token first (`[[id_a>>id_b]]`
/// etc.), then a generic `[[A/B ...]]` fallback using positional semantics.
pub fn parse_verdict(text: &str, id_a: &str, id_b: &str) -> Option<PairwiseVerdict> {
    let (ea, eb) = (escape(id_a), escape(id_b));
    let specific = [
        (format!(r"\[\[{ea}\s*≫\s*{eb}\]\]"), PairwiseVerdict::AMuchBetter),
        (format!(r"\[\[{ea}\s*>>\s*{eb}\]\]"), PairwiseVerdict::AMuchBetter),
        (format!(r"\[\[{ea}\s*>\s*{eb}\]\]"), PairwiseVerdict::ABetter),
        (format!(r"\[\[{ea}\s*=\s*{eb}\]\]"), PairwiseVerdict::Tie),
        (format!(r"\[\[{eb}\s*>\s*{ea}\]\]"), PairwiseVerdict::BBetter),
        (format!(r"\[\[{eb}\s*>>\s*{ea}\]\]"), PairwiseVerdict::BMuchBetter),
        (format!(r"\[\[{eb}\s*≫\s*{ea}\]\]"), PairwiseVerdict::BMuchBetter),
    ];
    for (pattern, verdict) in &specific {
        if Regex::new(pattern).ok()?.is_match(text) {
            return Some(*verdict);
        }
    }

    // Generic fallback: [[A≫B]] / [[A>B]] / [[A=B]] / [[B>A]] / [[B≫A]]
    static GENERIC: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
        Regex::new(r"\[\[(A|B)\s*(≫|>>|>|=)\s*(A|B)\]\]").unwrap()
    });
    let cap = GENERIC.captures(text)?;
    let (left, op, right) = (&cap[1], &cap[2], &cap[3]);
    if left == right {
        return None;
    }
    let verdict = match (left, op) {
        ("A", "≫") | ("A", ">>") => PairwiseVerdict::AMuchBetter,
        ("A", ">") => PairwiseVerdict::ABetter,
        ("A", "=") => PairwiseVerdict::Tie,
        ("B", "≫") | ("B", ">>") => PairwiseVerdict::BMuchBetter,
        ("B", ">") => PairwiseVerdict::BBetter,
        ("B", "=") => PairwiseVerdict::Tie,
        _ => return None,
    };
    Some(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_specific_major_win() {
        let text = "Response A1 is clearly superior in depth. [[A1≫A2]]";
        assert_eq!(parse_verdict(text, "A1", "A2"), Some(PairwiseVerdict::AMuchBetter));
    }

    #[test]
    fn parses_tie() {
        let text = "Both are equally good. [[A1=A2]]";
        assert_eq!(parse_verdict(text, "A1", "A2"), Some(PairwiseVerdict::Tie));
    }

    #[test]
    fn parses_reversed_winner() {
        let text = "[[A2>A1]]";
        assert_eq!(parse_verdict(text, "A1", "A2"), Some(PairwiseVerdict::BBetter));
    }

    #[test]
    fn unparseable_text_yields_none() {
        assert_eq!(parse_verdict("I think both are fine", "A1", "A2"), None);
    }

    #[test]
    fn generic_fallback() {
        assert_eq!(parse_verdict("overall [[A>>B]]", "A1", "A2"), Some(PairwiseVerdict::AMuchBetter));
    }
}
