//! Inter-judge agreement analysis: exact, side-wise, and Cohen's kappa
//! agreement over the same set of pairwise comparisons, plus consensus and
//! disputed item detection.

use std::collections::{HashMap, HashSet};

use crate::verdict::{Margin, PairwiseRecord, Winner};

#[derive(Debug, Clone, Default)]
pub struct AgreementMetrics {
    pub exact_agreement: f64,
    pub sidewise_agreement: f64,
    pub cohen_kappa: Option<f64>,
    pub shared_comparisons: usize,
}

fn comparison_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Verdict level normalized to a canonical (sorted-pair) orientation, on a
/// 5-point scale: `{-2, -1, 0, 1, 2}`. Sign gives direction relative to the
/// lexicographically-first item (positive if it won); magnitude gives margin
/// (1 = minor, 2 = major); 0 is a tie. Carrying margin (not just direction)
/// through to this level is what lets exact agreement distinguish `A>B` from
/// `A≫B`, while side-wise agreement still only cares about the sign.
fn normalized_rating(record: &PairwiseRecord) -> (String, String, i8) {
    let key = comparison_key(&record.item_a, &record.item_b);
    let direction: i8 = match record.winner {
        Winner::Tie => 0,
        Winner::A => {
            if record.item_a == key.0 {
                1
            } else {
                -1
            }
        }
        Winner::B => {
            if record.item_b == key.0 {
                1
            } else {
                -1
            }
        }
    };
    let magnitude: i8 = match record.margin {
        Margin::Tie => 0,
        Margin::Minor => 1,
        Margin::Major => 2,
    };
    (key.0, key.1, direction * magnitude)
}

fn ratings_by_judge(records: &[PairwiseRecord]) -> HashMap<String, HashMap<(String, String), i8>> {
    let mut by_judge: HashMap<String, HashMap<(String, String), i8>> = HashMap::new();
    for record in records {
        let (a, b, level) = normalized_rating(record);
        by_judge
            .entry(record.judge_model.clone())
            .or_default()
            .insert((a, b), level);
    }
    by_judge
}

/// Exact agreement: both judges must land on the same level, so `A>B` and
/// `A≫B` are treated as disagreement even though they share a direction.
fn exact_agreement(a: &HashMap<(String, String), i8>, b: &HashMap<(String, String), i8>) -> (f64, usize) {
    let shared: Vec<_> = a.keys().filter(|k| b.contains_key(*k)).collect();
    if shared.is_empty() {
        return (0.0, 0);
    }
    let matches = shared.iter().filter(|k| a[*k] == b[*k]).count();
    (matches as f64 / shared.len() as f64, shared.len())
}

/// Side-wise agreement: only the winning side matters, not the margin. A tie
/// from either judge counts as agreement with whichever side the other
/// judge picked.
fn sidewise_agreement(a: &HashMap<(String, String), i8>, b: &HashMap<(String, String), i8>) -> f64 {
    let shared: Vec<_> = a.keys().filter(|k| b.contains_key(*k)).collect();
    if shared.is_empty() {
        return 0.0;
    }
    let matches = shared
        .iter()
        .filter(|k| {
            let (va, vb) = (a[*k], b[*k]);
            va.signum() == vb.signum() || va == 0 || vb == 0
        })
        .count();
    matches as f64 / shared.len() as f64
}

fn cohen_kappa(a: &HashMap<(String, String), i8>, b: &HashMap<(String, String), i8>) -> Option<f64> {
    let shared: Vec<_> = a.keys().filter(|k| b.contains_key(*k)).collect();
    if shared.is_empty() {
        return None;
    }
    let n = shared.len() as f64;
    let observed = shared.iter().filter(|k| a[*k] == b[*k]).count() as f64 / n;

    let labels: HashSet<i8> = [-2, -1, 0, 1, 2].into_iter().collect();
    let mut expected = 0.0;
    for label in &labels {
        let p_a = shared.iter().filter(|k| a[*k] == *label).count() as f64 / n;
        let p_b = shared.iter().filter(|k| b[*k] == *label).count() as f64 / n;
        expected += p_a * p_b;
    }

    if (1.0 - expected).abs() < 1e-9 {
        return None;
    }
    Some((observed - expected) / (1.0 - expected))
}

/// The `judge x judge` agreement matrix; diagonal is always 1.0.
pub struct JudgeAgreementAnalyzer {
    by_judge: HashMap<String, HashMap<(String, String), i8>>,
}

impl JudgeAgreementAnalyzer {
    pub fn new(records: &[PairwiseRecord]) -> Self {
        Self {
            by_judge: ratings_by_judge(records),
        }
    }

    pub fn judges(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_judge.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn calculate_agreement(&self, judge_a: &str, judge_b: &str) -> AgreementMetrics {
        let empty = HashMap::new();
        let a = self.by_judge.get(judge_a).unwrap_or(&empty);
        let b = self.by_judge.get(judge_b).unwrap_or(&empty);
        let (exact, shared) = exact_agreement(a, b);
        AgreementMetrics {
            exact_agreement: exact,
            sidewise_agreement: sidewise_agreement(a, b),
            cohen_kappa: cohen_kappa(a, b),
            shared_comparisons: shared,
        }
    }

    pub fn get_agreement_matrix(&self) -> HashMap<(String, String), f64> {
        let judges = self.judges();
        let mut matrix = HashMap::new();
        for i in &judges {
            for j in &judges {
                let value = if i == j {
                    1.0
                } else {
                    self.calculate_agreement(i, j).exact_agreement
                };
                matrix.insert((i.clone(), j.clone()), value);
            }
        }
        matrix
    }

    pub fn get_mean_agreement(&self, judge: &str) -> f64 {
        let judges: Vec<String> = self.judges().into_iter().filter(|j| j != judge).collect();
        if judges.is_empty() {
            return 1.0;
        }
        let sum: f64 = judges
            .iter()
            .map(|other| self.calculate_agreement(judge, other).exact_agreement)
            .sum();
        sum / judges.len() as f64
    }

    fn ranking_scores(&self) -> HashMap<(String, String), Vec<i8>> {
        let mut scores: HashMap<(String, String), Vec<i8>> = HashMap::new();
        for ratings in self.by_judge.values() {
            for (key, sign) in ratings {
                scores.entry(key.clone()).or_default().push(*sign);
            }
        }
        scores
    }

    /// Items with an identical rank across at least two judges.
    pub fn find_consensus_items(&self) -> Vec<(String, String)> {
        self.ranking_scores()
            .into_iter()
            .filter(|(_, signs)| signs.len() >= 2 && signs.iter().all(|s| *s == signs[0]))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn find_disputed_items(&self) -> Vec<(String, String)> {
        self.ranking_scores()
            .into_iter()
            .filter(|(_, signs)| signs.len() >= 2 && !signs.iter().all(|s| *s == signs[0]))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn summarize(&self) -> HashMap<String, f64> {
        let judges = self.judges();
        judges
            .iter()
            .map(|j| (j.clone(), self.get_mean_agreement(j)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::Margin;

    fn rec(judge: &str, a: &str, b: &str, winner: Winner) -> PairwiseRecord {
        PairwiseRecord {
            judge_model: judge.into(),
            item_a: a.into(),
            item_b: b.into(),
            winner,
            margin: Margin::Minor,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn diagonal_is_one() {
        let records = vec![rec("j1", "r1", "r2", Winner::A)];
        let analyzer = JudgeAgreementAnalyzer::new(&records);
        let matrix = analyzer.get_agreement_matrix();
        assert_eq!(matrix[&("j1".to_string(), "j1".to_string())], 1.0);
    }

    #[test]
    fn agreeing_judges_score_one() {
        let records = vec![
            rec("j1", "r1", "r2", Winner::A),
            rec("j2", "r1", "r2", Winner::A),
        ];
        let analyzer = JudgeAgreementAnalyzer::new(&records);
        assert_eq!(analyzer.calculate_agreement("j1", "j2").exact_agreement, 1.0);
    }

    #[test]
    fn same_side_different_margin_agrees_sidewise_not_exact() {
        let records = vec![
            PairwiseRecord {
                judge_model: "j1".into(),
                item_a: "r1".into(),
                item_b: "r2".into(),
                winner: Winner::A,
                margin: Margin::Minor,
                metadata: serde_json::Value::Null,
            },
            PairwiseRecord {
                judge_model: "j2".into(),
                item_a: "r1".into(),
                item_b: "r2".into(),
                winner: Winner::A,
                margin: Margin::Major,
                metadata: serde_json::Value::Null,
            },
        ];
        let analyzer = JudgeAgreementAnalyzer::new(&records);
        let agreement = analyzer.calculate_agreement("j1", "j2");
        assert_eq!(agreement.exact_agreement, 0.0);
        assert_eq!(agreement.sidewise_agreement, 1.0);
    }

    #[test]
    fn disagreeing_judges_score_zero_exact() {
        let records = vec![
            rec("j1", "r1", "r2", Winner::A),
            rec("j2", "r1", "r2", Winner::B),
        ];
        let analyzer = JudgeAgreementAnalyzer::new(&records);
        assert_eq!(analyzer.calculate_agreement("j1", "j2").exact_agreement, 0.0);
    }

    #[test]
    fn consensus_vs_disputed() {
        let records = vec![
            rec("j1", "r1", "r2", Winner::A),
            rec("j2", "r1", "r2", Winner::A),
            rec("j1", "r2", "r3", Winner::A),
            rec("j2", "r2", "r3", Winner::B),
        ];
        let analyzer = JudgeAgreementAnalyzer::new(&records);
        assert!(analyzer.find_consensus_items().contains(&("r1".to_string(), "r2".to_string())));
        assert!(analyzer.find_disputed_items().contains(&("r2".to_string(), "r3".to_string())));
    }
}
