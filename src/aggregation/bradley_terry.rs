//! Bradley-Terry strength estimation via minorization-maximization iterative
//! scaling. Major wins count as 3 wins, minor wins as 1, ties as 0.5 to each
//! direction, matching `BradleyTerryAnalyzer` in the reference
//! implementation this crate is grounded on.

use std::collections::{BTreeMap, HashMap};

use crate::aggregation::{participants, AggregationScores};
use crate::error::{CouncilError, CouncilResult};
use crate::verdict::{Margin, PairwiseRecord, Winner};

const MAJOR_WIN_MULTIPLIER: f64 = 3.0;
const MINOR_WIN_WEIGHT: f64 = 1.0;
const TIE_WEIGHT: f64 = 0.5;
const FLOOR: f64 = 1e-10;
const MAX_ITER: usize = 100;
const TOLERANCE: f64 = 1e-6;

/// Weighted win matrix: `wins[i][j]` = weighted count of i beating j.
fn build_win_matrix(records: &[PairwiseRecord], items: &[String]) -> Vec<Vec<f64>> {
    let index: HashMap<&str, usize> = items.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();
    let n = items.len();
    let mut wins = vec![vec![0.0; n]; n];

    for record in records {
        let Some(&i) = index.get(record.item_a.as_str()) else { continue };
        let Some(&j) = index.get(record.item_b.as_str()) else { continue };
        match (record.winner, record.margin) {
            (Winner::A, Margin::Major) => wins[i][j] += MAJOR_WIN_MULTIPLIER,
            (Winner::A, Margin::Minor) => wins[i][j] += MINOR_WIN_WEIGHT,
            (Winner::B, Margin::Major) => wins[j][i] += MAJOR_WIN_MULTIPLIER,
            (Winner::B, Margin::Minor) => wins[j][i] += MINOR_WIN_WEIGHT,
            (Winner::Tie, _) => {
                wins[i][j] += TIE_WEIGHT;
                wins[j][i] += TIE_WEIGHT;
            }
        }
    }
    wins
}

fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let log_sum: f64 = values.iter().map(|v| v.max(FLOOR).ln()).sum();
    (log_sum / values.len() as f64).exp()
}

pub fn aggregate(records: &[PairwiseRecord]) -> CouncilResult<AggregationScores> {
    let items = participants(records);
    if items.is_empty() {
        return Ok(AggregationScores::default());
    }

    let wins = build_win_matrix(records, &items);
    let n = items.len();
    let mut pi = vec![1.0_f64; n];

    for _ in 0..MAX_ITER {
        let mut next = vec![0.0_f64; n];
        let mut max_delta = 0.0_f64;

        for i in 0..n {
            let numerator: f64 = (0..n).map(|j| wins[i][j]).sum();
            let denominator: f64 = (0..n)
                .filter(|&j| j != i)
                .map(|j| (wins[i][j] + wins[j][i]) / (pi[i] + pi[j]))
                .sum();
            next[i] = if denominator > 0.0 {
                (numerator / denominator).max(FLOOR)
            } else {
                pi[i]
            };
        }

        let mean = geometric_mean(&next);
        for v in next.iter_mut() {
            *v /= mean;
        }

        for i in 0..n {
            max_delta = max_delta.max((next[i] - pi[i]).abs());
        }
        pi = next;

        if max_delta < TOLERANCE {
            break;
        }
    }

    if pi.iter().any(|v| !v.is_finite()) {
        return Err(CouncilError::aggregation(
            "bradley_terry",
            "iterative scaling produced a non-finite strength",
        ));
    }

    let scores: BTreeMap<String, f64> = items.into_iter().zip(pi).collect();
    Ok(AggregationScores {
        scores: scores.into_iter().collect(),
        confidence_intervals: None,
    })
}

/// Probability that `a` beats `b` given fitted strengths.
pub fn win_probability(scores: &AggregationScores, a: &str, b: &str) -> Option<f64> {
    let pi_a = *scores.scores.get(a)?;
    let pi_b = *scores.scores.get(b)?;
    Some(pi_a / (pi_a + pi_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(a: &str, b: &str, winner: Winner, margin: Margin) -> PairwiseRecord {
        PairwiseRecord {
            judge_model: "judge".into(),
            item_a: a.into(),
            item_b: b.into(),
            winner,
            margin,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn dominant_winner_scores_higher() {
        let records = vec![
            rec("r1", "r2", Winner::A, Margin::Major),
            rec("r1", "r2", Winner::A, Margin::Major),
            rec("r1", "r2", Winner::A, Margin::Major),
        ];
        let scores = aggregate(&records).unwrap();
        assert!(scores.scores["r1"] > scores.scores["r2"]);
    }

    #[test]
    fn ties_converge_to_uniform() {
        let records = vec![rec("r1", "r2", Winner::Tie, Margin::Tie)];
        let scores = aggregate(&records).unwrap();
        assert!((scores.scores["r1"] - scores.scores["r2"]).abs() < 1e-6);
    }

    #[test]
    fn empty_records_yield_empty_scores() {
        let scores = aggregate(&[]).unwrap();
        assert!(scores.scores.is_empty());
    }

    #[test]
    fn geometric_mean_normalization() {
        let records = vec![
            rec("r1", "r2", Winner::A, Margin::Minor),
            rec("r2", "r3", Winner::A, Margin::Minor),
            rec("r3", "r1", Winner::A, Margin::Minor),
        ];
        let scores = aggregate(&records).unwrap();
        let values: Vec<f64> = scores.scores.values().copied().collect();
        assert!((geometric_mean(&values) - 1.0).abs() < 1e-3);
    }
}
