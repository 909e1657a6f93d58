//! Weighted Borda count: major wins score 3, minor wins score 1, ties split
//! 0.5 to each side. This matches the reference implementation's
//! `_borda_from_pairwise`, which is the source for the "ties split both
//! ways" resolution of the aggregation's only open question.

use crate::aggregation::{participants, AggregationScores};
use crate::verdict::{Margin, PairwiseRecord, Winner};

const MAJOR_WEIGHT: f64 = 3.0;
const MINOR_WEIGHT: f64 = 1.0;
const TIE_WEIGHT: f64 = 0.5;

pub fn aggregate(records: &[PairwiseRecord]) -> AggregationScores {
    let mut scores: std::collections::HashMap<String, f64> = participants(records)
        .into_iter()
        .map(|p| (p, 0.0))
        .collect();

    for record in records {
        match (record.winner, record.margin) {
            (Winner::A, Margin::Major) => {
                *scores.entry(record.item_a.clone()).or_insert(0.0) += MAJOR_WEIGHT;
            }
            (Winner::A, Margin::Minor) => {
                *scores.entry(record.item_a.clone()).or_insert(0.0) += MINOR_WEIGHT;
            }
            (Winner::B, Margin::Major) => {
                *scores.entry(record.item_b.clone()).or_insert(0.0) += MAJOR_WEIGHT;
            }
            (Winner::B, Margin::Minor) => {
                *scores.entry(record.item_b.clone()).or_insert(0.0) += MINOR_WEIGHT;
            }
            (Winner::Tie, _) => {
                *scores.entry(record.item_a.clone()).or_insert(0.0) += TIE_WEIGHT;
                *scores.entry(record.item_b.clone()).or_insert(0.0) += TIE_WEIGHT;
            }
            _ => {}
        }
    }

    AggregationScores {
        scores,
        confidence_intervals: None,
    }
}
