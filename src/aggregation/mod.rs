//! The three aggregation methods that convert pairwise verdicts into global
//! rankings, plus the shared score container.

pub mod borda;
pub mod bradley_terry;
pub mod elo;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Scores produced by one aggregation method. Only Elo populates
/// `confidence_intervals`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationScores {
    pub scores: HashMap<String, f64>,
    pub confidence_intervals: Option<HashMap<String, (f64, f64)>>,
}

/// All three methods' output for one set of pairwise records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllAggregationScores {
    pub borda: AggregationScores,
    pub bradley_terry: AggregationScores,
    pub elo: AggregationScores,
}

/// Collect the distinct participant identifiers referenced by a set of
/// records, sorted, so that matrix-building iteration order never affects
/// the resulting scores.
pub(crate) fn participants(records: &[crate::verdict::PairwiseRecord]) -> Vec<String> {
    let mut set: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    for record in records {
        set.insert(record.item_a.clone());
        set.insert(record.item_b.clone());
    }
    set.into_iter().collect()
}
