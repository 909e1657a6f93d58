//! Elo ratings fit two ways: an online incremental update (the classical
//! chess-rating recurrence, offered as a convenience beyond what the
//! distilled spec asked for but present in the system this crate is
//! grounded on) and the maximum-likelihood fit used for the deliberation's
//! aggregate rankings, with bootstrap resampling for confidence intervals.
//!
//! The MLE fit follows the well-known logistic-regression reformulation of
//! Bradley-Terry (every battle row is coded with the winner's column at
//! `+ln(base)` and the loser's column at `-ln(base)`, target always 1, no
//! intercept) used by public chatbot-arena leaderboards. Because every
//! observation shares the same label, a bounded-iteration gradient ascent is
//! used in place of Newton-Raphson/IRLS: with no regularization, the
//! likelihood is monotonically increasing without a finite maximizer for a
//! perfectly separable tournament, so the reference implementation (and this
//! one) report the coefficients reached after a fixed number of iterations
//! rather than insisting on exact convergence.

use std::collections::{BTreeMap, HashMap};

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;

use crate::aggregation::{participants, AggregationScores};
use crate::verdict::{Margin, PairwiseRecord, Winner};

pub const DEFAULT_INIT_RATING: f64 = 1000.0;
pub const DEFAULT_SCALE: f64 = 400.0;
pub const DEFAULT_BASE: f64 = 10.0;
const DEFAULT_K_FACTOR: f64 = 32.0;
const MINOR_MARGIN_MULTIPLIER: f64 = 1.0;
const MAJOR_MARGIN_MULTIPLIER: f64 = 3.0;
const TIE_MARGIN_MULTIPLIER: f64 = 0.5;
const GRADIENT_ITERATIONS: usize = 200;
const GRADIENT_LEARNING_RATE: f64 = 0.05;
const BOOTSTRAP_ROUNDS_DEFAULT: usize = 1000;
const BOOTSTRAP_MIN_RECORDS_FOR_RESAMPLING: usize = 100;

/// Online incremental Elo rating, updated one comparison at a time. Useful
/// for live leaderboards; the deliberation's own aggregate ranking uses the
/// batch MLE fit below instead.
#[derive(Debug, Clone, Copy)]
pub struct EloRating {
    pub rating: f64,
    pub games: u32,
    pub wins: f64,
    pub losses: f64,
}

impl Default for EloRating {
    fn default() -> Self {
        Self {
            rating: DEFAULT_INIT_RATING,
            games: 0,
            wins: 0.0,
            losses: 0.0,
        }
    }
}

impl EloRating {
    pub fn expected_score(&self, opponent: &EloRating) -> f64 {
        1.0 / (1.0 + DEFAULT_BASE.powf((opponent.rating - self.rating) / DEFAULT_SCALE))
    }

    /// `score` is 1.0 for a win, 0.5 for a tie, 0.0 for a loss, scaled by the
    /// margin multiplier (major wins move the rating further per update).
    pub fn update(&mut self, opponent_rating: f64, score: f64, margin: Margin) {
        let expected = 1.0 / (1.0 + DEFAULT_BASE.powf((opponent_rating - self.rating) / DEFAULT_SCALE));
        let weight = match margin {
            Margin::Major => MAJOR_MARGIN_MULTIPLIER,
            Margin::Minor => MINOR_MARGIN_MULTIPLIER,
            Margin::Tie => TIE_MARGIN_MULTIPLIER,
        };
        self.rating += DEFAULT_K_FACTOR * weight * (score - expected);
        self.games += 1;
        if score > 0.5 {
            self.wins += 1.0;
        } else if score < 0.5 {
            self.losses += 1.0;
        }
    }
}

/// One battle: `winner` always occupies the positive design-matrix column.
struct Battle {
    winner: usize,
    loser: usize,
}

fn build_battles(records: &[PairwiseRecord], index: &HashMap<&str, usize>) -> Vec<Battle> {
    let mut battles = Vec::new();
    for record in records {
        let (Some(&a), Some(&b)) = (index.get(record.item_a.as_str()), index.get(record.item_b.as_str())) else {
            continue;
        };
        let repeat = match record.margin {
            Margin::Major => 3,
            _ => 1,
        };
        match record.winner {
            Winner::A => {
                for _ in 0..repeat {
                    battles.push(Battle { winner: a, loser: b });
                }
            }
            Winner::B => {
                for _ in 0..repeat {
                    battles.push(Battle { winner: b, loser: a });
                }
            }
            Winner::Tie => {
                battles.push(Battle { winner: a, loser: b });
                battles.push(Battle { winner: b, loser: a });
            }
        }
    }
    battles
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Fit Elo ratings by maximum likelihood over the battle design matrix,
/// anchored so `reference` sits exactly at `init_rating`.
pub fn compute_mle_elo(
    records: &[PairwiseRecord],
    reference: Option<&str>,
    init_rating: f64,
    scale: f64,
    base: f64,
) -> Option<HashMap<String, f64>> {
    let items = participants(records);
    if items.len() < 2 {
        return None;
    }
    let index: HashMap<&str, usize> = items.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect();
    let battles = build_battles(records, &index);
    if battles.is_empty() {
        return None;
    }

    let n_items = items.len();
    let n_rows = battles.len();
    let log_base = base.ln();

    let mut x = Array2::<f64>::zeros((n_rows, n_items));
    for (row, battle) in battles.iter().enumerate() {
        x[[row, battle.winner]] = log_base;
        x[[row, battle.loser]] = -log_base;
    }
    let y = Array1::<f64>::ones(n_rows);

    let mut beta = Array1::<f64>::zeros(n_items);
    for _ in 0..GRADIENT_ITERATIONS {
        let logits = x.dot(&beta);
        let preds = logits.mapv(sigmoid);
        let residual = &y - &preds;
        let gradient = x.t().dot(&residual) / (n_rows as f64);
        beta = &beta + &(gradient * GRADIENT_LEARNING_RATE);
    }

    let reference_idx = match reference {
        Some(name) => *index.get(name)?,
        None => 0,
    };
    let shift = beta[reference_idx];

    let mut ratings = BTreeMap::new();
    for (name, &idx) in &index {
        let elo = scale * (beta[idx] - shift) + init_rating;
        ratings.insert(name.to_string(), elo);
    }
    Some(ratings.into_iter().collect())
}

/// Resample records with replacement `rounds` times, refit MLE Elo each
/// time, and report the median plus 2.5/97.5 percentiles per participant.
/// Below `BOOTSTRAP_MIN_RECORDS_FOR_RESAMPLING` records the reference
/// implementation forgoes real resampling (there isn't enough data to make
/// it meaningful) but still runs `rounds` redundant refits of the same
/// sample; this crate keeps that behavior rather than silently "fixing" it.
pub fn bootstrap_elo(
    records: &[PairwiseRecord],
    rounds: usize,
    seed: Option<u64>,
) -> AggregationScores {
    let items = participants(records);
    if items.is_empty() || records.is_empty() {
        return AggregationScores::default();
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let resample_enabled = records.len() >= BOOTSTRAP_MIN_RECORDS_FOR_RESAMPLING;
    if !resample_enabled {
        tracing::debug!(
            record_count = records.len(),
            "bootstrap sample below resampling threshold; running redundant refits of the full sample"
        );
    }

    let mut samples: HashMap<String, Vec<f64>> = items.iter().map(|i| (i.clone(), Vec::new())).collect();
    let mut failed_iterations = 0usize;

    for _ in 0..rounds.max(1) {
        let sample: Vec<PairwiseRecord> = if resample_enabled {
            (0..records.len())
                .map(|_| records[rng.gen_range(0..records.len())].clone())
                .collect()
        } else {
            records.to_vec()
        };

        match compute_mle_elo(&sample, None, DEFAULT_INIT_RATING, DEFAULT_SCALE, DEFAULT_BASE) {
            Some(ratings) => {
                for (name, rating) in ratings {
                    samples.entry(name).or_default().push(rating);
                }
            }
            None => failed_iterations += 1,
        }
    }

    let mut scores = HashMap::new();
    let mut intervals = HashMap::new();
    for (name, mut values) in samples {
        if values.is_empty() {
            continue;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = percentile(&values, 50.0);
        let low = percentile(&values, 2.5);
        let high = percentile(&values, 97.5);
        scores.insert(name.clone(), median);
        intervals.insert(name, (low, high));
    }

    if failed_iterations > 0 {
        tracing::warn!(failed_iterations, "some bootstrap rounds failed to fit");
    }

    AggregationScores {
        scores,
        confidence_intervals: Some(intervals),
    }
}

fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Fraction of participant pairs whose 95% confidence intervals do not
/// overlap.
pub fn calculate_separability(scores: &AggregationScores) -> f64 {
    let Some(intervals) = &scores.confidence_intervals else {
        return 0.0;
    };
    let names: Vec<&String> = intervals.keys().collect();
    if names.len() < 2 {
        return 0.0;
    }
    let mut total = 0;
    let mut separable = 0;
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            total += 1;
            let (a_low, a_high) = intervals[names[i]];
            let (b_low, b_high) = intervals[names[j]];
            if a_high < b_low || b_high < a_low {
                separable += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        separable as f64 / total as f64
    }
}

/// Spread between the strongest and weakest participant's rating.
pub fn calculate_polarization(scores: &AggregationScores) -> f64 {
    let values: Vec<f64> = scores.scores.values().copied().collect();
    if values.is_empty() {
        return 0.0;
    }
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    max - min
}

/// Predicted win rate of `a` over `b` given fitted Elo ratings.
pub fn predict_win_rate(scores: &AggregationScores, a: &str, b: &str, scale: f64, base: f64) -> Option<f64> {
    let rating_a = *scores.scores.get(a)?;
    let rating_b = *scores.scores.get(b)?;
    Some(1.0 / (1.0 + base.powf((rating_b - rating_a) / scale)))
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
    fn reference_anchored_to_init_rating() {
        let records = vec![
            rec("r1", "r2", Winner::A, Margin::Major),
            rec("r2", "r3", Winner::A, Margin::Minor),
        ];
        let ratings = compute_mle_elo(&records, Some("r1"), DEFAULT_INIT_RATING, DEFAULT_SCALE, DEFAULT_BASE).unwrap();
        assert!((ratings["r1"] - DEFAULT_INIT_RATING).abs() < 1e-6);
    }

    #[test]
    fn winner_rated_above_loser() {
        let records = vec![
            rec("r1", "r2", Winner::A, Margin::Major),
            rec("r1", "r2", Winner::A, Margin::Major),
        ];
        let ratings = compute_mle_elo(&records, Some("r2"), DEFAULT_INIT_RATING, DEFAULT_SCALE, DEFAULT_BASE).unwrap();
        assert!(ratings["r1"] > ratings["r2"]);
    }

    #[test]
    fn too_few_participants_returns_none() {
        assert!(compute_mle_elo(&[], None, DEFAULT_INIT_RATING, DEFAULT_SCALE, DEFAULT_BASE).is_none());
    }

    #[test]
    fn bootstrap_ci_bounds_contain_median() {
        let records = vec![
            rec("r1", "r2", Winner::A, Margin::Major),
            rec("r2", "r3", Winner::A, Margin::Minor),
            rec("r1", "r3", Winner::A, Margin::Minor),
        ];
        let scores = bootstrap_elo(&records, 50, Some(42));
        for (name, &median) in &scores.scores {
            let (low, high) = scores.confidence_intervals.as_ref().unwrap()[name];
            assert!(low <= median + 1e-9);
            assert!(median <= high + 1e-9);
        }
    }

    #[test]
    fn bootstrap_seeded_reproducible() {
        let records = vec![
            rec("r1", "r2", Winner::A, Margin::Major),
            rec("r2", "r3", Winner::A, Margin::Minor),
        ];
        let first = bootstrap_elo(&records, 30, Some(7));
        let second = bootstrap_elo(&records, 30, Some(7));
        assert_eq!(first.scores, second.scores);
    }

    #[test]
    fn online_update_moves_winner_up() {
        let mut a = EloRating::default();
        let mut b = EloRating::default();
        let rating_b = b.rating;
        a.update(rating_b, 1.0, Margin::Minor);
        assert!(a.rating > DEFAULT_INIT_RATING);
    }
}
