//! Property-based tests for the permutation-invariance and closed-form
//! guarantees called out in the aggregation design.

use llm_council::{aggregation::borda, Margin, PairwiseRecord, Winner};
use proptest::prelude::*;

fn arb_margin() -> impl Strategy<Value = Margin> {
    prop_oneof![Just(Margin::Major), Just(Margin::Minor), Just(Margin::Tie)]
}

fn arb_winner_for_margin(margin: Margin) -> impl Strategy<Value = Winner> {
    if margin == Margin::Tie {
        Just(Winner::Tie).boxed()
    } else {
        prop_oneof![Just(Winner::A), Just(Winner::B)].boxed()
    }
}

fn arb_record(items: &[&'static str]) -> impl Strategy<Value = PairwiseRecord> {
    let items = items.to_vec();
    (0..items.len(), 0..items.len(), arb_margin()).prop_flat_map(move |(i, j, margin)| {
        let items = items.clone();
        arb_winner_for_margin(margin).prop_map(move |winner| PairwiseRecord {
            judge_model: "judge".to_string(),
            item_a: items[i].to_string(),
            item_b: items[(j + 1) % items.len()].to_string(),
            winner,
            margin,
            metadata: serde_json::Value::Null,
        })
    })
}

proptest! {
    #[test]
    fn borda_is_invariant_under_record_permutation(
        records in prop::collection::vec(arb_record(&["r1", "r2", "r3", "r4"]), 0..30),
        seed in any::<u64>(),
    ) {
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut shuffled = records.clone();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        shuffled.shuffle(&mut rng);

        let original_scores = borda::aggregate(&records).scores;
        let shuffled_scores = borda::aggregate(&shuffled).scores;

        for (key, value) in &original_scores {
            let other = shuffled_scores.get(key).copied().unwrap_or(0.0);
            prop_assert!((value - other).abs() < 1e-9);
        }
    }

    #[test]
    fn parse_ranking_with_ensure_all_is_permutation_of_valid_labels(
        present in prop::collection::vec(0usize..4, 0..4),
        extra_text in ".*",
    ) {
        let valid_labels: Vec<String> = vec!["A1".into(), "A2".into(), "A3".into(), "A4".into()];
        let text = present
            .iter()
            .map(|i| valid_labels[*i].clone())
            .collect::<Vec<_>>()
            .join(" > ");
        let text = format!("{extra_text} {text}");

        let result = llm_council::anonymize::parse_ranking(&text, &valid_labels, true);
        let mut sorted_result = result.clone();
        sorted_result.sort();
        let mut sorted_labels = valid_labels.clone();
        sorted_labels.sort();
        prop_assert_eq!(sorted_result, sorted_labels);
    }
}
