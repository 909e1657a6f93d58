//! Pairwise judging dispatch: for every judge and every unordered pair of
//! anonymized responses, issue a comparison prompt and parse the verdict.
//! Bounded by a global concurrency cap.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::anonymize::{de_anonymize, AnonymizedCollection};
use crate::prompts::pairwise_comparison_prompt;
use crate::provider::Provider;
use crate::role::{Registry, SamplingConfig};
use crate::verdict::{parse_verdict, PairwiseRecord};

#[derive(Debug, Default)]
pub struct JudgingOutcome {
    pub records: Vec<PairwiseRecord>,
    pub raw_reviews: Vec<(String, String)>, // (judge_name, raw text)
    pub dropped: usize,
    pub cancelled: bool,
}

/// Run every judge against every unordered pair of anonymized responses,
/// concurrently, bounded by `concurrency_limit`. Verdicts are parsed against
/// the anonymized labels the judge actually saw, then resolved back to real
/// role names before being recorded — aggregation never sees ephemeral
/// labels. Cancelling `cancellation` aborts any in-flight judge calls.
pub async fn conduct_peer_review(
    task: &str,
    judges: &Registry,
    collection: &AnonymizedCollection,
    provider: Arc<dyn Provider>,
    concurrency_limit: usize,
    cancellation: CancellationToken,
) -> JudgingOutcome {
    let labels = collection.labels();
    let mut pairs = Vec::new();
    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            pairs.push((labels[i].to_string(), labels[j].to_string()));
        }
    }

    let semaphore = Arc::new(Semaphore::new(concurrency_limit.max(1)));
    let mut set: JoinSet<(String, String, String, Option<String>)> = JoinSet::new();

    for judge in judges.iter() {
        for (id_a, id_b) in &pairs {
            let judge_model = judge.model.clone();
            let id_a = id_a.clone();
            let id_b = id_b.clone();
            let content_a = collection.get(&id_a).map(|i| i.content.clone()).unwrap_or_default();
            let content_b = collection.get(&id_b).map(|i| i.content.clone()).unwrap_or_default();
            let prompt = pairwise_comparison_prompt(task, &id_a, &id_b, &content_a, &content_b);
            let provider = provider.clone();
            let semaphore = semaphore.clone();
            let cancellation = cancellation.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let sampling = SamplingConfig::judge_defaults();
                tokio::select! {
                    _ = cancellation.cancelled() => (judge_model, id_a, id_b, None),
                    result = provider.generate(&prompt, &judge_model, &sampling) => {
                        if result.is_success() {
                            (judge_model, id_a, id_b, Some(result.content))
                        } else {
                            (judge_model, id_a, id_b, None)
                        }
                    }
                }
            });
        }
    }

    let mut outcome = JudgingOutcome::default();
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => {
                set.abort_all();
                outcome.cancelled = true;
                break;
            }
            joined = set.join_next() => {
                let Some(joined) = joined else { break };
                let Ok((judge_model, id_a, id_b, maybe_text)) = joined else {
                    outcome.dropped += 1;
                    continue;
                };
                let Some(text) = maybe_text else {
                    outcome.dropped += 1;
                    continue;
                };
                match parse_verdict(&text, &id_a, &id_b) {
                    Some(verdict) => {
                        let role_a = collection.get(&id_a).map(|i| i.role_name.clone()).unwrap_or_else(|| id_a.clone());
                        let role_b = collection.get(&id_b).map(|i| i.role_name.clone()).unwrap_or_else(|| id_b.clone());
                        outcome
                            .records
                            .push(PairwiseRecord::new(judge_model.clone(), role_a.clone(), role_b.clone(), verdict));
                        outcome.raw_reviews.push((
                            judge_model,
                            format!("Comparing {role_a} vs {role_b}:\n{}", de_anonymize(collection, &text)),
                        ));
                    }
                    None => outcome.dropped += 1,
                }
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymize::anonymize;
    use crate::provider::{GenerationResult, ScriptedProvider};
    use crate::role::Role;

    #[tokio::test]
    async fn dispatches_all_pairs_and_parses_verdicts() {
        let alice = Role::new("alice", "p", "m1");
        let bob = Role::new("bob", "p", "m2");
        let results = vec![
            (alice.clone(), "answer one".to_string()),
            (bob.clone(), "answer two".to_string()),
        ];
        let collection = anonymize(&results, "A", true, false, None).unwrap();

        let mut judges = Registry::new();
        judges.add(Role::new("judge1", "p", "judge-model")).unwrap();

        let provider: Arc<dyn Provider> = Arc::new(ScriptedProvider::new(|_, model, _| {
            GenerationResult::success("[[A1≫A2]]", model)
        }));

        let outcome = conduct_peer_review("task", &judges, &collection, provider, 4, CancellationToken::new()).await;
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.records[0].item_a, "alice");
        assert_eq!(outcome.records[0].item_b, "bob");
        assert!(outcome.raw_reviews[0].1.contains("alice"));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_reviews() {
        let alice = Role::new("alice", "p", "m1");
        let bob = Role::new("bob", "p", "m2");
        let results = vec![
            (alice, "answer one".to_string()),
            (bob, "answer two".to_string()),
        ];
        let collection = anonymize(&results, "A", true, false, None).unwrap();
        let mut judges = Registry::new();
        judges.add(Role::new("judge1", "p", "judge-model")).unwrap();

        let provider: Arc<dyn Provider> = Arc::new(ScriptedProvider::new(|_, model, _| {
            GenerationResult::success("[[A1≫A2]]", model)
        }));

        let token = CancellationToken::new();
        token.cancel();
        let outcome = conduct_peer_review("task", &judges, &collection, provider, 4, token).await;
        assert!(outcome.cancelled);
        assert!(outcome.records.is_empty());
    }

    #[tokio::test]
    async fn unparseable_judgment_is_dropped() {
        let alice = Role::new("alice", "p", "m1");
        let bob = Role::new("bob", "p", "m2");
        let results = vec![
            (alice, "answer one".to_string()),
            (bob, "answer two".to_string()),
        ];
        let collection = anonymize(&results, "A", true, false, None).unwrap();
        let mut judges = Registry::new();
        judges.add(Role::new("judge1", "p", "judge-model")).unwrap();

        let provider: Arc<dyn Provider> = Arc::new(ScriptedProvider::new(|_, model, _| {
            GenerationResult::success("I cannot decide.", model)
        }));

        let outcome = conduct_peer_review("task", &judges, &collection, provider, 4, CancellationToken::new()).await;
        assert_eq!(outcome.records.len(), 0);
        assert_eq!(outcome.dropped, 1);
    }
}
