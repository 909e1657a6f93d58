//! The orchestrator: fans role execution out across the dependency DAG,
//! drives peer review and aggregation, and optionally invokes chairman
//! synthesis.

pub mod dag;
pub mod roles_exec;
pub mod synthesis;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregation::{borda, bradley_terry, elo, AllAggregationScores};
use crate::anonymize::anonymize;
use crate::config::{AggregationMethod, CouncilConfig, OutputMode};
use crate::error::{CouncilError, CouncilResult};
use crate::events::{NullSink, StreamEvent, StreamSink};
use crate::judging::conduct_peer_review;
use crate::provider::Provider;
use crate::role::{Registry, RoleResult};
use crate::verdict::PairwiseRecord;

/// The final result of one deliberation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationOutput {
    pub task: String,
    pub results: Vec<RoleResult>,
    pub synthesis: Option<String>,
    pub aggregate_rankings: HashMap<String, f64>,
    pub aggregation_scores: AllAggregationScores,
    pub peer_review_texts: HashMap<String, Vec<String>>,
    pub metadata: DeliberationMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliberationMetadata {
    pub deliberation_id: Uuid,
    pub successful_count: usize,
    pub failed_count: usize,
    pub dropped_judgments: usize,
    pub total_judgments: usize,
}

/// Given a pool of pairwise records, run all three aggregators. Each is
/// tried independently; a failure in one does not affect the others.
pub fn compute_scores_from_pairwise(records: &[PairwiseRecord], bootstrap_rounds: usize) -> AllAggregationScores {
    let mut out = AllAggregationScores::default();

    out.borda = borda::aggregate(records);

    match bradley_terry::aggregate(records) {
        Ok(scores) => out.bradley_terry = scores,
        Err(err) => tracing::warn!(%err, "bradley_terry aggregation failed"),
    }

    if records.len() >= 2 {
        out.elo = elo::bootstrap_elo(records, bootstrap_rounds, None);
    }

    out
}

/// The top-level deliberation driver.
pub struct Council {
    pub registry: Registry,
    pub provider: Arc<dyn Provider>,
    pub config: CouncilConfig,
    pub sink: Arc<dyn StreamSink>,
    pub cancellation: CancellationToken,
}

impl Council {
    pub fn new(registry: Registry, provider: Arc<dyn Provider>, config: CouncilConfig) -> CouncilResult<Self> {
        config.validate()?;
        registry.validate()?;
        Ok(Self {
            registry,
            provider,
            config,
            sink: Arc::new(NullSink),
            cancellation: CancellationToken::new(),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn StreamSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Share a cancellation token with the caller: cancelling it (e.g. from
    /// another task) aborts the deliberation at its next suspension point,
    /// returning `CouncilError::Cancelled` rather than a partial output.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// A clone of this council's cancellation token, for a caller that
    /// didn't supply its own via `with_cancellation`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    #[tracing::instrument(skip(self), fields(role_count = self.registry.len()))]
    pub async fn deliberate(&self, task: &str) -> CouncilResult<DeliberationOutput> {
        let deliberation_id = Uuid::new_v4();

        if task.trim().is_empty() {
            return Err(CouncilError::configuration("task must not be empty"));
        }
        if self.registry.is_empty() {
            return Err(CouncilError::configuration("registry must not be empty"));
        }
        if self.cancellation.is_cancelled() {
            return Err(CouncilError::Cancelled);
        }

        let call_timeout = Duration::from_millis(self.config.provider_call_timeout_ms);

        let results = {
            let _span = tracing::info_span!("role_execution").entered();
            let outcome = roles_exec::execute_roles(
                task,
                &self.registry,
                self.provider.clone(),
                self.sink.clone(),
                call_timeout,
                self.cancellation.clone(),
            )
            .await;
            match outcome {
                Ok(results) => results,
                Err(err) => {
                    self.sink
                        .emit(StreamEvent::Error {
                            error: err.to_string(),
                            timestamp: chrono::Utc::now(),
                        })
                        .await;
                    return Err(err);
                }
            }
        };

        let successful_count = results.iter().filter(|r| r.is_success()).count();
        let failed_count = results.len() - successful_count;

        let mut peer_review_texts: HashMap<String, Vec<String>> = HashMap::new();
        let mut aggregation_scores = AllAggregationScores::default();
        let mut aggregate_rankings = HashMap::new();
        let mut dropped_judgments = 0usize;
        let mut total_judgments = 0usize;

        if self.config.enable_peer_review && successful_count >= 2 {
            if self.cancellation.is_cancelled() {
                self.sink
                    .emit(StreamEvent::Error {
                        error: CouncilError::Cancelled.to_string(),
                        timestamp: chrono::Utc::now(),
                    })
                    .await;
                return Err(CouncilError::Cancelled);
            }

            let _span = tracing::info_span!("peer_review").entered();
            let successful: Vec<(crate::role::Role, String)> = results
                .iter()
                .filter(|r| r.is_success())
                .filter_map(|r| self.registry.get(&r.role_name).ok().map(|role| (role.clone(), r.content.clone())))
                .collect();

            let collection = anonymize(&successful, "A", self.config.anonymize, self.config.anonymize, None)?;
            let outcome = conduct_peer_review(
                task,
                &self.registry,
                &collection,
                self.provider.clone(),
                self.config.judge_concurrency_limit,
                self.cancellation.clone(),
            )
            .await;

            if outcome.cancelled {
                self.sink
                    .emit(StreamEvent::Error {
                        error: CouncilError::Cancelled.to_string(),
                        timestamp: chrono::Utc::now(),
                    })
                    .await;
                return Err(CouncilError::Cancelled);
            }

            dropped_judgments = outcome.dropped;
            total_judgments = outcome.records.len() + outcome.dropped;

            for (judge, text) in outcome.raw_reviews {
                peer_review_texts.entry(judge).or_default().push(text);
            }

            let _agg_span = tracing::info_span!("aggregation").entered();
            aggregation_scores = compute_scores_from_pairwise(&outcome.records, self.config.bootstrap_rounds);

            aggregate_rankings = match self.config.aggregation_method {
                AggregationMethod::Borda => aggregation_scores.borda.scores.clone(),
                AggregationMethod::BradleyTerry => aggregation_scores.bradley_terry.scores.clone(),
                AggregationMethod::Elo => aggregation_scores.elo.scores.clone(),
            };
        }

        if self.cancellation.is_cancelled() {
            self.sink
                .emit(StreamEvent::Error {
                    error: CouncilError::Cancelled.to_string(),
                    timestamp: chrono::Utc::now(),
                })
                .await;
            return Err(CouncilError::Cancelled);
        }

        let synthesis = if matches!(self.config.output_mode, OutputMode::Synthesis | OutputMode::Both) {
            let _span = tracing::info_span!("synthesis").entered();
            Some(
                synthesis::synthesize(
                    task,
                    &results,
                    &peer_review_texts,
                    self.config.chairman_model.as_deref(),
                    self.provider.clone(),
                    self.sink.clone(),
                )
                .await,
            )
        } else {
            None
        };

        self.sink
            .emit(StreamEvent::Complete {
                timestamp: chrono::Utc::now(),
            })
            .await;

        Ok(DeliberationOutput {
            task: task.to_string(),
            results,
            synthesis,
            aggregate_rankings,
            aggregation_scores,
            peer_review_texts,
            metadata: DeliberationMetadata {
                deliberation_id,
                successful_count,
                failed_count,
                dropped_judgments,
                total_judgments,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{GenerationResult, ScriptedProvider};
    use crate::role::Role;

    fn placeholder_registry(names: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for name in names {
            registry.add(Role::new(*name, "system prompt", "model")).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn two_roles_no_peer_review_yields_results_for_each() {
        let registry = placeholder_registry(&["alice", "bob"]);
        let provider: Arc<dyn Provider> = Arc::new(crate::provider::PlaceholderProvider);
        let mut config = CouncilConfig::default();
        config.enable_peer_review = false;
        config.output_mode = OutputMode::Perspectives;
        let council = Council::new(registry, provider, config).unwrap();
        let output = council.deliberate("hi").await.unwrap();
        assert_eq!(output.results.len(), 2);
        assert!(output.synthesis.is_none());
    }

    #[tokio::test]
    async fn all_roles_fail_returns_ok_output() {
        let registry = placeholder_registry(&["alice"]);
        let provider: Arc<dyn Provider> = Arc::new(ScriptedProvider::new(|_, model, _| {
            GenerationResult::failure(model, "boom")
        }));
        let config = CouncilConfig::default();
        let council = Council::new(registry, provider, config).unwrap();
        let output = council.deliberate("hi").await.unwrap();
        assert_eq!(output.metadata.successful_count, 0);
        assert!(output.aggregate_rankings.is_empty());
    }

    #[tokio::test]
    async fn empty_task_rejected() {
        let registry = placeholder_registry(&["alice"]);
        let provider: Arc<dyn Provider> = Arc::new(crate::provider::PlaceholderProvider);
        let council = Council::new(registry, provider, CouncilConfig::default()).unwrap();
        assert!(council.deliberate("").await.is_err());
    }

    #[tokio::test]
    async fn single_success_skips_peer_review() {
        let registry = placeholder_registry(&["alice"]);
        let provider: Arc<dyn Provider> = Arc::new(crate::provider::PlaceholderProvider);
        let mut config = CouncilConfig::default();
        config.output_mode = OutputMode::Perspectives;
        let council = Council::new(registry, provider, config).unwrap();
        let output = council.deliberate("hi").await.unwrap();
        assert!(output.aggregate_rankings.is_empty());
    }
}
