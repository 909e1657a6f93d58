//! Level-by-level concurrent role execution: each DAG level is dispatched
//! as a `JoinSet` barrier, with completed dependency content prepended to
//! dependents' prompts before they run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::coordinator::dag::topological_levels;
use crate::error::CouncilError;
use crate::events::{StreamEvent, StreamSink};
use crate::prompts::individual_answer_prompt;
use crate::provider::Provider;
use crate::role::{Registry, RoleResult};

pub async fn execute_roles(
    task: &str,
    registry: &Registry,
    provider: Arc<dyn Provider>,
    sink: Arc<dyn StreamSink>,
    call_timeout: Duration,
    cancellation: CancellationToken,
) -> crate::error::CouncilResult<Vec<RoleResult>> {
    let levels = topological_levels(registry)?;
    let mut completed: HashMap<String, RoleResult> = HashMap::new();

    for level in levels {
        if cancellation.is_cancelled() {
            return Err(CouncilError::Cancelled);
        }

        let mut set: JoinSet<RoleResult> = JoinSet::new();
        for name in &level {
            let role = registry.get(name)?.clone();
            let provider = provider.clone();
            let sink = sink.clone();
            let dependency_context: String = role
                .depends_on
                .iter()
                .filter_map(|dep| completed.get(dep))
                .map(|r| format!("--- {} said ---\n{}\n", r.role_name, r.content))
                .collect();
            let task = task.to_string();
            let cancellation = cancellation.clone();

            set.spawn(async move {
                sink.emit(StreamEvent::RoleStart {
                    role_name: role.name.clone(),
                    timestamp: chrono::Utc::now(),
                })
                .await;

                let prompt = if dependency_context.is_empty() {
                    individual_answer_prompt(&role.prompt, &task)
                } else {
                    format!("{dependency_context}\n{}", individual_answer_prompt(&role.prompt, &task))
                };

                let started = std::time::Instant::now();
                enum Outcome {
                    Finished(crate::provider::GenerationResult),
                    TimedOut,
                    Cancelled,
                }
                let outcome = tokio::select! {
                    _ = cancellation.cancelled() => Outcome::Cancelled,
                    generation = tokio::time::timeout(call_timeout, provider.generate(&prompt, &role.model, &role.sampling)) => {
                        match generation {
                            Ok(result) => Outcome::Finished(result),
                            Err(_) => Outcome::TimedOut,
                        }
                    }
                };

                let result = match outcome {
                    Outcome::Finished(result) if result.is_success() => {
                        sink.emit(StreamEvent::RoleComplete {
                            role_name: role.name.clone(),
                            timestamp: chrono::Utc::now(),
                        })
                        .await;
                        RoleResult {
                            role_name: role.name.clone(),
                            content: result.content,
                            model: result.model,
                            tokens_used: result.tokens_used,
                            latency_ms: result.latency_ms.or(Some(started.elapsed().as_millis() as u64)),
                            error: None,
                        }
                    }
                    Outcome::Finished(result) => {
                        let message = result.error.unwrap_or_else(|| "unknown provider error".to_string());
                        sink.emit(StreamEvent::RoleError {
                            role_name: role.name.clone(),
                            error: message.clone(),
                            timestamp: chrono::Utc::now(),
                        })
                        .await;
                        RoleResult {
                            role_name: role.name.clone(),
                            content: String::new(),
                            model: role.model.clone(),
                            tokens_used: None,
                            latency_ms: None,
                            error: Some(message),
                        }
                    }
                    Outcome::TimedOut => {
                        let message = "provider call timed out".to_string();
                        sink.emit(StreamEvent::RoleError {
                            role_name: role.name.clone(),
                            error: message.clone(),
                            timestamp: chrono::Utc::now(),
                        })
                        .await;
                        RoleResult {
                            role_name: role.name.clone(),
                            content: String::new(),
                            model: role.model.clone(),
                            tokens_used: None,
                            latency_ms: None,
                            error: Some(message),
                        }
                    }
                    Outcome::Cancelled => RoleResult {
                        role_name: role.name.clone(),
                        content: String::new(),
                        model: role.model.clone(),
                        tokens_used: None,
                        latency_ms: None,
                        error: Some("cancelled".to_string()),
                    },
                };
                result
            });
        }

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    set.abort_all();
                    return Err(CouncilError::Cancelled);
                }
                joined = set.join_next() => {
                    let Some(joined) = joined else { break };
                    if let Ok(result) = joined {
                        completed.insert(result.role_name.clone(), result);
                    }
                }
            }
        }
    }

    // Preserve registry insertion order in the returned results.
    let ordered = registry
        .list_names()
        .iter()
        .filter_map(|name| completed.remove(name))
        .collect();
    Ok(ordered)
}
