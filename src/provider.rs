//! The `Provider` capability: the only boundary the core crosses to reach a
//! language model. Concrete remote providers (HTTP clients, rate limiters,
//! credential handling) are external collaborators and out of scope here.

use async_trait::async_trait;

use crate::role::SamplingConfig;

/// The outcome of a single completion request. Never constructed via a
/// panic/exception path: failures are reported through `error`.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub content: String,
    pub model: String,
    pub tokens_used: Option<u32>,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn success(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            tokens_used: None,
            latency_ms: None,
            error: None,
        }
    }

    pub fn failure(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            model: model.into(),
            tokens_used: None,
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Produce a completion for a prompt against a given model and sampling
/// configuration. Implementations must never panic on participant input;
/// all failure modes are reported via `GenerationResult::error`.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        sampling: &SamplingConfig,
    ) -> GenerationResult;

    /// Optional liveness probe; default assumes healthy.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Deterministic stand-in used when no real provider is configured, and in
/// tests. Mirrors the canned placeholder strings of the system this crate
/// reimplements so downstream behavior (parsing, aggregation) is exercised
/// even without network access.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderProvider;

#[async_trait]
impl Provider for PlaceholderProvider {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        _sampling: &SamplingConfig,
    ) -> GenerationResult {
        tracing::warn!(model, "using placeholder provider; no real model consulted");
        GenerationResult::success(format!("[Placeholder] response to: {prompt}"), model)
    }
}

/// A provider whose responses are scripted per-call, for deterministic tests.
pub struct ScriptedProvider<F>
where
    F: Fn(&str, &str, &SamplingConfig) -> GenerationResult + Send + Sync,
{
    script: F,
}

impl<F> ScriptedProvider<F>
where
    F: Fn(&str, &str, &SamplingConfig) -> GenerationResult + Send + Sync,
{
    pub fn new(script: F) -> Self {
        Self { script }
    }
}

#[async_trait]
impl<F> Provider for ScriptedProvider<F>
where
    F: Fn(&str, &str, &SamplingConfig) -> GenerationResult + Send + Sync,
{
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        sampling: &SamplingConfig,
    ) -> GenerationResult {
        (self.script)(prompt, model, sampling)
    }
}
