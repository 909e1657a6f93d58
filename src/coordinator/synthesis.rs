//! Chairman synthesis: a final free-text answer conditioned on all role
//! responses and peer reviews. Failure here never aborts the deliberation —
//! it is recorded as the synthesis text itself, matching the reference
//! implementation's `f"Synthesis failed: {e}"` convention.

use std::sync::Arc;

use crate::events::{StreamEvent, StreamSink};
use crate::prompts::chairman_synthesis_prompt;
use crate::provider::Provider;
use crate::role::{RoleResult, SamplingConfig};

const DEFAULT_CHAIRMAN_MODEL: &str = "gpt-4";
const SYNTHESIS_TEMPERATURE: f64 = 0.7;
const SYNTHESIS_MAX_TOKENS: u32 = 4000;

pub async fn synthesize(
    task: &str,
    results: &[RoleResult],
    peer_review_texts: &std::collections::HashMap<String, Vec<String>>,
    chairman_model: Option<&str>,
    provider: Arc<dyn Provider>,
    sink: Arc<dyn StreamSink>,
) -> String {
    sink.emit(StreamEvent::SynthesisStart {
        timestamp: chrono::Utc::now(),
    })
    .await;

    let stage1_responses = results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| format!("{}: {}", r.role_name, r.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let stage2_reviews = peer_review_texts
        .iter()
        .flat_map(|(judge, reviews)| reviews.iter().map(move |r| format!("{judge}: {r}")))
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = chairman_synthesis_prompt(task, &stage1_responses, &stage2_reviews);
    let model = chairman_model.unwrap_or(DEFAULT_CHAIRMAN_MODEL);
    let sampling = SamplingConfig {
        temperature: SYNTHESIS_TEMPERATURE,
        max_tokens: Some(SYNTHESIS_MAX_TOKENS),
        ..SamplingConfig::default()
    };

    let result = provider.generate(&prompt, model, &sampling).await;
    let content = if result.is_success() {
        result.content
    } else {
        format!(
            "Synthesis failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        )
    };

    sink.emit(StreamEvent::SynthesisChunk {
        content: content.clone(),
        timestamp: chrono::Utc::now(),
    })
    .await;
    sink.emit(StreamEvent::SynthesisComplete {
        timestamp: chrono::Utc::now(),
    })
    .await;

    content
}
