//! Layered configuration: compiled-in defaults, an optional config file,
//! then `COUNCIL_*` environment overrides. Validated once at construction,
//! never mid-deliberation, matching the fail-fast posture of `CouncilConfig`
//! in the system this crate is grounded on.

use serde::{Deserialize, Serialize};

use crate::error::{CouncilError, CouncilResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Synthesis,
    Perspectives,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    Borda,
    BradleyTerry,
    Elo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    pub output_mode: OutputMode,
    pub aggregation_method: AggregationMethod,
    pub enable_peer_review: bool,
    pub anonymize: bool,
    pub chairman_model: Option<String>,
    pub include_weights: bool,
    pub include_confidence: bool,

    pub judge_concurrency_limit: usize,
    pub provider_call_timeout_ms: u64,
    pub provider_connect_timeout_ms: u64,
    pub bootstrap_rounds: usize,
    pub elo_init_rating: f64,
    pub elo_scale: f64,
    pub elo_base: f64,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Both,
            aggregation_method: AggregationMethod::Elo,
            enable_peer_review: true,
            anonymize: true,
            chairman_model: None,
            include_weights: true,
            include_confidence: true,
            judge_concurrency_limit: 16,
            provider_call_timeout_ms: 120_000,
            provider_connect_timeout_ms: 10_000,
            bootstrap_rounds: 1000,
            elo_init_rating: crate::aggregation::elo::DEFAULT_INIT_RATING,
            elo_scale: crate::aggregation::elo::DEFAULT_SCALE,
            elo_base: crate::aggregation::elo::DEFAULT_BASE,
        }
    }
}

impl CouncilConfig {
    pub fn validate(&self) -> CouncilResult<()> {
        if self.judge_concurrency_limit == 0 {
            return Err(CouncilError::configuration(
                "judge_concurrency_limit must be > 0",
            ));
        }
        if self.bootstrap_rounds == 0 {
            return Err(CouncilError::configuration("bootstrap_rounds must be > 0"));
        }
        Ok(())
    }

    /// Build a config by layering compiled-in defaults, an optional file,
    /// then `COUNCIL_*` environment variables, validating the result.
    pub fn load(file_path: Option<&str>) -> CouncilResult<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).map_err(|e| {
                CouncilError::configuration(format!("failed to serialize defaults: {e}"))
            })?);

        if let Some(path) = file_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(config::Environment::with_prefix("COUNCIL").separator("__"));

        let built = builder
            .build()
            .map_err(|e| CouncilError::configuration(format!("failed to build config: {e}")))?;

        let parsed: CouncilConfig = built
            .try_deserialize()
            .map_err(|e| CouncilError::configuration(format!("failed to parse config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CouncilConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut config = CouncilConfig::default();
        config.judge_concurrency_limit = 0;
        assert!(config.validate().is_err());
    }
}
