//! LLM Council: a multi-model deliberation engine.
//!
//! Given a task and a roster of role-based participants, the council queries
//! every role in parallel, has the roles judge each other's anonymized
//! answers through pairwise comparison, aggregates those comparisons into
//! rankings by three independent methods, and optionally asks a chairman
//! model to synthesize a final answer.

pub mod aggregation;
pub mod agreement;
pub mod anonymize;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod judging;
pub mod prompts;
pub mod provider;
pub mod role;
pub mod verdict;

pub use config::{AggregationMethod, CouncilConfig, OutputMode};
pub use coordinator::{compute_scores_from_pairwise, Council, DeliberationMetadata, DeliberationOutput};
pub use error::{CouncilError, CouncilResult};
pub use provider::{GenerationResult, PlaceholderProvider, Provider};
pub use role::{Registry, Role, RoleResult, SamplingConfig};
pub use verdict::{Margin, PairwiseRecord, PairwiseVerdict, Winner};
