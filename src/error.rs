//! Error taxonomy for the council: configuration, provider, aggregation, and
//! peer-review failures. Matches the exception hierarchy of the system this
//! crate reimplements, but surfaced as explicit `Result`s rather than raised.

use thiserror::Error;

pub type CouncilResult<T> = Result<T, CouncilError>;

#[derive(Debug, Error)]
pub enum CouncilError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("provider '{model}' failed: {message}")]
    Provider { model: String, message: String },

    #[error("aggregation error in '{method}': {message}")]
    Aggregation { method: String, message: String },

    #[error("peer review error: {message}")]
    PeerReview { message: String },

    #[error("deliberation cancelled")]
    Cancelled,
}

impl CouncilError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn provider(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn aggregation(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Aggregation {
            method: method.into(),
            message: message.into(),
        }
    }

    pub fn peer_review(message: impl Into<String>) -> Self {
        Self::PeerReview {
            message: message.into(),
        }
    }
}
