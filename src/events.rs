//! Streaming event model: an optional callback surface a host can use to
//! observe a deliberation in progress. The core never depends on events
//! being consumed; emission is best-effort.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    RoleStart {
        role_name: String,
        timestamp: DateTime<Utc>,
    },
    RoleChunk {
        role_name: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
    RoleComplete {
        role_name: String,
        timestamp: DateTime<Utc>,
    },
    RoleError {
        role_name: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    SynthesisStart {
        timestamp: DateTime<Utc>,
    },
    SynthesisChunk {
        content: String,
        timestamp: DateTime<Utc>,
    },
    SynthesisComplete {
        timestamp: DateTime<Utc>,
    },
    Complete {
        timestamp: DateTime<Utc>,
    },
    Error {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

/// A sink a host implements to observe deliberation progress. The default
/// no-op sink is used when the caller doesn't care about streaming.
#[async_trait]
pub trait StreamSink: Send + Sync {
    async fn emit(&self, event: StreamEvent);
}

#[derive(Debug, Clone, Default)]
pub struct NullSink;

#[async_trait]
impl StreamSink for NullSink {
    async fn emit(&self, _event: StreamEvent) {}
}
