//! Pipeline event system for observability.
//!
//! Emits [`PipelineEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! external observers (loggers, metrics collectors, audit trails) can follow
//! pipeline runs without coupling to the pipeline internals. Sending never
//! blocks, so synchronous runs can emit freely.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use relay_types::RunOutcome;

/// Events emitted during a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    RunStarted {
        run_id: Uuid,
        pipeline_name: String,
        gate_count: usize,
        handler_count: usize,
    },
    GateStageCompleted {
        run_id: Uuid,
        admitted: bool,
        evaluated: usize,
        rejected_by: Option<String>,
    },
    HandlerMatched {
        run_id: Uuid,
        node_id: String,
    },
    DispatchCompleted {
        run_id: Uuid,
        visited: usize,
        matched: usize,
    },
    RunCompleted {
        run_id: Uuid,
        outcome: RunOutcome,
        duration_ms: u64,
    },
    RunFailed {
        run_id: Uuid,
        error: String,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<PipelineEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
