//! The two-stage pipeline: gate chain, then handler chain.
//!
//! A run evaluates the gates first. A rejection ends the run as
//! [`RunOutcome::Rejected`] without consulting any handler; otherwise the
//! request is dispatched and the run reports whether any handler acted.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use relay_types::{Request, Result, RunOutcome};

use crate::builder::{ChainBuilder, ChainMember};
use crate::events::{EventEmitter, PipelineEvent};
use crate::gate::{Admission, Gate, GateChain};
use crate::handler::{DispatchMode, DispatchReport, Handler, HandlerChain};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Configuration for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub dispatch_mode: DispatchMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "pipeline".into(),
            dispatch_mode: DispatchMode::default(),
        }
    }
}

/// The result of a completed pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub pipeline: String,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub gates_evaluated: usize,
    pub rejected_by: Option<String>,
    pub handlers_visited: usize,
    pub matched: Vec<String>,
    pub stopped_by: Option<String>,
}

/// Owns a request and the two chains that process it.
pub struct Pipeline {
    request: Request,
    gates: Option<GateChain>,
    handlers: Option<HandlerChain>,
    config: PipelineConfig,
    events: EventEmitter,
}

/// Stage results gathered by [`Pipeline::execute`].
struct Stages {
    admission: Option<Admission>,
    dispatch: Option<DispatchReport>,
}

impl Stages {
    fn outcome(&self) -> RunOutcome {
        if self.admission.as_ref().is_some_and(|a| !a.admitted) {
            return RunOutcome::Rejected;
        }
        match &self.dispatch {
            Some(report) if report.any_matched() => RunOutcome::Handled,
            _ => RunOutcome::Unhandled,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

impl Pipeline {
    /// Start building a pipeline around `request`.
    pub fn builder(request: Request) -> PipelineBuilder {
        PipelineBuilder {
            request,
            config: PipelineConfig::default(),
            gates: Vec::new(),
            handlers: Vec::new(),
            events: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn gates(&self) -> Option<&GateChain> {
        self.gates.as_ref()
    }

    pub fn handlers(&self) -> Option<&HandlerChain> {
        self.handlers.as_ref()
    }

    /// Subscribe to this pipeline's run events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Run both stages against the pipeline's own request.
    pub fn run(&self) -> Result<RunReport> {
        self.run_request(&self.request)
    }

    /// Run both stages against `request`, reusing this pipeline's chains.
    ///
    /// A node failure aborts the run and is returned as the error; the chains
    /// stay usable for later runs.
    pub fn run_request(&self, request: &Request) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        tracing::info!(run_id = %run_id, pipeline = %self.config.name, "Pipeline run started");
        self.events.emit(PipelineEvent::RunStarted {
            run_id,
            pipeline_name: self.config.name.clone(),
            gate_count: self.gates.as_ref().map_or(0, |c| c.len()),
            handler_count: self.handlers.as_ref().map_or(0, |c| c.len()),
        });

        let stages = match self.execute(run_id, request) {
            Ok(stages) => stages,
            Err(e) => {
                tracing::warn!(
                    run_id = %run_id,
                    pipeline = %self.config.name,
                    error = %e,
                    "Pipeline run failed"
                );
                self.events.emit(PipelineEvent::RunFailed {
                    run_id,
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let outcome = stages.outcome();
        let duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            RunOutcome::Rejected => {
                tracing::info!(
                    run_id = %run_id,
                    outcome = %outcome,
                    "Request did not reach the handlers"
                )
            }
            RunOutcome::Unhandled => {
                tracing::info!(
                    run_id = %run_id,
                    outcome = %outcome,
                    "No handler applied to the request"
                )
            }
            RunOutcome::Handled => {
                tracing::info!(run_id = %run_id, outcome = %outcome, "Request handled")
            }
        }
        self.events.emit(PipelineEvent::RunCompleted {
            run_id,
            outcome,
            duration_ms,
        });

        let admission = stages.admission.unwrap_or(Admission {
            admitted: true,
            evaluated: 0,
            rejected_by: None,
        });
        let dispatch = stages.dispatch.unwrap_or_default();
        Ok(RunReport {
            run_id,
            pipeline: self.config.name.clone(),
            outcome,
            started_at,
            duration_ms,
            gates_evaluated: admission.evaluated,
            rejected_by: admission.rejected_by,
            handlers_visited: dispatch.visited,
            matched: dispatch.matched,
            stopped_by: dispatch.stopped_by,
        })
    }

    fn execute(&self, run_id: Uuid, request: &Request) -> Result<Stages> {
        // Stage 1: gates
        let admission = match &self.gates {
            Some(chain) => {
                let admission = chain.evaluate(request)?;
                self.events.emit(PipelineEvent::GateStageCompleted {
                    run_id,
                    admitted: admission.admitted,
                    evaluated: admission.evaluated,
                    rejected_by: admission.rejected_by.clone(),
                });
                if !admission.admitted {
                    return Ok(Stages {
                        admission: Some(admission),
                        dispatch: None,
                    });
                }
                Some(admission)
            }
            None => None,
        };

        // Stage 2: handlers
        let dispatch = match &self.handlers {
            Some(chain) => {
                let mut report = DispatchReport::default();
                let dispatched = chain.dispatch(request, self.config.dispatch_mode, &mut report);
                // Handlers that acted before a failure still get their event.
                for node_id in &report.matched {
                    self.events.emit(PipelineEvent::HandlerMatched {
                        run_id,
                        node_id: node_id.clone(),
                    });
                }
                dispatched?;
                self.events.emit(PipelineEvent::DispatchCompleted {
                    run_id,
                    visited: report.visited,
                    matched: report.matched.len(),
                });
                Some(report)
            }
            None => None,
        };

        Ok(Stages {
            admission,
            dispatch,
        })
    }
}

// ---------------------------------------------------------------------------
// PipelineBuilder
// ---------------------------------------------------------------------------

/// Collects chain members and configuration; [`build`](Self::build) performs
/// all construction-time validation.
pub struct PipelineBuilder {
    request: Request,
    config: PipelineConfig,
    gates: Vec<ChainMember>,
    handlers: Vec<ChainMember>,
    events: Option<EventEmitter>,
}

impl PipelineBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch_mode = mode;
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a gate to the gate chain.
    pub fn gate(mut self, gate: impl Gate + 'static) -> Self {
        self.gates.push(ChainMember::gate(gate));
        self
    }

    /// Append a handler to the handler chain.
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(ChainMember::handler(handler));
        self
    }

    /// Append late-bound members to the gate chain. Capability is checked in
    /// [`build`](Self::build).
    pub fn gate_members(mut self, members: impl IntoIterator<Item = ChainMember>) -> Self {
        self.gates.extend(members);
        self
    }

    /// Append late-bound members to the handler chain. Capability is checked in
    /// [`build`](Self::build).
    pub fn handler_members(mut self, members: impl IntoIterator<Item = ChainMember>) -> Self {
        self.handlers.extend(members);
        self
    }

    /// Use an existing emitter instead of a fresh one.
    pub fn events(mut self, emitter: EventEmitter) -> Self {
        self.events = Some(emitter);
        self
    }

    /// Link both chains. Fails with [`relay_types::RelayError::TypeMismatch`]
    /// if any member sits in the wrong chain.
    pub fn build(self) -> Result<Pipeline> {
        let gates = ChainBuilder::gates(self.gates)?;
        let handlers = ChainBuilder::handlers(self.handlers)?;
        tracing::debug!(
            pipeline = %self.config.name,
            gates = gates.as_ref().map_or(0, |c| c.len()),
            handlers = handlers.as_ref().map_or(0, |c| c.len()),
            "Pipeline built"
        );
        Ok(Pipeline {
            request: self.request,
            gates,
            handlers,
            config: self.config,
            events: self.events.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
