//! Gate and handler chains, chain construction, and the two-stage pipeline.
//!
//! A [`Pipeline`] runs a request through a gate chain (every gate must admit,
//! first rejection wins) and then a handler chain (every applicable handler
//! acts). Chains are built from typed nodes or, via [`NodeRegistry`] and
//! [`PipelineDefinition`], from JSON definitions.

pub mod builder;
pub mod chain;
pub mod definition;
pub mod events;
pub mod gate;
pub mod handler;
pub mod nodes;
pub mod pipeline;
pub mod registry;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use builder::{ChainBuilder, ChainMember};
pub use chain::{Chain, Walk};
pub use definition::{NodeDefinition, PipelineDefinition};
pub use events::{EventEmitter, PipelineEvent};
pub use gate::{Admission, Gate, GateChain};
pub use handler::{Control, DispatchMode, DispatchReport, Handler, HandlerChain};
pub use nodes::{
    AllowGate, CatchAllHandler, DenyGate, FieldEqualsGate, FieldMatchHandler, FieldPatternGate,
    IntRangeGate, RequireFieldGate,
};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineConfig, RunReport};
pub use registry::{default_registry, NodeRegistry};
pub use validation::{validate, validate_or_raise, Diagnostic, LintRule, Severity};
