//! Pipeline definition validation: lint rules and diagnostics.
//!
//! Call [`validate`] for advisory diagnostics or [`validate_or_raise`] to fail
//! on any `Error`-severity issue. Building a definition reports only the first
//! problem; linting reports all of them.

use std::collections::HashMap;

use relay_types::{NodeKind, RelayError};

use crate::definition::{NodeDefinition, PipelineDefinition};
use crate::registry::NodeRegistry;

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub node_id: Option<String>,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, def: &PipelineDefinition, registry: &NodeRegistry) -> Vec<Diagnostic>;
}

/// Node definitions paired with the chain they were declared in.
fn placed_nodes(
    def: &PipelineDefinition,
) -> impl Iterator<Item = (NodeKind, usize, &NodeDefinition)> {
    let gates = def.gates.iter().enumerate().map(|(i, n)| (NodeKind::Gate, i, n));
    let handlers = def
        .handlers
        .iter()
        .enumerate()
        .map(|(i, n)| (NodeKind::Handler, i, n));
    gates.chain(handlers)
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct KnownNodeTypeRule;
impl LintRule for KnownNodeTypeRule {
    fn name(&self) -> &str { "known_node_type" }
    fn apply(&self, def: &PipelineDefinition, registry: &NodeRegistry) -> Vec<Diagnostic> {
        def.nodes()
            .filter(|n| !registry.has(&n.node_type))
            .map(|n| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!("Node '{}' has unknown type '{}'", n.effective_id(), n.node_type),
                node_id: Some(n.effective_id().to_string()),
                fix: Some(format!("Use one of: {}", registry.node_types().join(", "))),
            })
            .collect()
    }
}

struct CapabilityMatchRule;
impl LintRule for CapabilityMatchRule {
    fn name(&self) -> &str { "capability_match" }
    fn apply(&self, def: &PipelineDefinition, registry: &NodeRegistry) -> Vec<Diagnostic> {
        placed_nodes(def)
            .filter_map(|(expected, index, n)| {
                let actual = registry.kind_of(&n.node_type)?;
                (actual != expected).then(|| Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Error,
                    message: format!(
                        "Node '{}' at {expected} position {index} is a {actual} ('{}')",
                        n.effective_id(),
                        n.node_type
                    ),
                    node_id: Some(n.effective_id().to_string()),
                    fix: Some(format!("Move '{}' to the {actual} list", n.effective_id())),
                })
            })
            .collect()
    }
}

struct NodeParamsRule;
impl LintRule for NodeParamsRule {
    fn name(&self) -> &str { "node_params" }
    fn apply(&self, def: &PipelineDefinition, registry: &NodeRegistry) -> Vec<Diagnostic> {
        def.nodes()
            .filter(|n| registry.has(&n.node_type))
            .filter_map(|n| match registry.resolve(n) {
                Err(RelayError::InvalidDefinition { node, message }) => Some(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Error,
                    message: format!("Node '{node}': {message}"),
                    node_id: Some(node),
                    fix: None,
                }),
                _ => None,
            })
            .collect()
    }
}

struct DuplicateNodeIdRule;
impl LintRule for DuplicateNodeIdRule {
    fn name(&self) -> &str { "duplicate_node_id" }
    fn apply(&self, def: &PipelineDefinition, _registry: &NodeRegistry) -> Vec<Diagnostic> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for n in def.nodes() {
            *counts.entry(n.effective_id()).or_default() += 1;
        }
        let mut duplicates: Vec<_> = counts.into_iter().filter(|(_, c)| *c > 1).collect();
        duplicates.sort_unstable();
        duplicates
            .into_iter()
            .map(|(id, count)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!(
                    "Node id '{id}' is used {count} times; reports cannot tell them apart"
                ),
                node_id: Some(id.to_string()),
                fix: Some(format!("Give each '{id}' node a distinct \"id\"")),
            })
            .collect()
    }
}

struct EmptyHandlersRule;
impl LintRule for EmptyHandlersRule {
    fn name(&self) -> &str { "empty_handlers" }
    fn apply(&self, def: &PipelineDefinition, _registry: &NodeRegistry) -> Vec<Diagnostic> {
        if def.handlers.is_empty() {
            vec![Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: "Pipeline has no handlers; no request can be handled".into(),
                node_id: None,
                fix: Some("Add at least one handler".into()),
            }]
        } else {
            vec![]
        }
    }
}

struct NoGatesRule;
impl LintRule for NoGatesRule {
    fn name(&self) -> &str { "no_gates" }
    fn apply(&self, def: &PipelineDefinition, _registry: &NodeRegistry) -> Vec<Diagnostic> {
        if def.gates.is_empty() {
            vec![Diagnostic {
                rule: self.name().into(),
                severity: Severity::Info,
                message: "Pipeline has no gates; every request is admitted".into(),
                node_id: None,
                fix: None,
            }]
        } else {
            vec![]
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn validate(def: &PipelineDefinition, registry: &NodeRegistry) -> Vec<Diagnostic> {
    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(KnownNodeTypeRule),
        Box::new(CapabilityMatchRule),
        Box::new(NodeParamsRule),
        Box::new(DuplicateNodeIdRule),
        Box::new(EmptyHandlersRule),
        Box::new(NoGatesRule),
    ];

    let mut diagnostics = Vec::new();
    for rule in &rules {
        diagnostics.extend(rule.apply(def, registry));
    }
    diagnostics
}

pub fn validate_or_raise(
    def: &PipelineDefinition,
    registry: &NodeRegistry,
) -> relay_types::Result<Vec<Diagnostic>> {
    let diagnostics = validate(def, registry);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    if !errors.is_empty() {
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        return Err(RelayError::ValidationError(messages.join("; ")));
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
