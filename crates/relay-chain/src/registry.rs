//! Node registry: maps node type names to factories for late-bound chains.

use std::collections::HashMap;
use std::sync::Arc;

use relay_types::{NodeKind, RelayError, Result};

use crate::builder::ChainMember;
use crate::definition::NodeDefinition;
use crate::gate::Gate;
use crate::handler::Handler;
use crate::nodes::{
    AllowGate, CatchAllHandler, DenyGate, FieldEqualsGate, FieldMatchHandler, FieldPatternGate,
    IntRangeGate, RequireFieldGate,
};

type NodeFactory = Box<dyn Fn(&NodeDefinition) -> Result<ChainMember> + Send + Sync>;

struct Registration {
    kind: NodeKind,
    factory: NodeFactory,
}

// ---------------------------------------------------------------------------
// NodeRegistry
// ---------------------------------------------------------------------------

pub struct NodeRegistry {
    nodes: HashMap<String, Registration>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Register a gate type. A later registration under the same name replaces
    /// the earlier one.
    pub fn register_gate<G, F>(&mut self, node_type: impl Into<String>, factory: F)
    where
        G: Gate + 'static,
        F: Fn(&NodeDefinition) -> Result<G> + Send + Sync + 'static,
    {
        self.nodes.insert(
            node_type.into(),
            Registration {
                kind: NodeKind::Gate,
                factory: Box::new(move |def: &NodeDefinition| {
                    Ok(ChainMember::Gate(Arc::new(factory(def)?) as Arc<dyn Gate>))
                }),
            },
        );
    }

    /// Register a handler type. A later registration under the same name
    /// replaces the earlier one.
    pub fn register_handler<H, F>(&mut self, node_type: impl Into<String>, factory: F)
    where
        H: Handler + 'static,
        F: Fn(&NodeDefinition) -> Result<H> + Send + Sync + 'static,
    {
        self.nodes.insert(
            node_type.into(),
            Registration {
                kind: NodeKind::Handler,
                factory: Box::new(move |def: &NodeDefinition| {
                    Ok(ChainMember::Handler(Arc::new(factory(def)?) as Arc<dyn Handler>))
                }),
            },
        );
    }

    /// The capability registered for `node_type`.
    pub fn kind_of(&self, node_type: &str) -> Option<NodeKind> {
        self.nodes.get(node_type).map(|r| r.kind)
    }

    pub fn has(&self, node_type: &str) -> bool {
        self.nodes.contains_key(node_type)
    }

    /// Registered type names, sorted.
    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.nodes.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Instantiate the node described by `def`.
    pub fn resolve(&self, def: &NodeDefinition) -> Result<ChainMember> {
        let registration = self
            .nodes
            .get(&def.node_type)
            .ok_or_else(|| RelayError::UnknownNodeType(def.node_type.clone()))?;
        (registration.factory)(def)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Default registry factory
// ---------------------------------------------------------------------------

/// A registry with every built-in gate and handler.
pub fn default_registry() -> NodeRegistry {
    let mut reg = NodeRegistry::new();
    reg.register_gate(AllowGate::NODE_TYPE, AllowGate::from_definition);
    reg.register_gate(DenyGate::NODE_TYPE, DenyGate::from_definition);
    reg.register_gate(RequireFieldGate::NODE_TYPE, RequireFieldGate::from_definition);
    reg.register_gate(FieldEqualsGate::NODE_TYPE, FieldEqualsGate::from_definition);
    reg.register_gate(FieldPatternGate::NODE_TYPE, FieldPatternGate::from_definition);
    reg.register_gate(IntRangeGate::NODE_TYPE, IntRangeGate::from_definition);
    reg.register_handler(FieldMatchHandler::NODE_TYPE, FieldMatchHandler::from_definition);
    reg.register_handler(CatchAllHandler::NODE_TYPE, CatchAllHandler::from_definition);
    reg
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_builtins() {
        let reg = default_registry();
        assert_eq!(
            reg.node_types(),
            vec![
                "allow",
                "catch_all",
                "deny",
                "field_equals",
                "field_match",
                "field_pattern",
                "int_range",
                "require_field",
            ]
        );
        assert_eq!(reg.kind_of("allow"), Some(NodeKind::Gate));
        assert_eq!(reg.kind_of("field_match"), Some(NodeKind::Handler));
        assert_eq!(reg.kind_of("nonexistent"), None);
    }

    #[test]
    fn resolve_builds_member_with_definition_id() {
        let reg = default_registry();
        let def = NodeDefinition::new("require_field")
            .with_id("has_payment")
            .with_param("key", "payment");
        let member = reg.resolve(&def).unwrap();
        assert_eq!(member.kind(), NodeKind::Gate);
        assert_eq!(member.id(), "has_payment");
        assert_eq!(member.node_type(), "require_field");
    }

    #[test]
    fn resolve_unknown_type_fails() {
        let err = default_registry()
            .resolve(&NodeDefinition::new("teleport"))
            .unwrap_err();
        assert!(matches!(err, RelayError::UnknownNodeType(ref t) if t == "teleport"));
    }

    #[test]
    fn resolve_propagates_param_errors() {
        let err = default_registry()
            .resolve(&NodeDefinition::new("require_field"))
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidDefinition { .. }));
    }

    #[test]
    fn custom_registration_replaces_builtin() {
        let mut reg = default_registry();
        reg.register_handler("allow", |def: &NodeDefinition| {
            Ok(CatchAllHandler::new(def.effective_id()))
        });
        assert_eq!(reg.kind_of("allow"), Some(NodeKind::Handler));
        assert!(reg.has("allow"));
    }
}
