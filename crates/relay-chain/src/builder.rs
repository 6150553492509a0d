//! Chain construction from ordered node sequences.
//!
//! Statically typed sequences (`Vec<Arc<dyn Gate>>`) are linked directly. Late-
//! bound sequences of [`ChainMember`]s, such as nodes resolved from a pipeline
//! definition, are checked for capability first and rejected whole on the
//! first mismatch.

use std::fmt;
use std::sync::Arc;

use relay_types::{NodeKind, RelayError, Result};

use crate::chain::Chain;
use crate::gate::{Gate, GateChain};
use crate::handler::{Handler, HandlerChain};

/// A node whose capability is only known at runtime.
#[derive(Clone)]
pub enum ChainMember {
    Gate(Arc<dyn Gate>),
    Handler(Arc<dyn Handler>),
}

impl ChainMember {
    pub fn gate(gate: impl Gate + 'static) -> Self {
        ChainMember::Gate(Arc::new(gate))
    }

    pub fn handler(handler: impl Handler + 'static) -> Self {
        ChainMember::Handler(Arc::new(handler))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            ChainMember::Gate(_) => NodeKind::Gate,
            ChainMember::Handler(_) => NodeKind::Handler,
        }
    }

    pub fn node_type(&self) -> &str {
        match self {
            ChainMember::Gate(g) => g.node_type(),
            ChainMember::Handler(h) => h.node_type(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ChainMember::Gate(g) => g.id(),
            ChainMember::Handler(h) => h.id(),
        }
    }
}

impl fmt::Debug for ChainMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainMember")
            .field("kind", &self.kind())
            .field("node_type", &self.node_type())
            .field("id", &self.id())
            .finish()
    }
}

/// Links ordered node sequences into chains.
pub struct ChainBuilder;

impl ChainBuilder {
    /// Link gates in declaration order. An empty sequence yields no chain.
    pub fn link_gates(gates: Vec<Arc<dyn Gate>>) -> Option<GateChain> {
        Chain::link(gates)
    }

    /// Link handlers in declaration order. An empty sequence yields no chain.
    pub fn link_handlers(handlers: Vec<Arc<dyn Handler>>) -> Option<HandlerChain> {
        Chain::link(handlers)
    }

    /// Build a gate chain from late-bound members.
    ///
    /// Fails with [`RelayError::TypeMismatch`] naming the first member that is
    /// not a gate; no partial chain is produced.
    pub fn gates(members: Vec<ChainMember>) -> Result<Option<GateChain>> {
        let gates = members
            .into_iter()
            .enumerate()
            .map(|(index, member)| match member {
                ChainMember::Gate(gate) => Ok(gate),
                other => Err(mismatch(index, NodeKind::Gate, &other)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::link_gates(gates))
    }

    /// Build a handler chain from late-bound members.
    ///
    /// Fails with [`RelayError::TypeMismatch`] naming the first member that is
    /// not a handler; no partial chain is produced.
    pub fn handlers(members: Vec<ChainMember>) -> Result<Option<HandlerChain>> {
        let handlers = members
            .into_iter()
            .enumerate()
            .map(|(index, member)| match member {
                ChainMember::Handler(handler) => Ok(handler),
                other => Err(mismatch(index, NodeKind::Handler, &other)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::link_handlers(handlers))
    }
}

fn mismatch(index: usize, expected: NodeKind, found: &ChainMember) -> RelayError {
    tracing::error!(
        index,
        %expected,
        found = %found.node_type(),
        "Chain member has wrong capability"
    );
    RelayError::TypeMismatch {
        index,
        expected,
        found: found.node_type().to_string(),
    }
}
