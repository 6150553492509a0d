//! Arena-backed singly linked chain shared by the gate and handler stages.
//!
//! Nodes live in a `Vec` and links are forward indices into it, so a chain can
//! never contain a cycle even when the same node instance appears twice.

use std::fmt;
use std::sync::Arc;

/// An ordered, immutable chain of nodes implementing capability `N`.
///
/// A chain always has at least one node; an empty stage is represented by the
/// absence of a chain (`Option<Chain<_>>`), never by an empty one.
pub struct Chain<N: ?Sized> {
    nodes: Vec<Arc<N>>,
    next: Vec<Option<usize>>,
}

impl<N: ?Sized> Chain<N> {
    /// Link `nodes` in declaration order: node `i` points at node `i + 1`.
    /// Returns `None` for an empty sequence.
    pub(crate) fn link(nodes: Vec<Arc<N>>) -> Option<Self> {
        let last = nodes.len().checked_sub(1)?;
        let next = (0..nodes.len())
            .map(|i| (i < last).then_some(i + 1))
            .collect();
        Some(Self { nodes, next })
    }

    /// The first node of the chain.
    pub fn head(&self) -> &N {
        // Non-empty by construction.
        &self.nodes[0]
    }

    /// Number of nodes, counting repeated instances once per occurrence.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Index of the node following `index`, or `None` for the last node.
    pub fn successor(&self, index: usize) -> Option<usize> {
        self.next.get(index).copied().flatten()
    }

    /// Walk the chain from its head, following the links.
    pub fn walk(&self) -> Walk<'_, N> {
        Walk {
            chain: self,
            cursor: Some(0),
        }
    }
}

impl<N: ?Sized> fmt::Debug for Chain<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.nodes.len())
            .field("next", &self.next)
            .finish()
    }
}

/// Iterator over a chain's nodes in link order.
pub struct Walk<'a, N: ?Sized> {
    chain: &'a Chain<N>,
    cursor: Option<usize>,
}

impl<'a, N: ?Sized> Iterator for Walk<'a, N> {
    type Item = &'a N;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        self.cursor = self.chain.successor(index);
        self.chain.nodes.get(index).map(|node| &**node)
    }
}
