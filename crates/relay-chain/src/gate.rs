//! Gate capability and gate-chain traversal.
//!
//! A gate chain admits a request only if every gate's check passes. Traversal
//! stops at the first failing gate; later gates are never invoked.

use relay_types::{NodeKind, Request, Result};

use crate::chain::Chain;

// ---------------------------------------------------------------------------
// Gate trait
// ---------------------------------------------------------------------------

pub trait Gate: Send + Sync {
    /// The gate type identifier (e.g. "allow", "require_field").
    fn node_type(&self) -> &str;

    /// Instance identifier used in logs, events, and reports.
    fn id(&self) -> &str {
        self.node_type()
    }

    /// Apply this gate's admission rule to the request.
    fn check(&self, request: &Request) -> Result<bool>;
}

/// A linked chain of gates.
pub type GateChain = Chain<dyn Gate>;

/// Result of evaluating a gate chain against one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub admitted: bool,
    /// Number of gates whose check was invoked.
    pub evaluated: usize,
    /// Id of the gate that vetoed the request.
    pub rejected_by: Option<String>,
}

impl Chain<dyn Gate> {
    /// Returns `true` iff every gate in the chain admits the request.
    pub fn admit(&self, request: &Request) -> Result<bool> {
        Ok(self.evaluate(request)?.admitted)
    }

    /// Walk the chain, short-circuiting on the first rejection.
    ///
    /// An error from any `check` aborts the traversal and is returned as a
    /// [`relay_types::RelayError::NodeFailure`] naming the gate.
    pub fn evaluate(&self, request: &Request) -> Result<Admission> {
        let mut evaluated = 0;
        for gate in self.walk() {
            evaluated += 1;
            let passed = gate.check(request).map_err(|e| {
                tracing::warn!(node = %gate.id(), error = %e, "Gate check failed");
                e.into_node_failure(NodeKind::Gate, gate.id())
            })?;
            tracing::debug!(node = %gate.id(), passed, "Gate checked");
            if !passed {
                return Ok(Admission {
                    admitted: false,
                    evaluated,
                    rejected_by: Some(gate.id().to_string()),
                });
            }
        }
        Ok(Admission {
            admitted: true,
            evaluated,
            rejected_by: None,
        })
    }

    /// Gate ids in link order.
    pub fn ids(&self) -> Vec<String> {
        self.walk().map(|g| g.id().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChainBuilder;
    use crate::test_support::{CallLog, FixedGate};
    use relay_types::RelayError;
    use std::sync::Arc;

    fn chain_of(verdicts: &[bool], log: &CallLog) -> GateChain {
        let gates: Vec<Arc<dyn Gate>> = verdicts
            .iter()
            .enumerate()
            .map(|(i, v)| {
                Arc::new(FixedGate::new(&format!("g{}", i + 1), *v, log)) as Arc<dyn Gate>
            })
            .collect();
        ChainBuilder::link_gates(gates).unwrap()
    }

    #[test]
    fn all_passing_gates_admit_and_run_once_in_order() {
        let log = CallLog::default();
        let chain = chain_of(&[true, true, true], &log);

        let admission = chain.evaluate(&Request::new()).unwrap();
        assert!(admission.admitted);
        assert_eq!(admission.evaluated, 3);
        assert!(admission.rejected_by.is_none());
        assert_eq!(log.entries(), vec!["check:g1", "check:g2", "check:g3"]);
    }

    #[test]
    fn first_rejection_short_circuits() {
        let log = CallLog::default();
        let chain = chain_of(&[true, false, true], &log);

        let admission = chain.evaluate(&Request::new()).unwrap();
        assert!(!admission.admitted);
        assert_eq!(admission.evaluated, 2);
        assert_eq!(admission.rejected_by.as_deref(), Some("g2"));
        assert_eq!(log.count("check:g3"), 0);
    }

    #[test]
    fn admit_is_logical_and_for_every_failing_position() {
        for failing in 0..4 {
            let mut verdicts = [true; 4];
            verdicts[failing] = false;
            let log = CallLog::default();
            let chain = chain_of(&verdicts, &log);

            assert!(!chain.admit(&Request::new()).unwrap());
            assert_eq!(log.entries().len(), failing + 1);
        }
    }

    #[test]
    fn single_gate_base_case() {
        let log = CallLog::default();
        assert!(chain_of(&[true], &log).admit(&Request::new()).unwrap());
        assert!(!chain_of(&[false], &log).admit(&Request::new()).unwrap());
    }

    #[test]
    fn check_error_becomes_node_failure_and_stops_traversal() {
        let log = CallLog::default();
        let gates: Vec<Arc<dyn Gate>> = vec![
            Arc::new(FixedGate::failing("auth", "token store offline", &log)),
            Arc::new(FixedGate::new("after", true, &log)),
        ];
        let chain = ChainBuilder::link_gates(gates).unwrap();

        let err = chain.admit(&Request::new()).unwrap_err();
        match err {
            RelayError::NodeFailure {
                kind,
                node,
                message,
            } => {
                assert_eq!(kind, NodeKind::Gate);
                assert_eq!(node, "auth");
                assert_eq!(message, "token store offline");
            }
            other => panic!("expected NodeFailure, got: {other:?}"),
        }
        assert_eq!(log.entries(), vec!["check:auth"]);
    }

    #[test]
    fn ids_list_gates_in_order() {
        let log = CallLog::default();
        let chain = chain_of(&[true, true], &log);
        assert_eq!(chain.ids(), vec!["g1", "g2"]);
    }
}
