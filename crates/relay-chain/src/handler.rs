//! Handler capability and handler-chain dispatch.

use serde::{Deserialize, Serialize};

use relay_types::{NodeKind, RelayError, Request, Result};

use crate::chain::Chain;

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

pub trait Handler: Send + Sync {
    /// The handler type identifier (e.g. "field_match", "catch_all").
    fn node_type(&self) -> &str;

    /// Instance identifier used in logs, events, and reports.
    fn id(&self) -> &str {
        self.node_type()
    }

    /// Decide whether this handler should act on the request.
    fn applies(&self, request: &Request) -> Result<bool>;

    /// Act on a request this handler applies to. The returned [`Control`]
    /// tells the chain whether to keep dispatching.
    fn act(&self, request: &Request) -> Result<Control>;
}

/// Continuation signal returned by [`Handler::act`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    #[default]
    Continue,
    /// End dispatch after this handler.
    Stop,
}

/// How the handler chain treats a matching handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Every handler is consulted; all applicable handlers act.
    #[default]
    FanOut,
    /// Dispatch ends after the first applicable handler acts.
    FirstMatch,
}

/// Accumulator threaded through [`Chain::dispatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of handlers whose `applies` was invoked.
    pub visited: usize,
    /// Ids of handlers that acted, in chain order.
    pub matched: Vec<String>,
    /// Id of the handler after which dispatch ended early.
    pub stopped_by: Option<String>,
}

impl DispatchReport {
    pub fn any_matched(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// A linked chain of handlers.
pub type HandlerChain = Chain<dyn Handler>;

impl Chain<dyn Handler> {
    /// Offer the request to every handler in link order, recording matches in
    /// `report`.
    ///
    /// Each applicable handler acts exactly once. Traversal continues past a
    /// match unless the handler returns [`Control::Stop`] or `mode` is
    /// [`DispatchMode::FirstMatch`].
    ///
    /// On error, `report` still holds every handler that acted before the
    /// failing one.
    pub fn dispatch(
        &self,
        request: &Request,
        mode: DispatchMode,
        report: &mut DispatchReport,
    ) -> Result<()> {
        for handler in self.walk() {
            report.visited += 1;
            let applies = handler
                .applies(request)
                .map_err(|e| failure(handler, "applicability check", e))?;
            if !applies {
                tracing::debug!(node = %handler.id(), "Handler does not apply");
                continue;
            }

            let control = handler
                .act(request)
                .map_err(|e| failure(handler, "action", e))?;
            tracing::debug!(node = %handler.id(), ?control, "Handler acted");
            report.matched.push(handler.id().to_string());

            if control == Control::Stop || mode == DispatchMode::FirstMatch {
                report.stopped_by = Some(handler.id().to_string());
                break;
            }
        }
        Ok(())
    }

    /// Handler ids in link order.
    pub fn ids(&self) -> Vec<String> {
        self.walk().map(|h| h.id().to_string()).collect()
    }
}

fn failure(handler: &dyn Handler, phase: &str, err: RelayError) -> RelayError {
    tracing::warn!(node = %handler.id(), phase, error = %err, "Handler failed");
    err.into_node_failure(NodeKind::Handler, handler.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChainBuilder;
    use crate::test_support::{request, CallLog, FieldHandler};
    use std::sync::Arc;

    fn payment_chain(log: &CallLog) -> HandlerChain {
        let handlers: Vec<Arc<dyn Handler>> = vec![
            Arc::new(FieldHandler::new("webmoney", "payment", "webmoney", log)),
            Arc::new(FieldHandler::new("qiwi", "payment", "qiwi", log)),
            Arc::new(FieldHandler::new("qiwi_audit", "payment", "qiwi", log)),
        ];
        ChainBuilder::link_handlers(handlers).unwrap()
    }

    #[test]
    fn fan_out_consults_every_handler_in_order() {
        let log = CallLog::default();
        let chain = payment_chain(&log);
        let mut report = DispatchReport::default();

        chain
            .dispatch(&request(&[("payment", "qiwi")]), DispatchMode::FanOut, &mut report)
            .unwrap();

        assert_eq!(
            log.entries(),
            vec![
                "applies:webmoney",
                "applies:qiwi",
                "act:qiwi",
                "applies:qiwi_audit",
                "act:qiwi_audit",
            ]
        );
        assert_eq!(report.visited, 3);
        assert_eq!(report.matched, vec!["qiwi", "qiwi_audit"]);
        assert!(report.stopped_by.is_none());
    }

    #[test]
    fn no_match_leaves_report_empty() {
        let log = CallLog::default();
        let chain = payment_chain(&log);
        let mut report = DispatchReport::default();

        chain
            .dispatch(&request(&[("payment", "cash")]), DispatchMode::FanOut, &mut report)
            .unwrap();

        assert!(!report.any_matched());
        assert_eq!(report.visited, 3);
        assert_eq!(log.count("act:webmoney") + log.count("act:qiwi"), 0);
    }

    #[test]
    fn first_match_mode_stops_after_first_action() {
        let log = CallLog::default();
        let chain = payment_chain(&log);
        let mut report = DispatchReport::default();

        chain
            .dispatch(&request(&[("payment", "qiwi")]), DispatchMode::FirstMatch, &mut report)
            .unwrap();

        assert_eq!(report.matched, vec!["qiwi"]);
        assert_eq!(report.stopped_by.as_deref(), Some("qiwi"));
        assert_eq!(report.visited, 2);
        assert_eq!(log.count("applies:qiwi_audit"), 0);
    }

    #[test]
    fn stop_control_ends_fan_out() {
        let log = CallLog::default();
        let handlers: Vec<Arc<dyn Handler>> = vec![
            Arc::new(FieldHandler::new("first", "payment", "qiwi", &log).stopping()),
            Arc::new(FieldHandler::new("second", "payment", "qiwi", &log)),
        ];
        let chain = ChainBuilder::link_handlers(handlers).unwrap();
        let mut report = DispatchReport::default();

        chain
            .dispatch(&request(&[("payment", "qiwi")]), DispatchMode::FanOut, &mut report)
            .unwrap();

        assert_eq!(report.matched, vec!["first"]);
        assert_eq!(report.stopped_by.as_deref(), Some("first"));
        assert_eq!(log.count("applies:second"), 0);
    }

    #[test]
    fn act_error_aborts_dispatch() {
        let log = CallLog::default();
        let handlers: Vec<Arc<dyn Handler>> = vec![
            Arc::new(FieldHandler::new("broken", "payment", "qiwi", &log).failing()),
            Arc::new(FieldHandler::new("next", "payment", "qiwi", &log)),
        ];
        let chain = ChainBuilder::link_handlers(handlers).unwrap();
        let mut report = DispatchReport::default();

        let err = chain
            .dispatch(&request(&[("payment", "qiwi")]), DispatchMode::FanOut, &mut report)
            .unwrap_err();

        assert!(matches!(
            err,
            RelayError::NodeFailure { kind: NodeKind::Handler, ref node, .. } if node == "broken"
        ));
        assert_eq!(log.count("applies:next"), 0);
        assert!(report.matched.is_empty());
    }

    #[test]
    fn applies_error_aborts_dispatch() {
        let log = CallLog::default();
        let handlers: Vec<Arc<dyn Handler>> = vec![
            Arc::new(FieldHandler::new("unreadable", "payment", "qiwi", &log).failing_applies()),
            Arc::new(FieldHandler::new("next", "payment", "qiwi", &log)),
        ];
        let chain = ChainBuilder::link_handlers(handlers).unwrap();
        let mut report = DispatchReport::default();

        let err = chain
            .dispatch(&request(&[("payment", "qiwi")]), DispatchMode::FanOut, &mut report)
            .unwrap_err();

        match err {
            RelayError::NodeFailure {
                kind,
                node,
                message,
            } => {
                assert_eq!(kind, NodeKind::Handler);
                assert_eq!(node, "unreadable");
                assert_eq!(message, "lookup exploded");
            }
            other => panic!("expected NodeFailure, got: {other:?}"),
        }
        assert_eq!(log.entries(), vec!["applies:unreadable"]);
        assert_eq!(log.count("act:unreadable"), 0);
        assert!(report.matched.is_empty());
    }

    #[test]
    fn error_keeps_earlier_matches_in_report() {
        let log = CallLog::default();
        let handlers: Vec<Arc<dyn Handler>> = vec![
            Arc::new(FieldHandler::new("qiwi", "payment", "qiwi", &log)),
            Arc::new(FieldHandler::new("broken", "payment", "qiwi", &log).failing()),
        ];
        let chain = ChainBuilder::link_handlers(handlers).unwrap();
        let mut report = DispatchReport::default();

        chain
            .dispatch(&request(&[("payment", "qiwi")]), DispatchMode::FanOut, &mut report)
            .unwrap_err();

        assert_eq!(report.matched, vec!["qiwi"]);
        assert_eq!(report.visited, 2);
    }

    #[test]
    fn dispatch_mode_serializes_to_snake_case() {
        assert_eq!(
            serde_json::to_string(&DispatchMode::FirstMatch).unwrap(),
            "\"first_match\""
        );
        let mode: DispatchMode = serde_json::from_str("\"fan_out\"").unwrap();
        assert_eq!(mode, DispatchMode::FanOut);
    }
}
