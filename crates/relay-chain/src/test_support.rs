//! Instrumented gates and handlers shared by the unit tests.

use std::sync::{Arc, Mutex};

use relay_types::{RelayError, Request, Result};

use crate::gate::Gate;
use crate::handler::{Control, Handler};

/// Shared, ordered log of node callbacks.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

pub struct FixedGate {
    pub id: String,
    pub verdict: std::result::Result<bool, String>,
    pub log: CallLog,
}

impl FixedGate {
    pub fn new(id: &str, verdict: bool, log: &CallLog) -> Self {
        Self {
            id: id.into(),
            verdict: Ok(verdict),
            log: log.clone(),
        }
    }

    pub fn failing(id: &str, message: &str, log: &CallLog) -> Self {
        Self {
            id: id.into(),
            verdict: Err(message.into()),
            log: log.clone(),
        }
    }
}

impl Gate for FixedGate {
    fn node_type(&self) -> &str {
        "fixed"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, _request: &Request) -> Result<bool> {
        self.log.record(format!("check:{}", self.id));
        self.verdict.clone().map_err(RelayError::Other)
    }
}

pub struct FieldHandler {
    pub id: String,
    pub key: String,
    pub value: String,
    pub control: Control,
    pub fail_applies: bool,
    pub fail_act: bool,
    pub log: CallLog,
}

impl FieldHandler {
    pub fn new(id: &str, key: &str, value: &str, log: &CallLog) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value: value.into(),
            control: Control::Continue,
            fail_applies: false,
            fail_act: false,
            log: log.clone(),
        }
    }

    pub fn stopping(mut self) -> Self {
        self.control = Control::Stop;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_act = true;
        self
    }

    pub fn failing_applies(mut self) -> Self {
        self.fail_applies = true;
        self
    }
}

impl Handler for FieldHandler {
    fn node_type(&self) -> &str {
        "field"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn applies(&self, request: &Request) -> Result<bool> {
        self.log.record(format!("applies:{}", self.id));
        if self.fail_applies {
            return Err(RelayError::Other("lookup exploded".into()));
        }
        Ok(request.get_str(&self.key) == Some(self.value.as_str()))
    }

    fn act(&self, _request: &Request) -> Result<Control> {
        self.log.record(format!("act:{}", self.id));
        if self.fail_act {
            return Err(RelayError::Other("act exploded".into()));
        }
        Ok(self.control)
    }
}

pub fn request(pairs: &[(&str, &str)]) -> Request {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}
