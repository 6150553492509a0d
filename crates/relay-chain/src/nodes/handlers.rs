//! Built-in handlers. Their action is a structured log event; embedding
//! applications register their own handlers for real work.

use relay_types::{Request, Result};

use crate::definition::NodeDefinition;
use crate::handler::{Control, Handler};

/// Applies when the request's `key` equals `value`.
pub struct FieldMatchHandler {
    id: String,
    key: String,
    value: serde_json::Value,
    control: Control,
}

impl FieldMatchHandler {
    pub const NODE_TYPE: &'static str = "field_match";

    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value: value.into(),
            control: Control::Continue,
        }
    }

    /// End dispatch after this handler acts.
    pub fn stopping(mut self) -> Self {
        self.control = Control::Stop;
        self
    }

    pub fn from_definition(def: &NodeDefinition) -> Result<Self> {
        let handler = Self::new(
            def.effective_id(),
            def.str_param("key")?,
            def.param("value")?.clone(),
        );
        Ok(if def.flag("stop")? { handler.stopping() } else { handler })
    }
}

impl Handler for FieldMatchHandler {
    fn node_type(&self) -> &str {
        Self::NODE_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn applies(&self, request: &Request) -> Result<bool> {
        Ok(request.get(&self.key) == Some(&self.value))
    }

    fn act(&self, _request: &Request) -> Result<Control> {
        tracing::info!(node = %self.id, key = %self.key, value = %self.value, "Handler matched");
        Ok(self.control)
    }
}

/// Applies to every request; typically placed last as a fallback.
pub struct CatchAllHandler {
    id: String,
    control: Control,
}

impl CatchAllHandler {
    pub const NODE_TYPE: &'static str = "catch_all";

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            control: Control::Continue,
        }
    }

    pub fn stopping(mut self) -> Self {
        self.control = Control::Stop;
        self
    }

    pub fn from_definition(def: &NodeDefinition) -> Result<Self> {
        let handler = Self::new(def.effective_id());
        Ok(if def.flag("stop")? { handler.stopping() } else { handler })
    }
}

impl Handler for CatchAllHandler {
    fn node_type(&self) -> &str {
        Self::NODE_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn applies(&self, _request: &Request) -> Result<bool> {
        Ok(true)
    }

    fn act(&self, request: &Request) -> Result<Control> {
        tracing::info!(node = %self.id, fields = request.len(), "Fallback handler acted");
        Ok(self.control)
    }
}
