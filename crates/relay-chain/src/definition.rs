//! JSON pipeline definitions: the late-bound way to assemble a pipeline.
//!
//! ```json
//! {
//!   "name": "payments",
//!   "dispatch_mode": "first_match",
//!   "request": { "payment": "qiwi" },
//!   "gates": [
//!     { "id": "known_payment", "type": "require_field", "params": { "key": "payment" } }
//!   ],
//!   "handlers": [
//!     { "id": "qiwi", "type": "field_match", "params": { "key": "payment", "value": "qiwi" } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use relay_types::{RelayError, Request, Result};

use crate::handler::DispatchMode;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::registry::NodeRegistry;

/// A complete pipeline description: request plus both chains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub name: String,
    #[serde(default)]
    pub dispatch_mode: DispatchMode,
    #[serde(default)]
    pub request: Request,
    #[serde(default)]
    pub gates: Vec<NodeDefinition>,
    #[serde(default)]
    pub handlers: Vec<NodeDefinition>,
}

/// One chain member: a registered node type plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl PipelineDefinition {
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Read and parse a definition file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let definition = Self::from_json_str(&source)?;
        tracing::debug!(
            path = %path.display(),
            pipeline = %definition.name,
            "Pipeline definition loaded"
        );
        Ok(definition)
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            dispatch_mode: self.dispatch_mode,
        }
    }

    /// Resolve every node through `registry` and build the pipeline around the
    /// definition's own request.
    pub fn build(&self, registry: &NodeRegistry) -> Result<Pipeline> {
        self.build_with_request(registry, self.request.clone())
    }

    /// Like [`build`](Self::build) but with a caller-supplied request.
    pub fn build_with_request(
        &self,
        registry: &NodeRegistry,
        request: Request,
    ) -> Result<Pipeline> {
        let gates = self
            .gates
            .iter()
            .map(|def| registry.resolve(def))
            .collect::<Result<Vec<_>>>()?;
        let handlers = self
            .handlers
            .iter()
            .map(|def| registry.resolve(def))
            .collect::<Result<Vec<_>>>()?;

        Pipeline::builder(request)
            .config(self.config())
            .gate_members(gates)
            .handler_members(handlers)
            .build()
    }

    /// Every node definition, gates first.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.gates.iter().chain(self.handlers.iter())
    }
}

impl NodeDefinition {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            id: None,
            node_type: node_type.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// The explicit id, falling back to the node type.
    pub fn effective_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.node_type)
    }

    /// A required parameter of any JSON type.
    pub fn param(&self, key: &str) -> Result<&serde_json::Value> {
        self.params
            .get(key)
            .ok_or_else(|| self.invalid(format!("missing param '{key}'")))
    }

    /// A required string parameter.
    pub fn str_param(&self, key: &str) -> Result<&str> {
        self.param(key)?
            .as_str()
            .ok_or_else(|| self.invalid(format!("param '{key}' must be a string")))
    }

    /// An optional integer parameter.
    pub fn i64_param(&self, key: &str) -> Result<Option<i64>> {
        match self.params.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(format!("param '{key}' must be an integer"))),
        }
    }

    /// An optional boolean parameter, `false` when absent.
    pub fn flag(&self, key: &str) -> Result<bool> {
        match self.params.get(key) {
            None | Some(serde_json::Value::Null) => Ok(false),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| self.invalid(format!("param '{key}' must be a boolean"))),
        }
    }

    pub(crate) fn invalid(&self, message: impl Into<String>) -> RelayError {
        RelayError::InvalidDefinition {
            node: self.effective_id().to_string(),
            message: message.into(),
        }
    }
}
