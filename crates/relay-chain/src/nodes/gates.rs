//! Built-in gates.

use regex::Regex;

use relay_types::{Request, Result};

use crate::definition::NodeDefinition;
use crate::gate::Gate;

// ---------------------------------------------------------------------------
// allow / deny
// ---------------------------------------------------------------------------

/// Admits every request.
pub struct AllowGate {
    id: String,
}

impl AllowGate {
    pub const NODE_TYPE: &'static str = "allow";

    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn from_definition(def: &NodeDefinition) -> Result<Self> {
        Ok(Self::new(def.effective_id()))
    }
}

impl Gate for AllowGate {
    fn node_type(&self) -> &str {
        Self::NODE_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, _request: &Request) -> Result<bool> {
        tracing::debug!(node = %self.id, "Allow gate passed");
        Ok(true)
    }
}

/// Rejects every request.
pub struct DenyGate {
    id: String,
}

impl DenyGate {
    pub const NODE_TYPE: &'static str = "deny";

    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn from_definition(def: &NodeDefinition) -> Result<Self> {
        Ok(Self::new(def.effective_id()))
    }
}

impl Gate for DenyGate {
    fn node_type(&self) -> &str {
        Self::NODE_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, _request: &Request) -> Result<bool> {
        tracing::debug!(node = %self.id, "Deny gate rejected");
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Field gates
// ---------------------------------------------------------------------------

/// Admits requests carrying a non-null value under `key`.
pub struct RequireFieldGate {
    id: String,
    key: String,
}

impl RequireFieldGate {
    pub const NODE_TYPE: &'static str = "require_field";

    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }

    pub fn from_definition(def: &NodeDefinition) -> Result<Self> {
        Ok(Self::new(def.effective_id(), def.str_param("key")?))
    }
}

impl Gate for RequireFieldGate {
    fn node_type(&self) -> &str {
        Self::NODE_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, request: &Request) -> Result<bool> {
        Ok(request.get(&self.key).is_some_and(|v| !v.is_null()))
    }
}

/// Admits requests whose `key` equals `value` exactly (JSON equality).
pub struct FieldEqualsGate {
    id: String,
    key: String,
    value: serde_json::Value,
}

impl FieldEqualsGate {
    pub const NODE_TYPE: &'static str = "field_equals";

    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn from_definition(def: &NodeDefinition) -> Result<Self> {
        Ok(Self::new(
            def.effective_id(),
            def.str_param("key")?,
            def.param("value")?.clone(),
        ))
    }
}

impl Gate for FieldEqualsGate {
    fn node_type(&self) -> &str {
        Self::NODE_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, request: &Request) -> Result<bool> {
        Ok(request.get(&self.key) == Some(&self.value))
    }
}

/// Admits requests whose string value under `key` matches a regex.
///
/// The pattern is unanchored; use `^...$` for a full match. Non-string values
/// never match.
pub struct FieldPatternGate {
    id: String,
    key: String,
    pattern: Regex,
}

impl FieldPatternGate {
    pub const NODE_TYPE: &'static str = "field_pattern";

    pub fn new(id: impl Into<String>, key: impl Into<String>, pattern: Regex) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            pattern,
        }
    }

    pub fn from_definition(def: &NodeDefinition) -> Result<Self> {
        let raw = def.str_param("pattern")?;
        let pattern = Regex::new(raw).map_err(|e| def.invalid(format!("bad pattern: {e}")))?;
        Ok(Self::new(def.effective_id(), def.str_param("key")?, pattern))
    }
}

impl Gate for FieldPatternGate {
    fn node_type(&self) -> &str {
        Self::NODE_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, request: &Request) -> Result<bool> {
        Ok(request
            .get_str(&self.key)
            .is_some_and(|v| self.pattern.is_match(v)))
    }
}

/// Admits requests whose integer under `key` lies within `[min, max]`.
/// A missing bound is unbounded on that side.
pub struct IntRangeGate {
    id: String,
    key: String,
    min: Option<i64>,
    max: Option<i64>,
}

impl IntRangeGate {
    pub const NODE_TYPE: &'static str = "int_range";

    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            min,
            max,
        }
    }

    pub fn from_definition(def: &NodeDefinition) -> Result<Self> {
        let min = def.i64_param("min")?;
        let max = def.i64_param("max")?;
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(def.invalid(format!("min {lo} is greater than max {hi}")));
            }
        }
        Ok(Self::new(def.effective_id(), def.str_param("key")?, min, max))
    }
}

impl Gate for IntRangeGate {
    fn node_type(&self) -> &str {
        Self::NODE_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self, request: &Request) -> Result<bool> {
        let Some(value) = request.get_i64(&self.key) else {
            return Ok(false);
        };
        Ok(self.min.map_or(true, |lo| value >= lo) && self.max.map_or(true, |hi| value <= hi))
    }
}
