//! Built-in gates and handlers, available through [`crate::registry::default_registry`].

pub mod gates;
pub mod handlers;

pub use gates::{
    AllowGate, DenyGate, FieldEqualsGate, FieldPatternGate, IntRangeGate, RequireFieldGate,
};
pub use handlers::{CatchAllHandler, FieldMatchHandler};
