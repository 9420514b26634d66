//! Typed attributes: the casting layer between wire JSON and model fields.
//!
//! - [`types`]: wire types, casting and serialization of single values.
//! - [`definition`]: per-attribute declarations and model schemas.
//! - [`bag`]: the typed storage one model instance owns.

pub mod bag;
pub mod definition;
pub mod types;

pub use bag::AttributeBag;
pub use definition::{AttributeDefinition, Cardinality, Operation, Schema, SchemaBuilder};
pub use types::{AttrValue, EmailAddress, SchemaRef, TypeName, TypeRegistry};
