//! Attribute definitions and model schemas.
//!
//! A `Schema` is the ordered list of attributes a model variant declares.
//! Schemas are built once (usually into a `Lazy` static) with
//! `SchemaBuilder`; modifiers such as `exclude_when` and `default` apply to
//! the attribute declared just before them.

use serde_json::Value;

use super::types::{AttrValue, TypeName, TypeRegistry};
use crate::error::Result;

/// Write operation a serialization is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Creating,
    Updating,
}

/// Whether an attribute holds one value or an ordered list of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug, Clone)]
pub struct AttributeDefinition {
    name: &'static str,
    type_name: TypeName,
    cardinality: Cardinality,
    exclude_when: Vec<Operation>,
    default: AttrValue,
}

impl AttributeDefinition {
    pub fn new(name: &'static str, type_name: TypeName) -> Self {
        Self {
            name,
            type_name,
            cardinality: Cardinality::One,
            exclude_when: Vec::new(),
            default: AttrValue::Nil,
        }
    }

    /// A list attribute; its default is the empty list.
    pub fn list(name: &'static str, type_name: TypeName) -> Self {
        Self {
            cardinality: Cardinality::Many,
            default: AttrValue::List(Vec::new()),
            ..Self::new(name, type_name)
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> TypeName {
        self.type_name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn default_value(&self) -> &AttrValue {
        &self.default
    }

    pub fn excluded_for(&self, operation: Operation) -> bool {
        self.exclude_when.contains(&operation)
    }

    /// Excluded from every write operation.
    pub fn is_read_only(&self) -> bool {
        self.excluded_for(Operation::Creating) && self.excluded_for(Operation::Updating)
    }

    pub fn cast(&self, raw: &Value) -> Result<AttrValue> {
        match self.cardinality {
            Cardinality::One => self.type_name.cast(raw),
            Cardinality::Many => match raw {
                Value::Null => Ok(AttrValue::List(Vec::new())),
                Value::Array(items) => items
                    .iter()
                    .map(|item| self.type_name.cast(item))
                    .collect::<Result<Vec<_>>>()
                    .map(AttrValue::List),
                _ => Err(crate::error::Error::type_cast(
                    format!("list of {}", self.type_name.name()),
                    raw,
                    "expected an array",
                )),
            },
        }
    }

    pub fn serialize(&self, value: &AttrValue, operation: Option<Operation>) -> Value {
        self.type_name.serialize(value, operation)
    }
}

/// Ordered attribute declarations for one model variant.
#[derive(Debug, Clone)]
pub struct Schema {
    name: &'static str,
    definitions: Vec<AttributeDefinition>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                name,
                definitions: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn definitions(&self) -> &[AttributeDefinition] {
        &self.definitions
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.definitions.iter().find(|def| def.name == name)
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.definitions.iter().position(|def| def.name == name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.definitions.iter().map(|def| def.name)
    }
}

#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn attribute(self, name: &'static str, type_name: TypeName) -> Self {
        self.declare(AttributeDefinition::new(name, type_name))
    }

    pub fn has_n_of(self, name: &'static str, type_name: TypeName) -> Self {
        self.declare(AttributeDefinition::list(name, type_name))
    }

    /// Declare an attribute by type name. Fails right away when `registry`
    /// does not know the name.
    pub fn try_attribute(
        self,
        name: &'static str,
        type_name: &str,
        registry: &TypeRegistry,
    ) -> Result<Self> {
        let type_name = registry.resolve(type_name)?;
        Ok(self.attribute(name, type_name))
    }

    pub fn try_has_n_of(
        self,
        name: &'static str,
        type_name: &str,
        registry: &TypeRegistry,
    ) -> Result<Self> {
        let type_name = registry.resolve(type_name)?;
        Ok(self.has_n_of(name, type_name))
    }

    /// Drop the last declared attribute when serializing for `operations`.
    pub fn exclude_when(mut self, operations: &[Operation]) -> Self {
        if let Some(def) = self.schema.definitions.last_mut() {
            def.exclude_when.extend_from_slice(operations);
        }
        self
    }

    /// Server-managed attribute: never sent on create or update.
    pub fn read_only(self) -> Self {
        self.exclude_when(&[Operation::Creating, Operation::Updating])
    }

    pub fn default(mut self, value: AttrValue) -> Self {
        if let Some(def) = self.schema.definitions.last_mut() {
            def.default = value;
        }
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }

    // Redeclaring a name replaces the earlier definition in place.
    fn declare(mut self, definition: AttributeDefinition) -> Self {
        let definitions = &mut self.schema.definitions;
        match definitions.iter().position(|def| def.name == definition.name) {
            Some(index) => {
                definitions.remove(index);
                definitions.push(definition);
            }
            None => definitions.push(definition),
        }
        self
    }
}
