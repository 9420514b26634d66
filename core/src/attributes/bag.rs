//! Typed field storage for one model instance.
//!
//! # Design
//! Values are stored in schema declaration order, one slot per declared
//! attribute, starting from the schema defaults. Every write goes through
//! the attribute's `cast`, so the bag only ever holds typed values. The
//! schema is strict: naming an undeclared attribute is an error, never a
//! silent insert.

use serde_json::{Map, Value};

use super::definition::{Operation, Schema};
use super::types::AttrValue;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct AttributeBag {
    schema: &'static Schema,
    values: Vec<AttrValue>,
}

impl AttributeBag {
    pub fn new(schema: &'static Schema) -> Self {
        let values = schema
            .definitions()
            .iter()
            .map(|def| def.default_value().clone())
            .collect();
        Self { schema, values }
    }

    pub fn from_map(schema: &'static Schema, data: &Map<String, Value>) -> Result<Self> {
        let mut bag = Self::new(schema);
        bag.merge(data)?;
        Ok(bag)
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Current value of `name`, or `None` when the schema does not declare it.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.schema.position(name).map(|index| &self.values[index])
    }

    pub fn set(&mut self, name: &str, raw: &Value) -> Result<()> {
        let index = self.position(name)?;
        self.values[index] = self.schema.definitions()[index].cast(raw)?;
        Ok(())
    }

    /// Cast and store every entry of `data`. Nothing is stored unless every
    /// entry casts.
    pub fn merge(&mut self, data: &Map<String, Value>) -> Result<()> {
        let staged = data
            .iter()
            .map(|(name, raw)| {
                let index = self.position(name)?;
                let value = self.schema.definitions()[index].cast(raw)?;
                Ok((index, value))
            })
            .collect::<Result<Vec<_>>>()?;
        for (index, value) in staged {
            self.values[index] = value;
        }
        Ok(())
    }

    /// Project to a wire mapping in schema order.
    ///
    /// Only `keys` are considered (all attributes when `None`; undeclared
    /// keys are ignored). Attributes excluded for `operation` are dropped, as
    /// is every value that serializes to null or to an empty string, list or
    /// object.
    pub fn to_h(&self, keys: Option<&[&str]>, operation: Option<Operation>) -> Map<String, Value> {
        let mut out = Map::new();
        for (def, value) in self.schema.definitions().iter().zip(&self.values) {
            if keys.is_some_and(|keys| !keys.contains(&def.name())) {
                continue;
            }
            if operation.is_some_and(|op| def.excluded_for(op)) {
                continue;
            }
            let wire = def.serialize(value, operation);
            if !is_blank(&wire) {
                out.insert(def.name().to_string(), wire);
            }
        }
        out
    }

    pub fn serialize(&self, keys: Option<&[&str]>, operation: Option<Operation>) -> String {
        Value::Object(self.to_h(keys, operation)).to_string()
    }

    /// JSON text for the API with every read-only attribute left out.
    pub fn serialize_for_api(&self) -> String {
        let writable: Vec<&str> = self
            .schema
            .definitions()
            .iter()
            .filter(|def| !def.is_read_only())
            .map(|def| def.name())
            .collect();
        self.serialize(Some(&writable), None)
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.schema
            .position(name)
            .ok_or_else(|| Error::UndefinedAttribute {
                attribute: name.to_string(),
                legal: self.schema.keys().map(str::to_string).collect(),
            })
    }
}

impl PartialEq for AttributeBag {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.values == other.values
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
