//! Model traits: schema-backed records and the REST operations on them.
//!
//! # Design
//! `Attributable` is any record with a schema and an `AttributeBag` (nested
//! participants, time slots, ...). `Model` adds what makes a record a
//! resource: a collection path, a `Capabilities` declaration and the network
//! operations. Capability checks run before a request is built, so a
//! rejected operation never reaches the transport.
//!
//! Models hold no client reference. Every network-issuing method takes the
//! `Client` explicitly.

use serde_json::{Map, Value};
use tracing::debug;

use crate::attributes::{AttrValue, AttributeBag, Operation, Schema};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, Request};

pub const DEFAULT_PER_PAGE: u64 = 100;

/// Operations a model variant supports.
///
/// `read_only` vetoes create, update and destroy whatever else is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub showable: bool,
    pub listable: bool,
    pub filterable: bool,
    pub searchable: bool,
    pub updatable: bool,
    pub creatable: bool,
    pub read_only: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        showable: false,
        listable: false,
        filterable: false,
        searchable: false,
        updatable: false,
        creatable: false,
        read_only: false,
    };

    pub const fn showable(mut self) -> Self {
        self.showable = true;
        self
    }

    pub const fn listable(mut self) -> Self {
        self.listable = true;
        self
    }

    pub const fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub const fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub const fn updatable(mut self) -> Self {
        self.updatable = true;
        self
    }

    pub const fn creatable(mut self) -> Self {
        self.creatable = true;
        self
    }

    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// A record backed by a schema and an attribute bag.
pub trait Attributable: Sized {
    fn schema() -> &'static Schema;
    fn from_attributes(attributes: AttributeBag) -> Self;
    fn attributes(&self) -> &AttributeBag;
    fn attributes_mut(&mut self) -> &mut AttributeBag;

    /// An instance holding only schema defaults.
    fn new() -> Self {
        Self::from_attributes(AttributeBag::new(Self::schema()))
    }

    fn from_hash(data: &Map<String, Value>) -> Result<Self> {
        AttributeBag::from_map(Self::schema(), data).map(Self::from_attributes)
    }

    fn from_value(data: &Value) -> Result<Self> {
        match data {
            Value::Object(map) => Self::from_hash(map),
            other => Err(Error::UnexpectedResponse(format!(
                "expected a {} object, got {other}",
                Self::schema().name()
            ))),
        }
    }

    fn from_json(json: &str) -> Result<Self> {
        let data: Value = serde_json::from_str(json)?;
        Self::from_value(&data)
    }

    fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes().get(name)
    }

    fn set(&mut self, name: &str, raw: impl Into<Value>) -> Result<()> {
        self.attributes_mut().set(name, &raw.into())
    }

    fn to_h(&self) -> Map<String, Value> {
        self.attributes().to_h(None, None)
    }
}

/// A REST resource.
pub trait Model: Attributable {
    const RESOURCES_PATH: &'static str;
    const CAPABILITIES: Capabilities;
    /// Allow-list for `update`; `None` accepts every attribute.
    const UPDATABLE_ATTRIBUTES: Option<&'static [&'static str]> = None;
    const PER_PAGE: Option<u64> = Some(DEFAULT_PER_PAGE);

    fn model_name() -> &'static str {
        Self::schema().name()
    }

    fn resources_path(client: &Client) -> String {
        client.scoped_path(Self::RESOURCES_PATH)
    }

    fn id(&self) -> Option<&str> {
        self.get("id").and_then(AttrValue::as_str)
    }

    fn resource_path(&self, client: &Client) -> Result<String> {
        let id = self.id().ok_or(Error::MissingId {
            model: Self::model_name(),
        })?;
        Ok(format!("{}/{id}", Self::resources_path(client)))
    }

    /// Create the record when it has no id yet, update it otherwise, then
    /// merge the server's answer into `self`.
    fn save(&mut self, client: &Client) -> Result<()> {
        raise_if_read_only::<Self>()?;
        let request = if self.id().is_none() {
            require::<Self>(Self::CAPABILITIES.creatable, "create")?;
            let body = self.attributes().to_h(None, Some(Operation::Creating));
            debug!(model = Self::model_name(), "creating");
            Request::new(HttpMethod::Post, Self::resources_path(client)).with_body(Value::Object(body))
        } else {
            require::<Self>(Self::CAPABILITIES.updatable, "update")?;
            let body = self.attributes().to_h(None, Some(Operation::Updating));
            debug!(model = Self::model_name(), id = self.id(), "saving");
            Request::new(HttpMethod::Patch, self.resource_path(client)?).with_body(Value::Object(body))
        };
        let response = client.execute(&request)?;
        merge_response(self.attributes_mut(), response)
    }

    /// Change a subset of attributes and send only those.
    ///
    /// `self` is left untouched when the request fails.
    fn update(&mut self, client: &Client, partial: &Map<String, Value>) -> Result<()> {
        if let Some(allowed) = Self::UPDATABLE_ATTRIBUTES {
            let rejected: Vec<&str> = partial
                .keys()
                .map(String::as_str)
                .filter(|key| !allowed.iter().any(|name| name == key))
                .collect();
            if !rejected.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "cannot update {rejected:?}; only {allowed:?} are updatable"
                )));
            }
        }
        raise_if_read_only::<Self>()?;
        require::<Self>(Self::CAPABILITIES.updatable, "update")?;
        let path = self.resource_path(client)?;

        let mut staged = self.attributes().clone();
        staged.merge(partial)?;
        let keys: Vec<&str> = partial.keys().map(String::as_str).collect();
        let body = staged.to_h(Some(&keys), Some(Operation::Updating));
        debug!(model = Self::model_name(), id = self.id(), ?keys, "updating");
        let response =
            client.execute(&Request::new(HttpMethod::Patch, path).with_body(Value::Object(body)))?;
        merge_response(&mut staged, response)?;
        *self.attributes_mut() = staged;
        Ok(())
    }

    /// Refresh `self` in place from the server.
    fn reload(&mut self, client: &Client) -> Result<()> {
        require::<Self>(Self::CAPABILITIES.showable, "show")?;
        let path = self.resource_path(client)?;
        let response = client.execute(&Request::get(path))?;
        merge_response(self.attributes_mut(), response)
    }

    fn destroy(&self, client: &Client) -> Result<()> {
        raise_if_read_only::<Self>()?;
        let path = self.resource_path(client)?;
        debug!(model = Self::model_name(), id = self.id(), "destroying");
        client.execute(&Request::new(HttpMethod::Delete, path))?;
        Ok(())
    }
}

pub(crate) fn require<M: Model>(allowed: bool, operation: &'static str) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        Err(Error::NotImplemented {
            model: M::model_name(),
            operation,
        })
    }
}

pub(crate) fn raise_if_read_only<M: Model>() -> Result<()> {
    if M::CAPABILITIES.read_only {
        return Err(Error::ReadOnly {
            model: M::model_name(),
        });
    }
    Ok(())
}

/// Merge an object response into `attributes`; an empty response is a no-op.
pub(crate) fn merge_response(attributes: &mut AttributeBag, response: Value) -> Result<()> {
    match response {
        Value::Object(map) => attributes.merge(&map),
        Value::Null => Ok(()),
        other => Err(Error::UnexpectedResponse(format!(
            "expected a {} object, got {other}",
            attributes.schema().name()
        ))),
    }
}

/// Nested records stored in a list attribute.
pub(crate) fn nested_list<N: Attributable>(attributes: &AttributeBag, name: &str) -> Vec<N> {
    attributes
        .get(name)
        .and_then(AttrValue::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(AttrValue::as_model)
        .map(|bag| N::from_attributes(bag.clone()))
        .collect()
}

pub(crate) fn nested_one<N: Attributable>(attributes: &AttributeBag, name: &str) -> Option<N> {
    attributes
        .get(name)
        .and_then(AttrValue::as_model)
        .map(|bag| N::from_attributes(bag.clone()))
}

/// Implements `Attributable` for a struct with an `attributes` field backed
/// by a `Lazy<Schema>` static.
macro_rules! attributable {
    ($record:ident, $schema:ident) => {
        impl $crate::model::Attributable for $record {
            fn schema() -> &'static $crate::attributes::Schema {
                &$schema
            }

            fn from_attributes(attributes: $crate::attributes::AttributeBag) -> Self {
                Self { attributes }
            }

            fn attributes(&self) -> &$crate::attributes::AttributeBag {
                &self.attributes
            }

            fn attributes_mut(&mut self) -> &mut $crate::attributes::AttributeBag {
                &mut self.attributes
            }
        }
    };
}

pub(crate) use attributable;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_single_flags() {
        let caps = Capabilities::NONE.showable().listable().searchable();
        assert!(caps.showable && caps.listable && caps.searchable);
        assert!(!caps.filterable && !caps.updatable && !caps.creatable && !caps.read_only);
        assert_eq!(Capabilities::default(), Capabilities::NONE);
    }
}
