//! Immutable filter and pagination state of a collection.
//!
//! Every transform returns a new `Constraints`; nothing is mutated in place,
//! so a collection can be kept around as a query template and derived from
//! freely.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    filters: Map<String, Value>,
    limit: Option<u64>,
    offset: Option<u64>,
    view: Option<String>,
    per_page: Option<u64>,
}

impl Constraints {
    /// Normalize an optional raw mapping (`where`, `limit`, `offset`, `view`,
    /// `per_page`) into constraints. `None` yields empty constraints.
    pub fn from_constraints(raw: Option<&Map<String, Value>>) -> Result<Self> {
        let mut constraints = Self::default();
        let Some(raw) = raw else {
            return Ok(constraints);
        };
        for (key, value) in raw {
            match key.as_str() {
                "where" => match value {
                    Value::Object(filters) => constraints.filters = filters.clone(),
                    Value::Null => {}
                    _ => return Err(invalid(key, value)),
                },
                "limit" => constraints.limit = count_param(key, value)?,
                "offset" => constraints.offset = count_param(key, value)?,
                "per_page" => constraints.per_page = count_param(key, value)?,
                "view" => match value {
                    Value::String(view) => constraints.view = Some(view.clone()),
                    Value::Null => {}
                    _ => return Err(invalid(key, value)),
                },
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "unknown constraint `{other}`"
                    )))
                }
            }
        }
        Ok(constraints)
    }

    pub fn filters(&self) -> &Map<String, Value> {
        &self.filters
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    pub fn per_page(&self) -> Option<u64> {
        self.per_page
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    pub fn with_per_page(mut self, per_page: u64) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Overlay `delta`. Filters are merged key by key; scalar fields are
    /// replaced only when `delta` sets them.
    pub fn merge(&self, delta: &Constraints) -> Constraints {
        let mut filters = self.filters.clone();
        for (key, value) in &delta.filters {
            filters.insert(key.clone(), value.clone());
        }
        Constraints {
            filters,
            limit: delta.limit.or(self.limit),
            offset: delta.offset.or(self.offset),
            view: delta.view.clone().or_else(|| self.view.clone()),
            per_page: delta.per_page.or(self.per_page),
        }
    }

    /// Flatten to wire query parameters, omitting absent fields.
    ///
    /// The wire `limit` is the page window: the smaller of `limit` and
    /// `per_page` when both are set.
    pub fn to_query(&self) -> Map<String, Value> {
        let mut query = self.filters.clone();
        let window = match (self.limit, self.per_page) {
            (Some(limit), Some(per_page)) => Some(limit.min(per_page)),
            (limit, per_page) => limit.or(per_page),
        };
        if let Some(limit) = window {
            query.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(offset) = self.offset {
            query.insert("offset".to_string(), Value::from(offset));
        }
        if let Some(view) = &self.view {
            query.insert("view".to_string(), Value::String(view.clone()));
        }
        query
    }

    /// Constraints for the following page, or `None` when no page size is
    /// configured.
    pub fn next_page(&self) -> Option<Constraints> {
        let per_page = self.per_page?;
        Some(Constraints {
            offset: Some(self.offset.unwrap_or(0) + per_page),
            ..self.clone()
        })
    }
}

fn count_param(key: &str, value: &Value) -> Result<Option<u64>> {
    match value {
        Value::Null => Ok(None),
        _ => value.as_u64().map(Some).ok_or_else(|| invalid(key, value)),
    }
}

fn invalid(key: &str, value: &Value) -> Error {
    Error::InvalidArgument(format!("invalid value for `{key}`: {value}"))
}
