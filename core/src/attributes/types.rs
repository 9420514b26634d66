//! Attribute types: how raw wire values become typed values and back.
//!
//! `TypeName` is the closed set of wire types a schema may declare. Casting
//! is strict for every scalar type; the only permissive type is `Hash`,
//! which passes unknown object shapes through untouched.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::bag::AttributeBag;
use super::definition::{Operation, Schema};
use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Accessor for a nested model's schema.
pub type SchemaRef = fn() -> &'static Schema;

/// Wire type of an attribute.
#[derive(Clone, Copy)]
pub enum TypeName {
    String,
    Integer,
    Boolean,
    UnixTimestamp,
    Date,
    EmailAddress,
    Hash,
    Model(SchemaRef),
}

impl TypeName {
    pub fn name(&self) -> &'static str {
        match self {
            TypeName::String => "string",
            TypeName::Integer => "integer",
            TypeName::Boolean => "boolean",
            TypeName::UnixTimestamp => "unix_timestamp",
            TypeName::Date => "date",
            TypeName::EmailAddress => "email_address",
            TypeName::Hash => "hash",
            TypeName::Model(schema) => schema().name(),
        }
    }

    /// Cast a raw wire value into this type. `null` always casts to `Nil`.
    pub fn cast(&self, raw: &Value) -> Result<AttrValue> {
        if raw.is_null() {
            return Ok(AttrValue::Nil);
        }
        match self {
            TypeName::String => match raw {
                Value::String(s) => Ok(AttrValue::String(s.clone())),
                Value::Number(n) => Ok(AttrValue::String(n.to_string())),
                Value::Bool(b) => Ok(AttrValue::String(b.to_string())),
                _ => Err(Error::type_cast(self.name(), raw, "expected a string")),
            },
            TypeName::Integer => cast_integer(raw)
                .map(AttrValue::Integer)
                .ok_or_else(|| Error::type_cast(self.name(), raw, "expected an integer")),
            TypeName::Boolean => match raw {
                Value::Bool(b) => Ok(AttrValue::Boolean(*b)),
                Value::String(s) if s == "true" => Ok(AttrValue::Boolean(true)),
                Value::String(s) if s == "false" => Ok(AttrValue::Boolean(false)),
                _ => Err(Error::type_cast(self.name(), raw, "expected a boolean")),
            },
            TypeName::UnixTimestamp => cast_timestamp(raw).map(AttrValue::Timestamp),
            TypeName::Date => match raw {
                Value::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .map(AttrValue::Date)
                    .map_err(|e| Error::type_cast(self.name(), raw, e.to_string())),
                _ => Err(Error::type_cast(self.name(), raw, "expected a YYYY-MM-DD string")),
            },
            TypeName::EmailAddress => EmailAddress::from_value(raw).map(AttrValue::EmailAddress),
            TypeName::Hash => match raw {
                Value::Object(map) => Ok(AttrValue::Hash(map.clone())),
                _ => Err(Error::type_cast(self.name(), raw, "expected an object")),
            },
            TypeName::Model(schema) => match raw {
                Value::Object(map) => AttributeBag::from_map(schema(), map).map(AttrValue::Model),
                _ => Err(Error::type_cast(self.name(), raw, "expected an object")),
            },
        }
    }

    /// Serialize a typed value back to its wire form. Nested models are
    /// projected with the same operation so their excluded fields drop too.
    pub fn serialize(&self, value: &AttrValue, operation: Option<Operation>) -> Value {
        value.to_wire(operation)
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Model(_) => write!(f, "Model({})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

impl PartialEq for TypeName {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeName::Model(a), TypeName::Model(b)) => std::ptr::eq(a(), b()),
            (TypeName::Model(_), _) | (_, TypeName::Model(_)) => false,
            _ => self.name() == other.name(),
        }
    }
}

impl FromStr for TypeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(TypeName::String),
            "integer" => Ok(TypeName::Integer),
            "boolean" => Ok(TypeName::Boolean),
            "unix_timestamp" => Ok(TypeName::UnixTimestamp),
            "date" => Ok(TypeName::Date),
            "email_address" => Ok(TypeName::EmailAddress),
            "hash" => Ok(TypeName::Hash),
            other => Err(Error::UnknownType(other.to_string())),
        }
    }
}

fn cast_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| whole_i64(*f)).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// True when `f` has no fraction and fits in an `i64` without saturating.
fn whole_i64(f: f64) -> bool {
    f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(&f)
}

fn cast_timestamp(raw: &Value) -> Result<DateTime<Utc>> {
    let name = TypeName::UnixTimestamp.name();
    if let Some(seconds) = cast_integer(raw) {
        return DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| Error::type_cast(name, raw, "timestamp out of range"));
    }
    match raw {
        // Whole seconds only, matching the wire form.
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map_err(|e| Error::type_cast(name, raw, e.to_string()))
            .and_then(|dt| {
                DateTime::from_timestamp(dt.timestamp(), 0)
                    .ok_or_else(|| Error::type_cast(name, raw, "timestamp out of range"))
            }),
        _ => Err(Error::type_cast(name, raw, "expected seconds since the epoch")),
    }
}

/// A mailbox: an address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn from_value(raw: &Value) -> Result<Self> {
        let name = TypeName::EmailAddress.name();
        let address = match raw {
            Value::String(s) => s.parse()?,
            Value::Object(_) => serde_json::from_value::<EmailAddress>(raw.clone())
                .map_err(|e| Error::type_cast(name, raw, e.to_string()))?,
            _ => return Err(Error::type_cast(name, raw, "expected an object or a string")),
        };
        if !address.email.contains('@') {
            return Err(Error::type_cast(name, raw, "address has no @"));
        }
        Ok(address)
    }
}

impl FromStr for EmailAddress {
    type Err = Error;

    /// Parses `a@b` or `Display Name <a@b>`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match (s.rfind('<'), s.ends_with('>')) {
            (Some(open), true) => {
                let email = s[open + 1..s.len() - 1].trim();
                let name = s[..open].trim().trim_matches('"').trim();
                let address = EmailAddress::new(email);
                Ok(if name.is_empty() {
                    address
                } else {
                    address.with_name(name)
                })
            }
            (None, false) => Ok(EmailAddress::new(s)),
            _ => Err(Error::type_cast(
                TypeName::EmailAddress.name(),
                &Value::String(s.to_string()),
                "unbalanced angle brackets",
            )),
        }
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// Runtime representation of a cast attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Nil,
    String(String),
    Integer(i64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    EmailAddress(EmailAddress),
    /// Opaque object passed through as-is.
    Hash(Map<String, Value>),
    /// A nested model's attributes.
    Model(AttributeBag),
    List(Vec<AttrValue>),
}

impl AttrValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, AttrValue::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            AttrValue::Timestamp(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            AttrValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_email_address(&self) -> Option<&EmailAddress> {
        match self {
            AttrValue::EmailAddress(address) => Some(address),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&Map<String, Value>> {
        match self {
            AttrValue::Hash(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&AttributeBag> {
        match self {
            AttrValue::Model(bag) => Some(bag),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub(crate) fn to_wire(&self, operation: Option<Operation>) -> Value {
        match self {
            AttrValue::Nil => Value::Null,
            AttrValue::String(s) => Value::String(s.clone()),
            AttrValue::Integer(n) => Value::from(*n),
            AttrValue::Boolean(b) => Value::Bool(*b),
            AttrValue::Timestamp(dt) => Value::from(dt.timestamp()),
            AttrValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            AttrValue::EmailAddress(address) => {
                let mut map = Map::new();
                if let Some(name) = &address.name {
                    map.insert("name".to_string(), Value::String(name.clone()));
                }
                map.insert("email".to_string(), Value::String(address.email.clone()));
                Value::Object(map)
            }
            AttrValue::Hash(map) => Value::Object(map.clone()),
            AttrValue::Model(bag) => Value::Object(bag.to_h(None, operation)),
            AttrValue::List(items) => {
                Value::Array(items.iter().map(|item| item.to_wire(operation)).collect())
            }
        }
    }
}

/// Resolves type names declared as strings.
///
/// Scalar names are always known; nested model types must be registered
/// before a schema can refer to them by name.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    models: HashMap<&'static str, TypeName>,
}

impl TypeRegistry {
    pub fn standard() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    pub fn register(mut self, name: &'static str, schema: SchemaRef) -> Self {
        self.models.insert(name, TypeName::Model(schema));
        self
    }

    pub fn resolve(&self, name: &str) -> Result<TypeName> {
        match self.models.get(name) {
            Some(type_name) => Ok(*type_name),
            None => name.parse(),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trips(type_name: TypeName, raw: Value) {
        let first = type_name.cast(&raw).unwrap();
        let wire = type_name.serialize(&first, None);
        let second = type_name.cast(&wire).unwrap();
        assert_eq!(first, second, "{type_name:?} from {raw}");
    }

    #[test]
    fn null_casts_to_nil_for_every_type() {
        for type_name in [
            TypeName::String,
            TypeName::Integer,
            TypeName::Boolean,
            TypeName::UnixTimestamp,
            TypeName::Date,
            TypeName::EmailAddress,
            TypeName::Hash,
        ] {
            assert_eq!(type_name.cast(&Value::Null).unwrap(), AttrValue::Nil);
        }
    }

    #[test]
    fn string_accepts_scalars() {
        assert_eq!(TypeName::String.cast(&json!(1234)).unwrap().as_str(), Some("1234"));
        assert_eq!(TypeName::String.cast(&json!(true)).unwrap().as_str(), Some("true"));
        assert!(matches!(
            TypeName::String.cast(&json!(["a"])),
            Err(Error::TypeCast { .. })
        ));
    }

    #[test]
    fn integer_is_strict() {
        assert_eq!(TypeName::Integer.cast(&json!("42")).unwrap(), AttrValue::Integer(42));
        assert_eq!(TypeName::Integer.cast(&json!(7.0)).unwrap(), AttrValue::Integer(7));
        assert!(TypeName::Integer.cast(&json!(7.5)).is_err());
        assert!(TypeName::Integer.cast(&json!("seven")).is_err());
    }

    #[test]
    fn integer_out_of_range_is_a_cast_error() {
        for raw in [json!(1e19), json!(1e300), json!(-1e300)] {
            let err = TypeName::Integer.cast(&raw).unwrap_err();
            assert!(matches!(err, Error::TypeCast { .. }), "{raw}: {err:?}");
            assert!(TypeName::UnixTimestamp.cast(&raw).is_err(), "{raw}");
        }
        assert_eq!(
            TypeName::Integer.cast(&json!(-9.223372036854776e18)).unwrap(),
            AttrValue::Integer(i64::MIN)
        );
    }

    #[test]
    fn boolean_is_strict() {
        assert_eq!(TypeName::Boolean.cast(&json!("false")).unwrap(), AttrValue::Boolean(false));
        let err = TypeName::Boolean.cast(&json!("yes")).unwrap_err();
        match err {
            Error::TypeCast { type_name, value, .. } => {
                assert_eq!(type_name, "boolean");
                assert_eq!(value, r#""yes""#);
            }
            other => panic!("expected TypeCast, got {other:?}"),
        }
    }

    #[test]
    fn unix_timestamp_casts_seconds_and_rfc3339() {
        let from_seconds = TypeName::UnixTimestamp.cast(&json!(1_700_000_000)).unwrap();
        let from_text = TypeName::UnixTimestamp
            .cast(&json!("2023-11-14T22:13:20Z"))
            .unwrap();
        assert_eq!(from_seconds, from_text);
        assert_eq!(
            TypeName::UnixTimestamp.serialize(&from_seconds, None),
            json!(1_700_000_000)
        );
        assert!(TypeName::UnixTimestamp.cast(&json!("yesterday")).is_err());
    }

    #[test]
    fn unix_timestamp_drops_fractional_seconds() {
        let cast = TypeName::UnixTimestamp
            .cast(&json!("2024-01-01T09:30:00.750Z"))
            .unwrap();
        assert_eq!(
            cast,
            TypeName::UnixTimestamp.cast(&json!(1_704_101_400)).unwrap()
        );
    }

    #[test]
    fn date_requires_iso_format() {
        let date = TypeName::Date.cast(&json!("2024-02-29")).unwrap();
        assert_eq!(date.as_date(), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert!(TypeName::Date.cast(&json!("29/02/2024")).is_err());
        assert!(TypeName::Date.cast(&json!(20240229)).is_err());
    }

    #[test]
    fn email_address_from_object_and_string() {
        let from_object = TypeName::EmailAddress
            .cast(&json!({"name": "Ada", "email": "ada@example.com"}))
            .unwrap();
        let from_text = TypeName::EmailAddress
            .cast(&json!("Ada <ada@example.com>"))
            .unwrap();
        assert_eq!(from_object, from_text);
        assert_eq!(
            from_text.as_email_address().unwrap().to_string(),
            "Ada <ada@example.com>"
        );
        assert!(TypeName::EmailAddress.cast(&json!("not-an-address")).is_err());
        assert!(TypeName::EmailAddress.cast(&json!({"name": "No email"})).is_err());
    }

    #[test]
    fn hash_passes_unknown_shapes_through() {
        let raw = json!({"anything": {"goes": [1, 2]}});
        let value = TypeName::Hash.cast(&raw).unwrap();
        assert_eq!(TypeName::Hash.serialize(&value, None), raw);
        assert!(TypeName::Hash.cast(&json!("text")).is_err());
    }

    #[test]
    fn casts_are_round_trip_stable() {
        round_trips(TypeName::String, json!(99));
        round_trips(TypeName::Integer, json!("12"));
        round_trips(TypeName::Boolean, json!("true"));
        round_trips(TypeName::UnixTimestamp, json!("2024-01-01T09:30:00+02:00"));
        round_trips(TypeName::UnixTimestamp, json!("2024-01-01T09:30:00.750Z"));
        round_trips(TypeName::Date, json!("2024-06-01"));
        round_trips(TypeName::EmailAddress, json!("\"Grace H\" <grace@example.com>"));
        round_trips(TypeName::Hash, json!({"x": 1}));
    }

    use once_cell::sync::Lazy;

    static PLACE_A: Lazy<Schema> =
        Lazy::new(|| Schema::builder("place").attribute("name", TypeName::String).build());
    static PLACE_B: Lazy<Schema> =
        Lazy::new(|| Schema::builder("place").attribute("code", TypeName::Integer).build());

    fn place_a() -> &'static Schema {
        &PLACE_A
    }

    fn place_b() -> &'static Schema {
        &PLACE_B
    }

    #[test]
    fn nested_types_compare_by_schema_not_name() {
        let a = TypeName::Model(place_a);
        let b = TypeName::Model(place_b);
        assert_eq!(a.name(), b.name());
        assert_eq!(a, TypeName::Model(place_a));
        assert_ne!(a, b);
        assert_ne!(TypeName::String, a);
        assert_eq!(TypeName::Date, TypeName::Date);
    }

    #[test]
    fn registry_rejects_unknown_names() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.resolve("date").unwrap(), TypeName::Date);
        let err = registry.resolve("uuid").unwrap_err();
        assert!(matches!(err, Error::UnknownType(name) if name == "uuid"));
    }
}
