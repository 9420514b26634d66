//! Error types for the inbox API client.
//!
//! # Design
//! `Error` covers everything the core can reject locally (casting, schema,
//! capability and argument checks) plus the transport failures it passes
//! through untouched. Local errors are always raised before a request is
//! issued. `TransportError` keeps a dedicated `NotFound` variant because
//! callers frequently distinguish "the resource does not exist" from "the
//! server returned an unexpected status".

/// Errors returned by the transport collaborator.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server returned 404: the requested resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be parsed as JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request never produced a response (refused, reset, timed out).
    #[error("connection failed: {0}")]
    Connection(String),
}

impl TransportError {
    /// HTTP-like status code for this failure, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::NotFound => Some(404),
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors returned by models, collections and the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A raw value is not acceptable for a strict attribute type.
    #[error("cannot cast {value} to {type_name}: {reason}")]
    TypeCast {
        type_name: String,
        value: String,
        reason: String,
    },

    /// The attribute is not declared in the model's schema.
    #[error("{attribute} not in {legal:?}")]
    UndefinedAttribute { attribute: String, legal: Vec<String> },

    /// A schema declared an attribute with a type name nobody registered.
    #[error("unknown attribute type `{0}`")]
    UnknownType(String),

    #[error("{model} is read only")]
    ReadOnly { model: &'static str },

    /// The model variant does not support the requested operation.
    #[error("{model} does not support {operation}")]
    NotImplemented {
        model: &'static str,
        operation: &'static str,
    },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{model} has no id")]
    MissingId { model: &'static str },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    pub(crate) fn type_cast(
        type_name: impl Into<String>,
        value: &serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Error::TypeCast {
            type_name: type_name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
