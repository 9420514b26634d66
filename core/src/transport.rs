//! The transport seam and its HTTP implementation.
//!
//! # Design
//! `Transport` is the only place a request leaves the core. Collections and
//! models produce `Request` specs and hand them to the client's transport,
//! which returns parsed JSON or a `TransportError`. Errors are propagated as
//! they are: no retries, no wrapping.
//!
//! `HttpTransport` follows the host-does-IO pattern. It splits every call
//! into `build_request` (produces an `HttpRequest`) and `parse_response`
//! (consumes an `HttpResponse`). The host supplies the function that performs
//! the actual round-trip, so the core stays deterministic and free of any
//! HTTP client dependency.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, Request};

/// Executes request specs against the remote API.
pub trait Transport {
    fn execute(&self, request: &Request) -> Result<Value, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&Request) -> Result<Value, TransportError>,
{
    fn execute(&self, request: &Request) -> Result<Value, TransportError> {
        self(request)
    }
}

/// HTTP transport that delegates the network round-trip to `send`.
pub struct HttpTransport<S> {
    config: ClientConfig,
    send: S,
}

impl<S> HttpTransport<S> {
    pub fn new(config: ClientConfig, send: S) -> Self {
        Self { config, send }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_request(&self, request: &Request) -> Result<HttpRequest, TransportError> {
        let mut headers = vec![
            ("accept".to_string(), "application/json".to_string()),
            (
                "user-agent".to_string(),
                format!("inbox-core/{}", env!("CARGO_PKG_VERSION")),
            ),
        ];
        if !self.config.api_key.is_empty() {
            headers.push((
                "authorization".to_string(),
                format!("Bearer {}", self.config.api_key),
            ));
        }

        let body = match &request.body {
            Some(body) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(
                    serde_json::to_string(body)
                        .map_err(|e| TransportError::Serialization(e.to_string()))?,
                )
            }
            None => None,
        };

        let query = request
            .query
            .iter()
            .filter_map(|(key, value)| query_value(value).map(|v| (key.clone(), v)))
            .collect();

        Ok(HttpRequest {
            method: request.method,
            url: format!("{}{}", self.config.api_url, request.path),
            query,
            headers,
            body,
        })
    }

    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, TransportError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body)
            .map_err(|e| TransportError::Deserialization(e.to_string()))
    }
}

impl<S> Transport for HttpTransport<S>
where
    S: Fn(HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn execute(&self, request: &Request) -> Result<Value, TransportError> {
        let http = self.build_request(request)?;
        debug!(method = http.method.as_str(), url = %http.url, "sending request");
        let response = (self.send)(http)?;
        self.parse_response(response)
    }
}

/// Flatten one query value into its wire string. Lists are comma-joined and
/// nulls are dropped.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(query_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

/// Map non-success status codes to the appropriate `TransportError` variant.
fn check_status(response: &HttpResponse) -> Result<(), TransportError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    warn!(status = response.status, "request failed");
    if response.status == 404 {
        return Err(TransportError::NotFound);
    }
    Err(TransportError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}
