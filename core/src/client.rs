//! Entry point: routes request specs to a transport.
//!
//! # Design
//! `Client` owns the transport and the optional grant scope and nothing
//! else. It is never mutated after construction; collections borrow it and
//! models receive it as an explicit argument whenever they need the network.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::collection::Collection;
use crate::config::ClientConfig;
use crate::error::{Result, TransportError};
use crate::http::{HttpRequest, HttpResponse, Request};
use crate::model::Model;
use crate::resources::{Calendar, Event, FreeBusy, Message};
use crate::transport::{HttpTransport, Transport};

pub struct Client {
    transport: Box<dyn Transport>,
    grant_id: Option<String>,
}

impl Client {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            grant_id: None,
        }
    }

    /// A client speaking HTTP through `send`, which performs the actual
    /// round-trip on behalf of the core.
    pub fn from_config<S>(config: ClientConfig, send: S) -> Self
    where
        S: Fn(HttpRequest) -> Result<HttpResponse, TransportError> + 'static,
    {
        let grant_id = config.grant_id.clone();
        Self {
            transport: Box::new(HttpTransport::new(config, send)),
            grant_id,
        }
    }

    pub fn with_grant_id(mut self, grant_id: impl Into<String>) -> Self {
        self.grant_id = Some(grant_id.into());
        self
    }

    pub fn grant_id(&self) -> Option<&str> {
        self.grant_id.as_deref()
    }

    /// Prefix `path` with the grant scope, if any.
    pub fn scoped_path(&self, path: &str) -> String {
        match &self.grant_id {
            Some(grant_id) => format!("/grants/{grant_id}{path}"),
            None => path.to_string(),
        }
    }

    pub fn execute(&self, request: &Request) -> Result<Value> {
        debug!(
            method = request.method.as_str(),
            path = %request.path,
            query = ?request.query,
            "executing request"
        );
        Ok(self.transport.execute(request)?)
    }

    pub fn collection<M: Model>(&self) -> Collection<'_, M> {
        Collection::new(self)
    }

    pub fn messages(&self) -> Collection<'_, Message> {
        self.collection()
    }

    pub fn events(&self) -> Collection<'_, Event> {
        self.collection()
    }

    pub fn calendars(&self) -> Collection<'_, Calendar> {
        self.collection()
    }

    pub fn free_busy(
        &self,
        emails: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FreeBusy>> {
        Calendar::free_busy(self, emails, start, end)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("grant_id", &self.grant_id)
            .finish_non_exhaustive()
    }
}
