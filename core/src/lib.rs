//! Synchronous client core for the inbox REST API (messages, events,
//! calendars).
//!
//! # Overview
//! Resources are records cast through a declared schema: every attribute has
//! a type, and wire data is converted to typed values on the way in and back
//! to JSON on the way out. Queries go through `Collection`, an immutable
//! builder that also paginates with plain `offset`/`limit` arithmetic.
//!
//! The core never opens a socket. It hands a plain-data `HttpRequest` to a
//! send function supplied by the host and parses the `HttpResponse` it gets
//! back (host-does-IO), so everything above the transport is deterministic.
//!
//! # Design
//! - `attributes`: type casting, schemas and the per-instance value bag.
//! - `model`: the `Attributable`/`Model` traits and capability checks.
//! - `constraints` + `collection`: query state and execution.
//! - `transport` + `http`: the request description and the HTTP seam.
//! - `Client` is immutable; models take it as an argument when they need the
//!   network.

pub mod attributes;
pub mod client;
pub mod collection;
pub mod config;
pub mod constraints;
pub mod error;
pub mod http;
pub mod model;
pub mod resources;
pub mod transport;

pub use attributes::{AttrValue, AttributeBag, EmailAddress, Operation, Schema, TypeName};
pub use client::Client;
pub use collection::{Collection, Each, FindEach};
pub use config::ClientConfig;
pub use constraints::Constraints;
pub use error::{Error, Result, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Request};
pub use model::{Attributable, Capabilities, Model};
pub use resources::{Calendar, Event, FreeBusy, Message};
pub use transport::{HttpTransport, Transport};
