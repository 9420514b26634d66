//! Email messages.
//!
//! Messages cannot be created through the collection (sending is a separate
//! endpoint); only folder, label and flag changes are accepted by `update`.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use super::event::Event;
use super::nested::{File, Folder, Label};
use crate::attributes::{AttrValue, AttributeBag, EmailAddress, Schema, TypeName};
use crate::client::Client;
use crate::error::Result;
use crate::http::Request;
use crate::model::{
    attributable, merge_response, nested_list, nested_one, Attributable, Capabilities, Model,
};

static MESSAGE: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("message")
        .attribute("id", TypeName::String)
        .read_only()
        .attribute("object", TypeName::String)
        .read_only()
        .attribute("grant_id", TypeName::String)
        .read_only()
        .attribute("thread_id", TypeName::String)
        .read_only()
        .attribute("headers", TypeName::Hash)
        .read_only()
        .has_n_of("to", TypeName::EmailAddress)
        .has_n_of("from", TypeName::EmailAddress)
        .has_n_of("cc", TypeName::EmailAddress)
        .has_n_of("bcc", TypeName::EmailAddress)
        .has_n_of("reply_to", TypeName::EmailAddress)
        .attribute("date", TypeName::UnixTimestamp)
        .read_only()
        // Only present on webhook deliveries.
        .attribute("received_date", TypeName::UnixTimestamp)
        .read_only()
        .attribute("subject", TypeName::String)
        .attribute("snippet", TypeName::String)
        .read_only()
        .attribute("body", TypeName::String)
        .attribute("starred", TypeName::Boolean)
        .attribute("unread", TypeName::Boolean)
        .has_n_of("events", TypeName::Model(Event::schema))
        .read_only()
        .has_n_of("files", TypeName::Model(File::schema))
        .read_only()
        .attribute("folder", TypeName::Model(Folder::schema))
        .read_only()
        .attribute("folder_id", TypeName::String)
        .has_n_of("labels", TypeName::Model(Label::schema))
        .read_only()
        .has_n_of("label_ids", TypeName::String)
        .build()
});

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    attributes: AttributeBag,
}

attributable!(Message, MESSAGE);

impl Model for Message {
    const RESOURCES_PATH: &'static str = "/messages";
    const CAPABILITIES: Capabilities = Capabilities::NONE
        .showable()
        .listable()
        .filterable()
        .searchable()
        .updatable();
    const UPDATABLE_ATTRIBUTES: Option<&'static [&'static str]> =
        Some(&["label_ids", "folder_id", "starred", "unread"]);
}

impl Message {
    pub fn thread_id(&self) -> Option<&str> {
        self.get("thread_id").and_then(AttrValue::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("subject").and_then(AttrValue::as_str)
    }

    pub fn snippet(&self) -> Option<&str> {
        self.get("snippet").and_then(AttrValue::as_str)
    }

    pub fn body(&self) -> Option<&str> {
        self.get("body").and_then(AttrValue::as_str)
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.get("date").and_then(AttrValue::as_timestamp)
    }

    pub fn headers(&self) -> Option<&Map<String, Value>> {
        self.get("headers").and_then(AttrValue::as_hash)
    }

    pub fn is_starred(&self) -> bool {
        self.get("starred").and_then(AttrValue::as_bool).unwrap_or(false)
    }

    pub fn is_unread(&self) -> bool {
        self.get("unread").and_then(AttrValue::as_bool).unwrap_or(false)
    }

    pub fn to(&self) -> Vec<&EmailAddress> {
        self.addresses("to")
    }

    pub fn from(&self) -> Vec<&EmailAddress> {
        self.addresses("from")
    }

    pub fn cc(&self) -> Vec<&EmailAddress> {
        self.addresses("cc")
    }

    pub fn bcc(&self) -> Vec<&EmailAddress> {
        self.addresses("bcc")
    }

    pub fn reply_to(&self) -> Vec<&EmailAddress> {
        self.addresses("reply_to")
    }

    pub fn folder(&self) -> Option<Folder> {
        nested_one(self.attributes(), "folder")
    }

    pub fn labels(&self) -> Vec<Label> {
        nested_list(self.attributes(), "labels")
    }

    pub fn label_ids(&self) -> Vec<&str> {
        self.get("label_ids")
            .and_then(AttrValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(AttrValue::as_str)
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        nested_list(self.attributes(), "events")
    }

    pub fn files(&self) -> Vec<File> {
        nested_list(self.attributes(), "files")
    }

    /// Load the full headers. Does nothing when they are already present.
    pub fn expanded(&mut self, client: &Client) -> Result<()> {
        if self.headers().is_some() {
            return Ok(());
        }
        let mut query = Map::new();
        query.insert("view".to_string(), Value::String("expanded".to_string()));
        let request = Request::get(self.resource_path(client)?).with_query(query);
        let response = client.execute(&request)?;
        merge_response(self.attributes_mut(), response)
    }

    fn addresses(&self, name: &str) -> Vec<&EmailAddress> {
        self.get(name)
            .and_then(AttrValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(AttrValue::as_email_address)
            .collect()
    }
}
