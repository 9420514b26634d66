//! Calendar events.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

use super::nested::{Participant, Timespan};
use crate::attributes::{AttrValue, AttributeBag, Operation, Schema, TypeName};
use crate::model::{attributable, nested_list, nested_one, Attributable, Capabilities, Model};

static EVENT: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("event")
        .attribute("id", TypeName::String)
        .read_only()
        .attribute("object", TypeName::String)
        .read_only()
        .attribute("grant_id", TypeName::String)
        .read_only()
        // Events cannot move between calendars.
        .attribute("calendar_id", TypeName::String)
        .exclude_when(&[Operation::Updating])
        .attribute("title", TypeName::String)
        .attribute("description", TypeName::String)
        .attribute("location", TypeName::String)
        .attribute("busy", TypeName::Boolean)
        .attribute("read_only", TypeName::Boolean)
        .read_only()
        .attribute("status", TypeName::String)
        .read_only()
        .has_n_of("participants", TypeName::Model(Participant::schema))
        .attribute("when", TypeName::Model(Timespan::schema))
        .attribute("created_at", TypeName::UnixTimestamp)
        .read_only()
        .attribute("updated_at", TypeName::UnixTimestamp)
        .read_only()
        .build()
});

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    attributes: AttributeBag,
}

attributable!(Event, EVENT);

impl Model for Event {
    const RESOURCES_PATH: &'static str = "/events";
    const CAPABILITIES: Capabilities = Capabilities::NONE
        .showable()
        .listable()
        .filterable()
        .searchable()
        .updatable()
        .creatable();
}

impl Event {
    pub fn calendar_id(&self) -> Option<&str> {
        self.get("calendar_id").and_then(AttrValue::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").and_then(AttrValue::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.get("description").and_then(AttrValue::as_str)
    }

    pub fn location(&self) -> Option<&str> {
        self.get("location").and_then(AttrValue::as_str)
    }

    pub fn status(&self) -> Option<&str> {
        self.get("status").and_then(AttrValue::as_str)
    }

    pub fn is_busy(&self) -> bool {
        self.get("busy").and_then(AttrValue::as_bool).unwrap_or(false)
    }

    /// True when the event lives on a calendar the grant cannot write to.
    pub fn is_read_only(&self) -> bool {
        self.get("read_only").and_then(AttrValue::as_bool).unwrap_or(false)
    }

    pub fn participants(&self) -> Vec<Participant> {
        nested_list(self.attributes(), "participants")
    }

    pub fn when(&self) -> Option<Timespan> {
        nested_one(self.attributes(), "when")
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get("created_at").and_then(AttrValue::as_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::error::{Error, TransportError};
    use crate::http::{HttpMethod, Request};
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<Request>>>;

    fn recording(response: Value) -> (Client, Log) {
        let log: Log = Rc::default();
        let seen = Rc::clone(&log);
        let client = Client::new(move |req: &Request| -> Result<Value, TransportError> {
            seen.borrow_mut().push(req.clone());
            Ok(response.clone())
        });
        (client, log)
    }

    #[test]
    fn save_without_id_posts_creatable_fields() {
        let (client, log) = recording(json!({"id": "e9", "object": "event", "status": "confirmed"}));
        let mut event = Event::new();
        event.set("calendar_id", "c1").unwrap();
        event.set("title", "Standup").unwrap();
        event
            .set("when", json!({"start_time": 1_700_000_000, "end_time": 1_700_000_900}))
            .unwrap();
        event
            .set("participants", json!([{"email": "ada@example.com", "status": "noreply"}]))
            .unwrap();
        event.save(&client).unwrap();

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].method, HttpMethod::Post);
        assert_eq!(log[0].path, "/events");
        assert_eq!(
            log[0].body,
            Some(json!({
                "calendar_id": "c1",
                "title": "Standup",
                "participants": [{"email": "ada@example.com", "status": "noreply"}],
                "when": {"start_time": 1_700_000_000, "end_time": 1_700_000_900}
            }))
        );
        assert_eq!(event.id(), Some("e9"));
        assert_eq!(event.status(), Some("confirmed"));
    }

    #[test]
    fn save_with_id_patches_without_calendar_id() {
        let (client, log) = recording(Value::Null);
        let mut event =
            Event::from_value(&json!({"id": "e1", "calendar_id": "c1", "title": "Old"})).unwrap();
        event.set("title", "New").unwrap();
        event.save(&client).unwrap();

        let log = log.borrow();
        assert_eq!(log[0].method, HttpMethod::Patch);
        assert_eq!(log[0].path, "/events/e1");
        assert_eq!(log[0].body, Some(json!({"title": "New"})));
    }

    #[test]
    fn destroy_requires_an_id() {
        let (client, log) = recording(Value::Null);
        let err = Event::new().destroy(&client).unwrap_err();
        assert!(matches!(err, Error::MissingId { model: "event" }));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn any_attribute_is_updatable() {
        let (client, log) = recording(Value::Null);
        let mut event = Event::from_value(&json!({"id": "e1"})).unwrap();
        let partial = json!({"location": "Room 4", "busy": true});
        event.update(&client, partial.as_object().unwrap()).unwrap();
        assert_eq!(log.borrow()[0].body, Some(partial));
        assert!(event.is_busy());
        assert_eq!(event.location(), Some("Room 4"));
    }
}
