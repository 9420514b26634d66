//! Calendars. Listed and shown only; the API manages them elsewhere.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tracing::debug;

use super::nested::FreeBusy;
use crate::attributes::{AttrValue, AttributeBag, Schema, TypeName};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, Request};
use crate::model::{attributable, Attributable, Capabilities, Model};

static CALENDAR: Lazy<Schema> = Lazy::new(|| {
    Schema::builder("calendar")
        .attribute("id", TypeName::String)
        .read_only()
        .attribute("object", TypeName::String)
        .read_only()
        .attribute("grant_id", TypeName::String)
        .read_only()
        .attribute("name", TypeName::String)
        .attribute("description", TypeName::String)
        .attribute("timezone", TypeName::String)
        .attribute("is_primary", TypeName::Boolean)
        .read_only()
        .attribute("read_only", TypeName::Boolean)
        .read_only()
        .build()
});

#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    attributes: AttributeBag,
}

attributable!(Calendar, CALENDAR);

impl Model for Calendar {
    const RESOURCES_PATH: &'static str = "/calendars";
    const CAPABILITIES: Capabilities = Capabilities::NONE.showable().listable().read_only();
}

impl Calendar {
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(AttrValue::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.get("description").and_then(AttrValue::as_str)
    }

    pub fn timezone(&self) -> Option<&str> {
        self.get("timezone").and_then(AttrValue::as_str)
    }

    pub fn is_primary(&self) -> bool {
        self.get("is_primary").and_then(AttrValue::as_bool).unwrap_or(false)
    }

    /// Busy slots of `emails` between `start` and `end`.
    ///
    /// A query, so it is allowed even though calendars are read-only.
    pub fn free_busy(
        client: &Client,
        emails: &[&str],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<FreeBusy>> {
        if emails.is_empty() {
            return Err(Error::InvalidArgument(
                "free_busy needs at least one email".to_string(),
            ));
        }
        if start >= end {
            return Err(Error::InvalidArgument(format!(
                "free_busy range is empty: {start} is not before {end}"
            )));
        }
        let path = format!("{}/free-busy", Self::resources_path(client));
        let body = json!({
            "start_time": start.timestamp(),
            "end_time": end.timestamp(),
            "emails": emails,
        });
        debug!(emails = emails.len(), "querying free-busy");
        match client.execute(&Request::new(HttpMethod::Post, path).with_body(body))? {
            Value::Array(records) => records.iter().map(FreeBusy::from_value).collect(),
            other => Err(Error::UnexpectedResponse(format!(
                "expected a list of free_busy, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap(),
        )
    }

    #[test]
    fn writes_are_rejected_before_any_request() {
        let client = Client::new(|_: &Request| -> Result<Value, TransportError> {
            panic!("no request expected")
        });
        let mut calendar = Calendar::from_value(&json!({"id": "c1", "name": "Work"})).unwrap();
        calendar.set("name", "Home").unwrap();

        assert!(matches!(
            calendar.save(&client),
            Err(Error::ReadOnly { model: "calendar" })
        ));
        assert!(matches!(
            calendar.destroy(&client),
            Err(Error::ReadOnly { model: "calendar" })
        ));
        let partial = json!({"name": "Other"});
        assert!(matches!(
            calendar.update(&client, partial.as_object().unwrap()),
            Err(Error::ReadOnly { .. })
        ));
    }

    #[test]
    fn free_busy_posts_window_and_casts_answer() {
        let log: Rc<RefCell<Vec<Request>>> = Rc::default();
        let seen = Rc::clone(&log);
        let client = Client::new(move |req: &Request| -> Result<Value, TransportError> {
            seen.borrow_mut().push(req.clone());
            Ok(json!([{"object": "free_busy", "email": "ada@example.com", "time_slots": []}]))
        })
        .with_grant_id("g1");

        let (start, end) = window();
        let answer = client.free_busy(&["ada@example.com"], start, end).unwrap();
        assert_eq!(answer.len(), 1);
        assert_eq!(answer[0].email(), Some("ada@example.com"));

        let log = log.borrow();
        assert_eq!(log[0].method, HttpMethod::Post);
        assert_eq!(log[0].path, "/grants/g1/calendars/free-busy");
        assert_eq!(
            log[0].body,
            Some(json!({
                "start_time": start.timestamp(),
                "end_time": end.timestamp(),
                "emails": ["ada@example.com"]
            }))
        );
    }

    #[test]
    fn free_busy_validates_arguments_locally() {
        let client = Client::new(|_: &Request| -> Result<Value, TransportError> {
            panic!("no request expected")
        });
        let (start, end) = window();
        assert!(matches!(
            client.free_busy(&[], start, end),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            client.free_busy(&["ada@example.com"], end, start),
            Err(Error::InvalidArgument(_))
        ));
    }
}
