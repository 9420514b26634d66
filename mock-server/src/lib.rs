//! In-memory fake of the inbox REST API.
//!
//! # Design
//! Records are stored as raw JSON objects per resource, in insertion order, so
//! `offset`/`limit` windows are deterministic. Every query parameter other
//! than `offset`, `limit` and `view` is an equality filter. Routes are served
//! both bare (`/messages`) and grant-scoped (`/grants/{grant}/messages`); the
//! grant is accepted and ignored.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub type Record = Map<String, Value>;

/// Page size when a listing names no `limit`.
pub const DEFAULT_LIMIT: usize = 100;

/// Served resources and the `object` tag of their records.
const RESOURCES: &[(&str, &str)] = &[
    ("messages", "message"),
    ("events", "event"),
    ("calendars", "calendar"),
];

const READ_ONLY: &[&str] = &["calendars"];

type Params = HashMap<String, String>;

#[derive(Clone, Default)]
pub struct Store {
    records: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `seed`, an object keyed by resource name. Unknown
    /// resources and non-object records are skipped; records without an id
    /// get a generated one.
    pub fn from_seed(seed: &Value) -> Self {
        let mut records: HashMap<String, Vec<Record>> = HashMap::new();
        for (resource, object) in RESOURCES {
            let seeded = seed
                .get(*resource)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_object)
                .map(|record| stamp(record.clone(), object))
                .collect();
            records.insert(resource.to_string(), seeded);
        }
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }
}

pub fn app() -> Router {
    app_with(Store::new())
}

pub fn app_with(store: Store) -> Router {
    Router::new()
        .route("/{resource}", get(list_records).post(create_record))
        .route(
            "/{resource}/{id}",
            get(get_record)
                .post(record_action)
                .patch(update_record)
                .put(update_record)
                .delete(delete_record),
        )
        .route(
            "/grants/{grant}/{resource}",
            get(list_records).post(create_record),
        )
        .route(
            "/grants/{grant}/{resource}/{id}",
            get(get_record)
                .post(record_action)
                .patch(update_record)
                .put(update_record)
                .delete(delete_record),
        )
        .with_state(store)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Store::new()).await
}

pub async fn run_with(listener: TcpListener, store: Store) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(store)).await
}

fn object_tag(resource: &str) -> Result<&'static str, StatusCode> {
    RESOURCES
        .iter()
        .find(|(name, _)| *name == resource)
        .map(|(_, object)| *object)
        .ok_or(StatusCode::NOT_FOUND)
}

fn resource_of(params: &Params) -> Result<&str, StatusCode> {
    let resource = params.get("resource").ok_or(StatusCode::NOT_FOUND)?;
    object_tag(resource)?;
    Ok(resource)
}

fn writable(resource: &str) -> Result<(), StatusCode> {
    if READ_ONLY.contains(&resource) {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(())
}

fn stamp(mut record: Record, object: &str) -> Record {
    if !record.contains_key("id") {
        record.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    record.insert("object".to_string(), Value::String(object.to_string()));
    record
}

fn parse_window(query: &Params, key: &str, default: usize) -> Result<usize, StatusCode> {
    match query.get(key) {
        Some(raw) => raw.parse().map_err(|_| StatusCode::BAD_REQUEST),
        None => Ok(default),
    }
}

/// Whether `field` equals the query-string `wanted`. Lists match when any
/// element does.
fn matches(field: Option<&Value>, wanted: &str) -> bool {
    match field {
        Some(Value::String(s)) => s == wanted,
        Some(Value::Array(items)) => items.iter().any(|item| matches(Some(item), wanted)),
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == wanted,
    }
}

async fn list_records(
    State(store): State<Store>,
    Path(params): Path<Params>,
    Query(query): Query<Params>,
) -> Result<Json<Value>, StatusCode> {
    let resource = resource_of(&params)?;
    let offset = parse_window(&query, "offset", 0)?;
    let limit = parse_window(&query, "limit", DEFAULT_LIMIT)?;
    let filters: Vec<(&String, &String)> = query
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "offset" | "limit" | "view"))
        .collect();

    let records = store.records.read().await;
    let matching = records
        .get(resource)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter(|record| {
            filters
                .iter()
                .all(|(key, wanted)| matches(record.get(key.as_str()), wanted))
        });

    if query.get("view").map(String::as_str) == Some("count") {
        return Ok(Json(json!({"count": matching.count()})));
    }
    let page: Vec<Value> = matching
        .skip(offset)
        .take(limit)
        .cloned()
        .map(Value::Object)
        .collect();
    debug!(resource, offset, limit, returned = page.len(), "list");
    Ok(Json(Value::Array(page)))
}

async fn create_record(
    State(store): State<Store>,
    Path(params): Path<Params>,
    Json(input): Json<Record>,
) -> Result<(StatusCode, Json<Record>), StatusCode> {
    let resource = resource_of(&params)?;
    writable(resource)?;
    let mut record = input;
    record.remove("id");
    let record = stamp(record, object_tag(resource)?);

    let mut records = store.records.write().await;
    records
        .entry(resource.to_string())
        .or_default()
        .push(record.clone());
    info!(resource, id = ?record.get("id"), "created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
    State(store): State<Store>,
    Path(params): Path<Params>,
    Query(query): Query<Params>,
) -> Result<Json<Record>, StatusCode> {
    let resource = resource_of(&params)?;
    let id = params.get("id").ok_or(StatusCode::NOT_FOUND)?;
    let records = store.records.read().await;
    let mut record = records
        .get(resource)
        .and_then(|list| list.iter().find(|r| matches(r.get("id"), id)))
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;

    if resource == "messages"
        && query.get("view").map(String::as_str) == Some("expanded")
        && !record.contains_key("headers")
    {
        record.insert(
            "headers".to_string(),
            json!({"Message-Id": format!("<{id}@mock.invalid>")}),
        );
    }
    Ok(Json(record))
}

async fn update_record(
    State(store): State<Store>,
    Path(params): Path<Params>,
    Json(input): Json<Record>,
) -> Result<Json<Record>, StatusCode> {
    let resource = resource_of(&params)?;
    writable(resource)?;
    let id = params.get("id").ok_or(StatusCode::NOT_FOUND)?;
    let mut records = store.records.write().await;
    let record = records
        .get_mut(resource)
        .and_then(|list| list.iter_mut().find(|r| matches(r.get("id"), id)))
        .ok_or(StatusCode::NOT_FOUND)?;
    for (key, value) in input {
        if key != "id" && key != "object" {
            record.insert(key, value);
        }
    }
    info!(resource, %id, "updated");
    Ok(Json(record.clone()))
}

async fn delete_record(
    State(store): State<Store>,
    Path(params): Path<Params>,
) -> Result<StatusCode, StatusCode> {
    let resource = resource_of(&params)?;
    writable(resource)?;
    let id = params.get("id").ok_or(StatusCode::NOT_FOUND)?;
    let mut records = store.records.write().await;
    let list = records.get_mut(resource).ok_or(StatusCode::NOT_FOUND)?;
    let index = list
        .iter()
        .position(|r| matches(r.get("id"), id))
        .ok_or(StatusCode::NOT_FOUND)?;
    list.remove(index);
    info!(resource, %id, "deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct FreeBusyQuery {
    pub start_time: i64,
    pub end_time: i64,
    pub emails: Vec<String>,
}

// The only action route is `POST /calendars/free-busy`.
async fn record_action(
    State(store): State<Store>,
    Path(params): Path<Params>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let resource = resource_of(&params)?;
    if resource != "calendars" || params.get("id").map(String::as_str) != Some("free-busy") {
        return Err(StatusCode::METHOD_NOT_ALLOWED);
    }
    let input: FreeBusyQuery =
        serde_json::from_value(input).map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;
    free_busy(&store, input).await.map(Json)
}

/// Busy slots per address, taken from stored events whose participants
/// include it and whose `when` overlaps the window.
async fn free_busy(store: &Store, input: FreeBusyQuery) -> Result<Value, StatusCode> {
    if input.emails.is_empty() || input.start_time >= input.end_time {
        return Err(StatusCode::BAD_REQUEST);
    }
    let records = store.records.read().await;
    let events = records.get("events").map(Vec::as_slice).unwrap_or_default();

    let answer = input
        .emails
        .iter()
        .map(|email| {
            let slots: Vec<Value> = events
                .iter()
                .filter(|event| event.get("busy") != Some(&Value::Bool(false)))
                .filter(|event| invites(event, email))
                .filter_map(|event| busy_slot(event, input.start_time, input.end_time))
                .collect();
            json!({"object": "free_busy", "email": email, "time_slots": slots})
        })
        .collect();
    Ok(Value::Array(answer))
}

fn invites(event: &Record, email: &str) -> bool {
    event
        .get("participants")
        .and_then(Value::as_array)
        .is_some_and(|participants| {
            participants
                .iter()
                .any(|p| p.get("email").and_then(Value::as_str) == Some(email))
        })
}

fn busy_slot(event: &Record, start: i64, end: i64) -> Option<Value> {
    let when = event.get("when")?;
    let slot_start = when.get("start_time")?.as_i64()?;
    let slot_end = when.get("end_time")?.as_i64()?;
    if slot_start >= end || slot_end <= start {
        return None;
    }
    Some(json!({
        "object": "time_slot",
        "status": "busy",
        "start_time": slot_start,
        "end_time": slot_end,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_stamps_ids_and_objects() {
        let store = Store::from_seed(&json!({
            "messages": [{"id": "m1", "subject": "hi"}, {"subject": "no id"}, 7],
            "widgets": [{"id": "w1"}]
        }));
        let records = store.records.try_read().unwrap();
        let messages = &records["messages"];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["id"], "m1");
        assert_eq!(messages[0]["object"], "message");
        assert!(messages[1]["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(records["events"].is_empty());
        assert!(!records.contains_key("widgets"));
    }

    #[test]
    fn matches_compares_as_query_strings() {
        assert!(matches(Some(&json!("Work")), "Work"));
        assert!(matches(Some(&json!(true)), "true"));
        assert!(matches(Some(&json!(3)), "3"));
        assert!(matches(Some(&json!(["l1", "l2"])), "l2"));
        assert!(!matches(Some(&json!(null)), "null"));
        assert!(!matches(None, "x"));
    }

    #[test]
    fn busy_slot_requires_overlap() {
        let event = json!({"when": {"start_time": 100, "end_time": 200}});
        let event = event.as_object().unwrap();
        assert!(busy_slot(event, 150, 300).is_some());
        assert!(busy_slot(event, 200, 300).is_none());
        assert!(busy_slot(event, 0, 100).is_none());
        assert_eq!(busy_slot(event, 0, 1000).unwrap()["start_time"], 100);
    }

    #[test]
    fn invites_checks_participant_emails() {
        let event = json!({"participants": [{"email": "ada@example.com"}]});
        let event = event.as_object().unwrap();
        assert!(invites(event, "ada@example.com"));
        assert!(!invites(event, "grace@example.com"));
    }
}
