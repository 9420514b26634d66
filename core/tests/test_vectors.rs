//! Check pagination, HTTP lowering and type casting against the JSON vectors
//! stored in `test-vectors/`.
//!
//! Comparing parsed JSON (not raw strings) avoids false negatives from
//! field-ordering differences.

use std::cell::RefCell;
use std::rc::Rc;

use inbox_core::{
    Client, ClientConfig, Collection, Constraints, HttpMethod, HttpRequest, HttpResponse,
    HttpTransport, Message, Model, Request, TransportError, TypeName,
};
use serde_json::{json, Value};

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let pair = pair.as_array().unwrap();
            (
                pair[0].as_str().unwrap().to_string(),
                pair[1].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[test]
fn pagination_vectors() {
    let raw = include_str!("../../test-vectors/pagination.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let pages: Vec<Value> = case["pages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|page| {
                let records = page
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|id| json!({"id": id}))
                    .collect();
                Value::Array(records)
            })
            .collect();

        let log: Rc<RefCell<Vec<Request>>> = Rc::default();
        let seen = Rc::clone(&log);
        let client = Client::new(move |req: &Request| -> Result<Value, TransportError> {
            let mut seen = seen.borrow_mut();
            let page = pages.get(seen.len()).cloned().unwrap_or_else(|| json!([]));
            seen.push(req.clone());
            Ok(page)
        });

        let delta = Constraints::from_constraints(case["constraints"].as_object()).unwrap();
        let base = client.messages();
        let query =
            Collection::<Message>::with_constraints(&client, base.constraints().merge(&delta));

        let ids: Vec<String> = query
            .find_each()
            .map(|m| m.unwrap().id().unwrap().to_string())
            .collect();
        let expected_ids: Vec<String> =
            serde_json::from_value(case["expected_ids"].clone()).unwrap();
        assert_eq!(ids, expected_ids, "{name}: ids");

        let requests: Vec<Value> = log
            .borrow()
            .iter()
            .map(|req| {
                assert_eq!(req.method, HttpMethod::Get, "{name}: method");
                assert_eq!(req.path, "/messages", "{name}: path");
                Value::Object(req.query.clone())
            })
            .collect();
        assert_eq!(
            Value::Array(requests),
            case["expected_requests"],
            "{name}: requests"
        );
    }
}

// ---------------------------------------------------------------------------
// HTTP build / parse
// ---------------------------------------------------------------------------

type SendFn = fn(HttpRequest) -> Result<HttpResponse, TransportError>;

fn transport(vectors: &Value) -> HttpTransport<SendFn> {
    let config: ClientConfig = serde_json::from_value(vectors["config"].clone()).unwrap();
    let send: SendFn = |_| panic!("vectors never send");
    HttpTransport::new(config, send)
}

#[test]
fn http_build_vectors() {
    let raw = include_str!("../../test-vectors/http.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let http = transport(&vectors);

    for case in vectors["build_cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["request"];
        let mut request = Request::new(
            parse_method(input["method"].as_str().unwrap()),
            input["path"].as_str().unwrap(),
        )
        .with_query(input["query"].as_object().unwrap().clone());
        if let Some(body) = input.get("body") {
            request = request.with_body(body.clone());
        }

        let built = http.build_request(&request).unwrap();
        let expected = &case["expected"];
        assert_eq!(
            built.method,
            parse_method(expected["method"].as_str().unwrap()),
            "{name}: method"
        );
        assert_eq!(built.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(built.query, pairs(&expected["query"]), "{name}: query");
        assert_eq!(built.headers, pairs(&expected["headers"]), "{name}: headers");

        let body = built
            .body
            .as_deref()
            .map(|body| serde_json::from_str::<Value>(body).unwrap())
            .unwrap_or(Value::Null);
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

#[test]
fn http_parse_vectors() {
    let raw = include_str!("../../test-vectors/http.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let http = transport(&vectors);

    for case in vectors["parse_cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        };
        let result = http.parse_response(response);

        match case.get("expected_error").and_then(Value::as_str) {
            Some("NotFound") => {
                assert!(matches!(result, Err(TransportError::NotFound)), "{name}")
            }
            Some("Http") => {
                let err = result.unwrap_err();
                assert!(matches!(err, TransportError::Http { .. }), "{name}: {err:?}");
                assert_eq!(
                    err.status().map(u64::from),
                    case["expected_status"].as_u64(),
                    "{name}: status"
                );
            }
            Some("Deserialization") => assert!(
                matches!(result, Err(TransportError::Deserialization(_))),
                "{name}"
            ),
            Some(other) => panic!("{name}: unknown expected_error: {other}"),
            None => assert_eq!(result.unwrap(), case["expected_result"], "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Casting
// ---------------------------------------------------------------------------

#[test]
fn casting_vectors() {
    let raw = include_str!("../../test-vectors/casting.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let type_name: TypeName = case["type"].as_str().unwrap().parse().unwrap();
        let input = &case["input"];
        let label = format!("{} <- {input}", type_name.name());

        let cast = type_name.cast(input);
        if case["error"].as_bool() == Some(true) {
            assert!(cast.is_err(), "{label}: expected a cast error, got {cast:?}");
            continue;
        }
        let value = cast.unwrap_or_else(|e| panic!("{label}: {e}"));
        let wire = type_name.serialize(&value, None);
        assert_eq!(wire, case["expected"], "{label}");

        // The wire form casts back to the same value.
        assert_eq!(type_name.cast(&wire).unwrap(), value, "{label}: round trip");
    }
}

#[test]
fn resources_path_has_no_grant_by_default() {
    let client = Client::new(|_: &Request| -> Result<Value, TransportError> { Ok(Value::Null) });
    assert_eq!(Message::resources_path(&client), "/messages");
}
