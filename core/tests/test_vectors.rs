//! Verify request building and response decoding against the JSON vectors in
//! `test-vectors/`.
//!
//! Bodies and option headers are compared as parsed JSON, not raw strings, so
//! field ordering cannot cause false failures.

use std::sync::Arc;

use neutrino_core::{
    parse_response, ApiError, ApiResult, ClientConfig, Endpoint, HttpMethod, HttpRequest, HttpResponse,
    NeutrinoClient, PathParams, Payload, Record, RequestOptions, Transport, OPTIONS_HEADER,
};
use serde_json::{Map, Value};

const BASE_URL: &str = "http://localhost:5000/v1/";

/// The vectors never reach the network.
struct Offline;

impl Transport for Offline {
    fn execute(&self, _request: &HttpRequest) -> ApiResult<HttpResponse> {
        Err(ApiError::Transport("offline".to_string()))
    }
}

fn client(token: &str) -> NeutrinoClient {
    NeutrinoClient::new(&ClientConfig::new(BASE_URL).with_token(token), "app1", Arc::new(Offline))
}

fn parse_endpoint(s: &str) -> Endpoint {
    Endpoint::ALL
        .into_iter()
        .find(|e| format!("{e:?}") == s)
        .unwrap_or_else(|| panic!("unknown endpoint: {s}"))
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn records(value: &Value) -> Vec<Record> {
    serde_json::from_value(value.clone()).unwrap()
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

#[test]
fn endpoint_test_vectors() {
    let raw = include_str!("../../test-vectors/endpoints.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let endpoint = parse_endpoint(case["endpoint"].as_str().unwrap());
        let c = client(case["token"].as_str().unwrap());

        let params = PathParams {
            app: "app1",
            record_type: case["params"]["type"].as_str(),
            id: case["params"]["id"].as_str(),
        };
        let body = Some(&case["body"]).filter(|b| !b.is_null());

        // Verify build
        let req = c
            .build_endpoint(endpoint, &params, body, &c.request_options())
            .unwrap();
        let expected_req = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()), "{name}: url");
        assert_eq!(req.header("Authorization"), expected_req["authorization"].as_str(), "{name}: authorization");

        let options: Value = serde_json::from_str(req.header(OPTIONS_HEADER).unwrap()).unwrap();
        assert_eq!(options, serde_json::json!({"notify": false}), "{name}: options");

        match req.body.as_deref() {
            Some(sent) => {
                let sent: Value = serde_json::from_str(sent).unwrap();
                assert_eq!(sent, expected_req["body"], "{name}: body");
            }
            None => assert!(expected_req["body"].is_null(), "{name}: body should be present"),
        }

        // Verify parse
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().as_bytes().to_vec(),
        };
        let result = parse_response(response, endpoint.route().shape);

        let expected = &case["expected_result"];
        if let Some(status) = expected["server_error"].as_u64() {
            let err = result.unwrap_err();
            assert_eq!(err.status(), Some(status as u16), "{name}: status");
            continue;
        }
        let payload = result.unwrap();
        if expected["empty"].as_bool() == Some(true) {
            assert_eq!(payload, Payload::Empty, "{name}: empty");
        } else if let Some(record) = expected.get("record") {
            let expected = Record::try_from(record.clone()).unwrap();
            assert_eq!(payload, Payload::Record(expected), "{name}: record");
        } else if let Some(collection) = expected.get("collection") {
            assert_eq!(payload, Payload::Collection(records(collection)), "{name}: collection");
        } else if let Some(names) = expected.get("names") {
            let names: Vec<String> = serde_json::from_value(names.clone()).unwrap();
            assert_eq!(payload, Payload::Names(names), "{name}: names");
        } else {
            panic!("{name}: vector has no expected result");
        }
    }
}

#[test]
fn every_endpoint_has_a_vector() {
    let raw = include_str!("../../test-vectors/endpoints.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let covered: Vec<Endpoint> = vectors["cases"]
        .as_array()
        .unwrap()
        .iter()
        .map(|case| parse_endpoint(case["endpoint"].as_str().unwrap()))
        .collect();

    for endpoint in Endpoint::ALL {
        assert!(covered.contains(&endpoint), "no vector for {endpoint:?}");
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn options_test_vectors() {
    let raw = include_str!("../../test-vectors/options.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let filter: Map<String, Value> = serde_json::from_value(input["filter"].clone()).unwrap();
        let options = RequestOptions {
            client_id: input["client_id"].as_str().map(str::to_string),
            notify: input["notify"].as_bool().unwrap(),
            filter,
        };

        let encoded = options.encode().unwrap();
        let header: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(header, case["expected_header"], "{name}: header");

        let decoded = RequestOptions::decode(&encoded).unwrap();
        assert_eq!(decoded, options, "{name}: round trip");
    }
}
