//! Full client lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every domain method
//! through a `ClientRegistry` over real HTTP with `UreqTransport`.

use std::sync::Arc;
use std::time::Duration;

use neutrino_core::{ApiError, ClientConfig, ClientRegistry, Record, RequestOptions};
use serde_json::{json, Map, Value};

/// Start the mock server on a random port and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/v1/")
}

fn record(value: Value) -> Record {
    Record::try_from(value).unwrap()
}

#[test]
fn client_lifecycle() {
    let base = start_server();
    let registry = ClientRegistry::new(ClientConfig::new(&base).with_timeout(Duration::from_secs(10)));

    // Step 1: unauthenticated app listing is rejected with status and body.
    let platform = registry.unscoped();
    let err = platform.list_apps().unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 401, ref body } if !body.is_empty()));

    // Step 2: register (empty 200 body) and log in on the unscoped client.
    platform.register("owner@example.com", "pw").unwrap();
    let token = platform.login("owner@example.com", "pw").unwrap();
    assert_eq!(platform.token(), token);

    // Step 3: create and list apps with the stored token.
    let app_id = platform.create_app("demo").unwrap();
    let apps = platform.list_apps().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].id().unwrap(), app_id);
    assert_eq!(apps[0].str_field("name").unwrap(), "demo");

    // Step 4: an app-scoped client registers and logs in its own user.
    let client = registry.get_or_create(&app_id);
    assert!(Arc::ptr_eq(&client, &registry.get_or_create(&app_id)));
    client.app_register("user@example.com", "secret").unwrap();
    client.app_login("user@example.com", "secret").unwrap();
    client.set_client_id("integration-test");

    // Step 5: collections start empty.
    assert!(client.list_collections().unwrap().is_empty());

    // Step 6: create two items.
    let first = client
        .create_item("todos", &record(json!({"title": "Walk dog", "done": false})))
        .unwrap()
        .unwrap();
    let id = first.id().unwrap().to_string();
    client
        .create_item("todos", &record(json!({"title": "Buy milk", "done": true})))
        .unwrap();
    assert_eq!(client.list_collections().unwrap(), vec!["todos"]);

    // Step 7: list keeps insertion order.
    let items = client.list_items("todos").unwrap();
    let titles: Vec<&str> = items.iter().map(|r| r.str_field("title").unwrap()).collect();
    assert_eq!(titles, vec!["Walk dog", "Buy milk"]);

    // Step 8: the session filter travels in the options header.
    let mut filter = Map::new();
    filter.insert("done".to_string(), json!(true));
    client.set_filter(filter);
    let done = client.list_items("todos").unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].str_field("title").unwrap(), "Buy milk");

    // Step 9: explicit options override the session filter.
    let payload = client
        .call_with(
            neutrino_core::Endpoint::ListItems,
            &neutrino_core::PathParams::app(&app_id).with_type("todos"),
            None,
            &RequestOptions::new(),
        )
        .unwrap();
    assert_eq!(payload.into_collection().unwrap().len(), 2);
    client.set_filter(Map::new());

    // Step 10: filter values outside ASCII survive the header round trip.
    let cafe = client
        .create_item("todos", &record(json!({"title": "Café", "done": false})))
        .unwrap()
        .unwrap();
    let mut filter = Map::new();
    filter.insert("title".to_string(), json!("Café"));
    client.set_filter(filter);
    let matched = client.list_items("todos").unwrap();
    assert_eq!(matched, vec![cafe.clone()]);
    client.set_filter(Map::new());
    client.delete_item("todos", cafe.id().unwrap()).unwrap();

    // Step 11: get and update.
    let fetched = client.get_item("todos", &id).unwrap().unwrap();
    assert_eq!(fetched, first);
    let updated = client
        .update_item("todos", &id, &record(json!({"done": true})))
        .unwrap()
        .unwrap();
    assert_eq!(updated.get("done"), Some(&json!(true)));
    assert_eq!(updated.str_field("title").unwrap(), "Walk dog");

    // Step 12: delete, then get and delete again are 404s.
    let deleted = client.delete_item("todos", &id).unwrap().unwrap();
    assert_eq!(deleted.id().unwrap(), id);
    assert!(client.get_item("todos", &id).unwrap_err().is_not_found());
    assert!(client.delete_item("todos", &id).unwrap_err().is_not_found());

    // Step 13: a client for another app cannot reuse this app's data.
    let other = registry.get_or_create("someone-else");
    other.set_token(client.token());
    assert!(matches!(other.list_collections().unwrap_err(), ApiError::Server { status: 403, .. }));
}

#[test]
fn wrong_password_is_server_error() {
    let base = start_server();
    let registry = ClientRegistry::new(ClientConfig::new(&base));
    let client = registry.unscoped();
    client.register("a@example.com", "right").unwrap();

    let err = client.login("a@example.com", "wrong").unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(client.token(), "");
}

#[test]
fn closed_port_is_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let registry = ClientRegistry::new(ClientConfig::new(format!("http://{addr}/v1/")));
    let err = registry.unscoped().list_apps().unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
