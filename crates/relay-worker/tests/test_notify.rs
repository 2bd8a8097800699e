/// End-to-end tests for the Pushover notification handler
use relay_core::handlers::{action, EventHandler};
use relay_core::models::InvocationContext;
use relay_worker::handlers::notify::{send, PushoverConfig};
use reqwest::Client;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(endpoint: String) -> PushoverConfig {
    PushoverConfig {
        token: "a".repeat(30),
        user: "b".repeat(30),
        endpoint,
    }
}

async fn pushover_server(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/1/messages.json"))
        .respond_with(response)
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_delivery_success() {
    let server = pushover_server(
        ResponseTemplate::new(200).set_body_json(json!({"status": 1, "request": "req-42"})),
    )
    .await;

    let reply = send(
        &Client::new(),
        &config(format!("{}/1/messages.json", server.uri())),
        json!({"title": "New /contact submission received", "payload": "Name: Jane"}),
    )
    .await
    .unwrap();

    assert!(reply.as_str().unwrap().contains("req-42"));
}

#[tokio::test]
async fn test_rejected_delivery_is_500() {
    let server = pushover_server(
        ResponseTemplate::new(200).set_body_json(json!({"status": 0, "errors": ["bad token"]})),
    )
    .await;

    let err = send(
        &Client::new(),
        &config(format!("{}/1/messages.json", server.uri())),
        json!({"title": "t", "payload": "p"}),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_upstream_status_is_carried_through() {
    let server = pushover_server(ResponseTemplate::new(401)).await;

    let err = send(
        &Client::new(),
        &config(format!("{}/1/messages.json", server.uri())),
        json!({"title": "t", "payload": "p"}),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn test_full_handler_flow_produces_gateway_envelope() {
    let server = pushover_server(
        ResponseTemplate::new(200).set_body_json(json!({"status": 1, "request": "req-7"})),
    )
    .await;

    let config = config(format!("{}/1/messages.json", server.uri()));
    let client = Client::new();

    let handler = EventHandler::new(
        "send_to_pushover",
        json!({"title": "alert", "payload": "disk almost full"}),
        &InvocationContext::new("send_to_pushover", "$LATEST"),
        action(move |event| {
            let client = client.clone();
            let config = config.clone();
            async move { send(&client, &config, event).await }
        }),
    );

    let response = handler.respond().await.unwrap();
    assert_eq!(response.status_code(), 200);

    let body: Value = serde_json::from_str(&response.body_string()).unwrap();
    assert_eq!(body["name"], "send_to_pushover");
    assert!(body["message"].as_str().unwrap().contains("req-7"));
}
