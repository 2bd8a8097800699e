/// End-to-end tests for the PageSpeed poller
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, AttributeValueUpdate};
use relay_core::error::RelayError;
use relay_core::services::dynamo::TableService;
use relay_worker::handlers::pagespeed::{poll_and_store_scores, PagespeedConfig};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type StoredUpdate = (
    String,
    HashMap<String, AttributeValue>,
    HashMap<String, AttributeValueUpdate>,
);

struct MockTableService {
    updates: Mutex<Vec<StoredUpdate>>,
}

impl MockTableService {
    fn new() -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TableService for MockTableService {
    async fn scan(
        &self,
        _table: &str,
    ) -> Result<Vec<HashMap<String, AttributeValue>>, RelayError> {
        Ok(vec![])
    }

    async fn update_item(
        &self,
        table: &str,
        key: HashMap<String, AttributeValue>,
        updates: HashMap<String, AttributeValueUpdate>,
    ) -> Result<(), RelayError> {
        self.updates
            .lock()
            .await
            .push((table.to_string(), key, updates));
        Ok(())
    }
}

fn config(endpoint: String, urls: &[&str]) -> PagespeedConfig {
    PagespeedConfig {
        urls: urls.iter().map(|u| u.to_string()).collect(),
        api_key: "test-key".to_string(),
        endpoint,
        table: "pagespeed-scores".to_string(),
    }
}

async fn pagespeed_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/runPagespeed"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lighthouseResult": {
                "audits": {
                    "first-paint": {"score": 0.8},
                    "interactive": {"score": 1.0},
                }
            },
            "analysisUTCTimestamp": "2024-06-15T03:30:00.000Z"
        })))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_scores_are_stored_per_url() {
    let server = pagespeed_server().await;
    let tables = MockTableService::new();

    let report = poll_and_store_scores(
        &Client::new(),
        &tables,
        &config(
            format!("{}/runPagespeed", server.uri()),
            &["https://example.com", "https://example.org"],
        ),
        json!({}),
    )
    .await
    .unwrap();

    assert_eq!(report.as_array().unwrap().len(), 2);

    let updates = tables.updates.lock().await;
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].0, "pagespeed-scores");

    let urls: Vec<&AttributeValue> = updates.iter().map(|(_, key, _)| &key["url"]).collect();
    assert!(urls.contains(&&AttributeValue::S("https://example.com".to_string())));

    let score = &updates[0].2["latest_score_value"];
    assert_eq!(
        score.value(),
        Some(&AttributeValue::N("0.9".to_string()))
    );
    let timestamp = &updates[0].2["latest_score_timestamp"];
    assert_eq!(
        timestamp.value(),
        Some(&AttributeValue::S("2024-06-15T03:30:00.000Z".to_string()))
    );
}

#[tokio::test]
async fn test_failing_lookup_aggregates_and_stores_nothing() {
    // Nothing mounted, every fetch gets a 404
    let server = MockServer::start().await;
    let tables = MockTableService::new();

    let err = poll_and_store_scores(
        &Client::new(),
        &tables,
        &config(
            format!("{}/runPagespeed", server.uri()),
            &["https://example.com"],
        ),
        json!({}),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert!(tables.updates.lock().await.is_empty());
}
