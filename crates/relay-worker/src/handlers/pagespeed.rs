/// Scheduled Google PageSpeed poller
///
/// Fetches the Lighthouse audit report for every configured URL in parallel
/// and stores the average audit score per URL in the scores table.
use aws_sdk_dynamodb::types::{AttributeAction, AttributeValue, AttributeValueUpdate};
use futures::FutureExt;
use lambda_runtime::{Error, LambdaEvent};
use relay_core::error::RelayError;
use relay_core::handlers::{action, EventHandler};
use relay_core::models::InvocationContext;
use relay_core::response::Response;
use relay_core::services::dynamo::{DynamoTableService, TableService};
use relay_core::utils::env_var;
use relay_core::utils::fanout::run_all;
use relay_core::utils::http::send_http_request;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const PAGESPEED_API_ENDPOINT: &str =
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

#[derive(Debug, Clone)]
pub struct PagespeedConfig {
    pub urls: Vec<String>,
    pub api_key: String,
    pub endpoint: String,
    pub table: String,
}

impl PagespeedConfig {
    pub fn from_env() -> Result<Self, RelayError> {
        let urls = env_var("GOOGLE_PAGESPEED_TARGET_URLS")?
            .replace(' ', "")
            .split(',')
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            urls,
            api_key: env_var("GOOGLE_PAGESPEED_API_KEY")?,
            endpoint: std::env::var("PAGESPEED_ENDPOINT")
                .unwrap_or_else(|_| PAGESPEED_API_ENDPOINT.to_string()),
            table: env_var("DYNAMODB_TABLE")?,
        })
    }
}

/// One polled result, ready to be stored
#[derive(Debug, Clone)]
pub struct PageScore {
    pub url: String,
    pub score: f64,
    pub timestamp: String,
}

/// Average of all non-null Lighthouse audit scores in the API reply
fn average_audit_score(url: &str, reply: &Value) -> Result<(f64, String), RelayError> {
    let audits = reply["lighthouseResult"]["audits"].as_object().ok_or_else(|| {
        RelayError::with_status(format!("Missing audits in PageSpeed reply for {}", url), 500)
    })?;

    let scores: Vec<f64> = audits
        .values()
        .filter_map(|audit| audit["score"].as_f64())
        .collect();

    if scores.is_empty() {
        return Err(RelayError::with_status(
            format!("No scored audits in PageSpeed reply for {}", url),
            500,
        ));
    }

    let score = scores.iter().sum::<f64>() / scores.len() as f64;

    let timestamp = reply["analysisUTCTimestamp"]
        .as_str()
        .ok_or_else(|| {
            RelayError::with_status(
                format!("Missing analysisUTCTimestamp in PageSpeed reply for {}", url),
                500,
            )
        })?
        .to_string();

    Ok((score, timestamp))
}

/// One PageSpeed API call, averaged over the audit set
async fn poll_url(
    client: &Client,
    config: &PagespeedConfig,
    url: String,
) -> Result<PageScore, RelayError> {
    let request_url = format!("{}?url={}&key={}", config.endpoint, url, config.api_key);

    info!(url = %url, "Fetching PageSpeed data");
    let reply = send_http_request(client, &request_url, Method::GET, None, None, None).await?;
    debug!(url = %url, "Got PageSpeed reply");

    let (score, timestamp) = average_audit_score(&url, &reply)?;
    info!(url = %url, score, timestamp = %timestamp, "Found PageSpeed values");

    Ok(PageScore {
        url,
        score,
        timestamp,
    })
}

/// Stores one averaged score in the table, keyed by URL.
///
/// Numeric attribute values travel as strings on the wire.
async fn store_score(
    tables: &dyn TableService,
    table: &str,
    result: &PageScore,
) -> Result<(), RelayError> {
    let key = HashMap::from([(
        "url".to_string(),
        AttributeValue::S(result.url.clone()),
    )]);

    let updates = HashMap::from([
        (
            "latest_score_value".to_string(),
            AttributeValueUpdate::builder()
                .value(AttributeValue::N(result.score.to_string()))
                .action(AttributeAction::Put)
                .build(),
        ),
        (
            "latest_score_timestamp".to_string(),
            AttributeValueUpdate::builder()
                .value(AttributeValue::S(result.timestamp.clone()))
                .action(AttributeAction::Put)
                .build(),
        ),
    ]);

    tables.update_item(table, key, updates).await
}

/// Polls every configured URL concurrently and stores each average score
pub async fn poll_and_store_scores(
    client: &Client,
    tables: &dyn TableService,
    config: &PagespeedConfig,
    _event: Value,
) -> Result<Value, RelayError> {
    let jobs = config
        .urls
        .iter()
        .map(|url| {
            let url = url.clone();
            async move {
                let result = poll_url(client, config, url).await?;
                store_score(tables, &config.table, &result).await?;
                Ok(json!({
                    "url": result.url,
                    "score": result.score,
                    "timestamp": result.timestamp,
                }))
            }
            .boxed()
        })
        .collect();

    let results = run_all(jobs).await?;

    Ok(json!(results))
}

/// Lambda entry point
pub async fn handler(event: LambdaEvent<Value>) -> Result<Response, Error> {
    let aws_config = aws_config::load_from_env().await;
    let tables: Arc<dyn TableService> = Arc::new(DynamoTableService::new(
        aws_sdk_dynamodb::Client::new(&aws_config),
    ));
    let client = Client::new();
    let invocation = InvocationContext::from_env();

    let handler = EventHandler::new(
        "pagespeed_poller",
        event.payload,
        &invocation,
        action(move |event| {
            let client = client.clone();
            let tables = tables.clone();
            async move {
                let config = PagespeedConfig::from_env()?;
                poll_and_store_scores(&client, tables.as_ref(), &config, event).await
            }
        }),
    );

    handler.respond().await.map_err(Into::into)
}
