/// SNS producer for the social-publishing pipeline
///
/// Scrapes title and description from the page at the event's `url` and
/// publishes the result to the fan-out topic. Consumers subscribed to the
/// topic deliver the content to their network, honoring the optional
/// `disable` list carried inside the message.
use lambda_runtime::{Error, LambdaEvent};
use regex::Regex;
use relay_core::error::RelayError;
use relay_core::handlers::{action, EventHandler};
use relay_core::models::InvocationContext;
use relay_core::response::Response;
use relay_core::services::sns::{SnsTopicService, TopicService};
use relay_core::utils::env_var;
use relay_core::utils::http::{send_http_request, validate_url};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::sync::Arc;
use std::sync::LazyLock;
use tracing::{debug, info};

static TITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static DESCRIPTION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*name=["']description["'][^>]*content=["']([^"']*)["']"#).unwrap()
});

/// Scrapes title and description from the page markup
fn scrape_page(url: &str, page: &str) -> Result<Value, RelayError> {
    debug!(url, "Parsing page content for title and description");

    let title = TITLE_TAG
        .captures(page)
        .map(|captures| captures[1].trim().to_string())
        .ok_or_else(|| RelayError::with_status(format!("No title found at {}", url), 500))?;

    let description = DESCRIPTION_TAG
        .captures(page)
        .map(|captures| captures[1].trim().to_string())
        .ok_or_else(|| {
            RelayError::with_status(format!("No description meta tag found at {}", url), 500)
        })?;

    Ok(json!({
        "url": url,
        "title": title,
        "description": description,
    }))
}

/// Fetches the page at `event["url"]` and publishes the scraped content
pub async fn publish(
    client: &Client,
    topics: &dyn TopicService,
    topic_arn: &str,
    event: Value,
) -> Result<Value, RelayError> {
    let url = event
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| RelayError::handled("Missing 'url' key in payload"))?;

    validate_url(url)?;

    info!(url, "Scraping page in search of title and description");
    let reply = send_http_request(client, url, Method::GET, None, None, None).await?;
    let page = reply
        .as_str()
        .ok_or_else(|| RelayError::with_status(format!("Unexpected content at {}", url), 500))?;

    let mut content = scrape_page(url, page)?;
    content["disable"] = event.get("disable").cloned().unwrap_or_else(|| json!([]));

    let message_id = topics
        .publish(topic_arn, "publish_to_social", &content)
        .await?;

    Ok(json!(format!(
        "messageId '{}' with content scraped from source {} delivered successfully",
        message_id, url
    )))
}

/// Lambda entry point
pub async fn handler(event: LambdaEvent<Value>) -> Result<Response, Error> {
    let aws_config = aws_config::load_from_env().await;
    let topics: Arc<dyn TopicService> =
        Arc::new(SnsTopicService::new(aws_sdk_sns::Client::new(&aws_config)));
    let client = Client::new();
    let invocation = InvocationContext::from_env();

    let handler = EventHandler::new(
        "publish_to_social",
        event.payload,
        &invocation,
        action(move |event| {
            let client = client.clone();
            let topics = topics.clone();
            async move {
                let topic_arn = env_var("SNS_TOPIC")?;
                publish(&client, topics.as_ref(), &topic_arn, event).await
            }
        }),
    );

    handler.respond().await.map_err(Into::into)
}
