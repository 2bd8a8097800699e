/// Notification delivery via the Pushover API
use lambda_runtime::{Error, LambdaEvent};
use relay_core::error::RelayError;
use relay_core::handlers::{action, EventHandler};
use relay_core::models::InvocationContext;
use relay_core::response::Response;
use relay_core::utils::env_var;
use relay_core::utils::http::send_http_request;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

const PUSHOVER_API_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// Pushover application token and user key are both 30-char alphanumerics
const PUSHOVER_TOKEN_LENGTH: usize = 30;

#[derive(Debug, Clone)]
pub struct PushoverConfig {
    pub token: String,
    pub user: String,
    pub endpoint: String,
}

impl PushoverConfig {
    pub fn from_env() -> Result<Self, RelayError> {
        Ok(Self {
            token: env_var("PUSHOVER_TOKEN")?,
            user: env_var("PUSHOVER_USERKEY")?,
            endpoint: std::env::var("PUSHOVER_ENDPOINT")
                .unwrap_or_else(|_| PUSHOVER_API_ENDPOINT.to_string()),
        })
    }

    fn validate(&self) -> Result<(), RelayError> {
        for credential in [&self.token, &self.user] {
            if credential.len() != PUSHOVER_TOKEN_LENGTH
                || !credential.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return Err(RelayError::with_status("Pushover string token malformed", 500));
            }
        }
        Ok(())
    }
}

/// Delivers `{title, payload}` from the event as a Pushover message
pub async fn send(
    client: &Client,
    config: &PushoverConfig,
    event: Value,
) -> Result<Value, RelayError> {
    info!("Delivering message via Pushover");

    let title = event
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| RelayError::handled("Missing 'title' in event"))?;
    let payload = event
        .get("payload")
        .and_then(Value::as_str)
        .ok_or_else(|| RelayError::handled("Missing 'payload' in event"))?;

    config.validate()?;

    let form = HashMap::from([
        ("token".to_string(), config.token.clone()),
        ("user".to_string(), config.user.clone()),
        ("message".to_string(), payload.to_string()),
        ("title".to_string(), title.to_string()),
    ]);

    let reply =
        send_http_request(client, &config.endpoint, Method::POST, Some(&form), None, None).await?;

    match (reply.get("status").and_then(Value::as_i64), reply.get("request")) {
        (Some(1), Some(request_id)) => Ok(json!(format!(
            "Message sent to Pushover successful (request {})",
            request_id
        ))),
        _ => Err(RelayError::with_status(
            format!("Unexpected response from Pushover: {}", reply),
            500,
        )),
    }
}

/// Lambda entry point
pub async fn handler(event: LambdaEvent<Value>) -> Result<Response, Error> {
    let invocation = InvocationContext::from_env();
    let client = Client::new();

    let handler = EventHandler::new(
        "send_to_pushover",
        event.payload,
        &invocation,
        action(move |event| {
            let client = client.clone();
            async move {
                let config = PushoverConfig::from_env()?;
                send(&client, &config, event).await
            }
        }),
    );

    handler.respond().await.map_err(Into::into)
}
