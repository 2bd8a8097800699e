/// Sequential log-stream client with sequence-token renegotiation
///
/// CloudWatch Logs enforces strictly sequential writes per stream: every
/// write after the first must carry the server-issued sequence token, and a
/// stale token is rejected with a conflict error whose detail embeds the
/// correct token. The append helper renegotiates reactively instead of
/// caching tokens across invocations.
use crate::constants::LOG_APPEND_MAX_ATTEMPTS;
use crate::error::RelayError;
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::error::ProvideErrorMetadata;
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// One structured event on a stream, timestamp in milliseconds UTC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: i64,
    pub message: String,
}

/// Failure classes of a single append attempt
#[derive(Debug, Clone, Error)]
pub enum PutEventsError {
    /// Conflict signal; `detail` carries the correct token after the last ':'
    #[error("invalid sequence token: {detail}")]
    InvalidToken { detail: String },

    /// Anything else, fatal and never retried
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait LogStreamClient: Send + Sync {
    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<LogEvent>,
        sequence_token: Option<String>,
    ) -> Result<(), PutEventsError>;

    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        start_time: i64,
    ) -> Result<Vec<LogEvent>, RelayError>;

    async fn stream_names(&self, group: &str) -> Result<Vec<String>, RelayError>;

    async fn delete_stream(&self, group: &str, stream: &str) -> Result<(), RelayError>;
}

/// Extracts the expected sequence token from a conflict error detail.
///
/// The server does not expose the token as a structured attribute, it only
/// appears as the trailing `": TOKEN"` of the message string.
pub fn parse_sequence_token(detail: &str) -> Option<String> {
    let token = detail.rsplit(':').next()?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

fn is_empty_content(message: &Value) -> bool {
    match message {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Appends one structured JSON event to a stream, renegotiating the
/// sequence token on conflict with a bounded number of attempts.
pub async fn append_event(
    client: &dyn LogStreamClient,
    group: &str,
    stream: &str,
    message: &Value,
) -> Result<String, RelayError> {
    debug!(group, stream, "Sending event content to log stream");

    if is_empty_content(message) {
        return Err(RelayError::with_status(
            "No content to send to log stream, aborting",
            500,
        ));
    }

    let event = LogEvent {
        timestamp: Utc::now().timestamp_millis(),
        message: serde_json::to_string(message)?,
    };

    let mut sequence_token: Option<String> = None;

    for attempt in 1..=LOG_APPEND_MAX_ATTEMPTS {
        match sequence_token {
            Some(ref token) => debug!(attempt, token = %token, "Appending with sequence token"),
            None => debug!(attempt, "Appending without sequence token"),
        }

        match client
            .put_events(group, stream, vec![event.clone()], sequence_token.clone())
            .await
        {
            Ok(()) => {
                info!(group, stream, "Event content delivered");
                return Ok(format!(
                    "Successfully delivered event content to log group {} stream {}",
                    group, stream
                ));
            }
            Err(PutEventsError::InvalidToken { detail }) => {
                sequence_token = parse_sequence_token(&detail);
                debug!(attempt, token = ?sequence_token, "Sequence token conflict, renegotiating");
            }
            Err(PutEventsError::Other(detail)) => {
                return Err(RelayError::with_status(
                    format!("Unexpected response from logs client: {}", detail),
                    500,
                ));
            }
        }
    }

    Err(RelayError::with_status(
        format!(
            "Failed sending event content to log stream after {} attempts",
            LOG_APPEND_MAX_ATTEMPTS
        ),
        500,
    ))
}

/// All events of every stream in a group, keyed by stream name
pub async fn read_all_streams(
    client: &dyn LogStreamClient,
    group: &str,
) -> Result<HashMap<String, Vec<LogEvent>>, RelayError> {
    info!(group, "Reading all events from all log streams");

    let mut streams = HashMap::new();
    for name in client.stream_names(group).await? {
        let events = client.get_events(group, &name, 0).await?;
        streams.insert(name, events);
    }

    Ok(streams)
}

/// CloudWatch Logs implementation
pub struct CloudWatchLogStreamClient {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogStreamClient {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogStreamClient for CloudWatchLogStreamClient {
    async fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: Vec<LogEvent>,
        sequence_token: Option<String>,
    ) -> Result<(), PutEventsError> {
        let mut request = self
            .client
            .put_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .set_sequence_token(sequence_token);

        for event in events {
            let input = InputLogEvent::builder()
                .timestamp(event.timestamp)
                .message(event.message)
                .build()
                .map_err(|err| PutEventsError::Other(err.to_string()))?;
            request = request.log_events(input);
        }

        request.send().await.map_err(|err| {
            let service_error = err.into_service_error();

            if service_error.is_invalid_sequence_token_exception()
                || service_error.is_data_already_accepted_exception()
            {
                PutEventsError::InvalidToken {
                    detail: service_error.meta().message().unwrap_or_default().to_string(),
                }
            } else {
                PutEventsError::Other(service_error.to_string())
            }
        })?;

        Ok(())
    }

    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        start_time: i64,
    ) -> Result<Vec<LogEvent>, RelayError> {
        let response = self
            .client
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .start_time(start_time)
            .send()
            .await
            .map_err(|err| {
                RelayError::Unexpected(format!("get_log_events failed: {}", err))
            })?;

        let events: Vec<LogEvent> = response
            .events()
            .iter()
            .map(|event| LogEvent {
                timestamp: event.timestamp().unwrap_or(0),
                message: event.message().unwrap_or("").to_string(),
            })
            .collect();

        info!(group, stream, count = events.len(), "Found events");
        Ok(events)
    }

    async fn stream_names(&self, group: &str) -> Result<Vec<String>, RelayError> {
        let response = self
            .client
            .describe_log_streams()
            .log_group_name(group)
            .send()
            .await
            .map_err(|err| {
                RelayError::Unexpected(format!("describe_log_streams failed: {}", err))
            })?;

        Ok(response
            .log_streams()
            .iter()
            .filter_map(|stream| stream.log_stream_name().map(str::to_string))
            .collect())
    }

    async fn delete_stream(&self, group: &str, stream: &str) -> Result<(), RelayError> {
        debug!(group, stream, "Deleting log stream");

        self.client
            .delete_log_stream()
            .log_group_name(group)
            .log_stream_name(stream)
            .send()
            .await
            .map_err(|err| {
                RelayError::Unexpected(format!("delete_log_stream failed: {}", err))
            })?;

        Ok(())
    }
}
