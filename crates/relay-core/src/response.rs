/// Response envelope implementing the API Gateway proxy output contract
///
/// Docs:
/// https://docs.aws.amazon.com/apigateway/latest/developerguide/set-up-lambda-proxy-integrations.html
use crate::constants::{CORS_ALLOW_ORIGIN_ENV, DEFAULT_CORS_ALLOW_ORIGIN};
use crate::error::RelayError;
use chrono::{SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Mutable response envelope, one per invocation.
///
/// Constructed empty at the start of handling; exactly one terminal
/// [`Response::put`] call (success value or error) finalizes status and body.
/// Serializes to `{isBase64Encoded, headers, statusCode, body}` where `body`
/// is itself a JSON-encoded string.
#[derive(Debug, Clone)]
pub struct Response {
    headers: HashMap<String, String>,
    name: Option<String>,
    extra: Map<String, Value>,
    text: Option<Value>,
    error: Option<RelayError>,
    timestamp: Option<String>,
}

impl Response {
    pub fn new() -> Self {
        let origin = std::env::var(CORS_ALLOW_ORIGIN_ENV)
            .unwrap_or_else(|_| DEFAULT_CORS_ALLOW_ORIGIN.to_string());

        Self {
            headers: HashMap::from([("Access-Control-Allow-Origin".to_string(), origin)]),
            name: None,
            extra: Map::new(),
            text: None,
            error: None,
            timestamp: None,
        }
    }

    /// Name of the function reported in the body, set by the handlers
    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    /// Adds an arbitrary item to the response body (e.g. SNS MessageId)
    pub fn set_body_item(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }

    /// Finalizes the response with the outcome of the wrapped action.
    ///
    /// Emits the sole severity-routed log line for failures: 404 at info,
    /// other 3xx/4xx and 501 at warn, 500 and above-501 at error.
    pub fn put(&mut self, outcome: Result<Value, RelayError>) {
        match outcome {
            Ok(value) => self.text = Some(value),
            Err(err) => {
                self.error = Some(err);
                self.log_error();
            }
        }

        self.timestamp = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
    }

    /// 200 unless an error was put; then the error's own mapping
    pub fn status_code(&self) -> u16 {
        match &self.error {
            None => 200,
            Some(err) => err.status_code(),
        }
    }

    /// True once an error has been recorded
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    fn log_error(&self) {
        let err = match &self.error {
            Some(err) => err,
            None => return,
        };

        match self.status_code() {
            404 => info!(status = 404, "{}", err),
            code if (300..500).contains(&code) || code == 501 => {
                warn!(status = code, "{}", err)
            }
            code => error!(status = code, "{}", err),
        }
    }

    /// Body mapping serialized into the envelope's `body` string
    fn body(&self) -> Map<String, Value> {
        let mut body = Map::new();

        if let Some(name) = &self.name {
            body.insert("name".to_string(), Value::String(name.clone()));
        }

        for (key, value) in &self.extra {
            body.insert(key.clone(), value.clone());
        }

        body.insert("http_code".to_string(), Value::from(self.status_code()));

        let message = match (&self.error, &self.text) {
            (Some(err), _) => Value::String(err.to_string()),
            (None, Some(text)) => text.clone(),
            (None, None) => Value::Null,
        };
        body.insert("message".to_string(), message);

        if self.error.is_some() {
            body.insert("error".to_string(), Value::Bool(true));
        }

        if let Some(ts) = &self.timestamp {
            body.insert("timestamp".to_string(), Value::String(ts.clone()));
        }

        body
    }

    /// Body rendered as the JSON string API Gateway expects
    pub fn body_string(&self) -> String {
        serde_json::to_string(&self.body()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Response", 4)?;
        state.serialize_field("isBase64Encoded", &false)?;
        state.serialize_field("headers", &self.headers)?;
        state.serialize_field("statusCode", &self.status_code())?;
        state.serialize_field("body", &self.body_string())?;
        state.end()
    }
}
