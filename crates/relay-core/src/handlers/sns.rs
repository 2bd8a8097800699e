/// SNS-triggered Lambda event handler
use crate::constants::{DEFAULT_DISABLE_KEY, DISABLE_ALL_WILDCARD};
use crate::error::RelayError;
use crate::handlers::{Action, EventHandler};
use crate::models::{InvocationContext, SnsEnvelope};
use crate::response::Response;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Handler for functions subscribed to an SNS topic.
///
/// Preprocessing unwraps the single-record notification envelope and makes
/// the JSON-decoded `Sns.Message` the new working event. A publisher can
/// suppress individual subscribers per message by listing their names (or
/// the `"all"` wildcard) under the disable key.
pub struct SnsEventHandler {
    inner: EventHandler,
    disable_key: Option<String>,
}

impl SnsEventHandler {
    pub fn new(name: &str, event: Value, context: &InvocationContext, action: Action) -> Self {
        Self {
            inner: EventHandler::new(name, event, context, action),
            disable_key: Some(DEFAULT_DISABLE_KEY.to_string()),
        }
    }

    /// Overrides the opt-out key; `None` disables the opt-out check
    pub fn disable_key(mut self, key: Option<&str>) -> Self {
        self.disable_key = key.map(str::to_string);
        self
    }

    pub async fn respond(mut self) -> Result<Response, RelayError> {
        if let Some(err) = self.inner.take_construction_error() {
            return self.inner.dispatch(Err(err)).await;
        }

        let pre = self.pre_action();
        self.inner.dispatch(pre).await
    }

    fn pre_action(&mut self) -> Result<(), RelayError> {
        info!("Preprocessing SNS event");

        let envelope: SnsEnvelope = serde_json::from_value(self.inner.event.clone())
            .map_err(|err| {
                RelayError::with_status(format!("Malformed SNS envelope: {}", err), 500)
            })?;

        if envelope.records.len() != 1 {
            return Err(RelayError::with_status(
                format!(
                    "SNS event 'Records' is of length {}, expected 1",
                    envelope.records.len()
                ),
                500,
            ));
        }

        let notification = &envelope.records[0].sns;
        info!(
            message_id = %notification.message_id,
            subject = ?notification.subject,
            "Found SNS content in event"
        );

        self.inner
            .response
            .set_body_item("MessageId", json!(notification.message_id));
        self.inner
            .response
            .set_body_item("Subject", json!(notification.subject));

        debug!("Deserializing JSON message content");
        self.inner.event = serde_json::from_str(&notification.message)?;

        self.check_disable_list()
    }

    /// Handled 304 when this handler (or everyone) is opted out for this
    /// message; a present but non-list disable key is a hard error.
    fn check_disable_list(&self) -> Result<(), RelayError> {
        let key = match &self.disable_key {
            Some(key) => key,
            None => return Ok(()),
        };

        let raw = match self.inner.event.get(key) {
            Some(raw) => raw,
            None => return Ok(()),
        };

        debug!(key = %key, "Found opt-out key in SNS content");

        let entries: Vec<String> = serde_json::from_value(raw.clone()).map_err(|_| {
            RelayError::with_status(
                format!("'{}' key must be a list of function names", key),
                500,
            )
        })?;

        if entries
            .iter()
            .any(|entry| entry == &self.inner.name || entry == DISABLE_ALL_WILDCARD)
        {
            return Err(RelayError::with_status(
                format!(
                    "Execution of lambda '{}' disabled by client request",
                    self.inner.name
                ),
                304,
            ));
        }

        debug!(name = %self.inner.name, "Not listed in opt-out key, proceeding");
        Ok(())
    }
}
