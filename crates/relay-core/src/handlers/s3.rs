/// S3 notification event handler
use crate::error::RelayError;
use crate::handlers::{Action, EventHandler};
use crate::models::{events::S3Envelope, InvocationContext};
use crate::response::Response;
use serde_json::Value;
use tracing::{debug, info};

/// Handler for functions triggered by S3 bucket notifications.
///
/// Preprocessing surfaces the bucket and key of the single affected object
/// as `bucketName`/`keyName` on the working event.
pub struct S3EventHandler {
    inner: EventHandler,
}

impl S3EventHandler {
    pub fn new(name: &str, event: Value, context: &InvocationContext, action: Action) -> Self {
        Self {
            inner: EventHandler::new(name, event, context, action),
        }
    }

    pub async fn respond(mut self) -> Result<Response, RelayError> {
        if let Some(err) = self.inner.take_construction_error() {
            return self.inner.dispatch(Err(err)).await;
        }

        let pre = self.pre_action();
        self.inner.dispatch(pre).await
    }

    fn pre_action(&mut self) -> Result<(), RelayError> {
        info!("Preprocessing S3 event");

        let envelope: S3Envelope = serde_json::from_value(self.inner.event.clone())
            .map_err(|err| RelayError::with_status(format!("Missing key: {}", err), 500))?;

        if envelope.records.len() != 1 {
            return Err(RelayError::with_status(
                format!(
                    "S3 event 'Records' is of length {}, expected 1",
                    envelope.records.len()
                ),
                500,
            ));
        }

        let entity = &envelope.records[0].s3;
        debug!(bucket = %entity.bucket.name, key = %entity.object.key, "Found S3 object");

        if let Some(object) = self.inner.event.as_object_mut() {
            object.insert(
                "bucketName".to_string(),
                Value::String(entity.bucket.name.clone()),
            );
            object.insert(
                "keyName".to_string(),
                Value::String(entity.object.key.clone()),
            );
        }

        Ok(())
    }
}
