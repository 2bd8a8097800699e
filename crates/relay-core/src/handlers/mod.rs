/// Lambda event dispatch framework
///
/// Every relay function wraps its business action in one of these handlers:
/// the handler validates the inbound payload, runs trigger-specific
/// preprocessing, executes the action and always produces a well-formed
/// [`Response`], whatever the action did. The only error allowed past the
/// boundary is [`RelayError::Redelivery`], which is re-raised after the
/// response has been populated so the platform redelivers the trigger.
pub mod api_gateway;
pub mod s3;
pub mod sns;

use crate::constants::MAX_EVENT_SIZE_BYTES;
use crate::error::RelayError;
use crate::models::InvocationContext;
use crate::response::Response;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, info};

pub use api_gateway::{normalize_route, ApiGatewayEventHandler, RouteTable};
pub use s3::S3EventHandler;
pub use sns::SnsEventHandler;

/// Boxed business action invoked with the working event
pub type ActionFuture = BoxFuture<'static, Result<Value, RelayError>>;
pub type Action = Box<dyn Fn(Value) -> ActionFuture + Send + Sync>;

/// Wraps an async function into an [`Action`]
pub fn action<F, Fut>(f: F) -> Action
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value, RelayError>> + Send + 'static,
{
    Box::new(move |event| f(event).boxed())
}

/// Generic Lambda event handler.
///
/// Takes care of exception handling and logging for actions triggered by
/// untyped events (direct invoke, EventBridge schedules). Trigger-specific
/// handlers wrap this type and add their own preprocessing.
pub struct EventHandler {
    pub(crate) name: String,
    pub(crate) event: Value,
    pub(crate) response: Response,
    pub(crate) action: Action,
    construction_error: Option<RelayError>,
}

impl EventHandler {
    /// Builds the handler and validates the serialized event size.
    ///
    /// An oversized payload is captured here and routed through the normal
    /// response path by `respond`; the action is guaranteed never to run.
    pub fn new(name: &str, event: Value, context: &InvocationContext, action: Action) -> Self {
        let name = name.to_lowercase();

        info!(
            function = %context.function_name,
            version = %context.function_version,
            "Request of execution from Lambda"
        );

        let mut response = Response::new();
        response.set_name(&name);

        let construction_error = validate_event_size(&event);

        Self {
            name,
            event,
            response,
            action,
            construction_error,
        }
    }

    /// Runs the action and finalizes the response
    pub async fn respond(mut self) -> Result<Response, RelayError> {
        match self.construction_error.take() {
            Some(err) => self.dispatch(Err(err)).await,
            None => self.dispatch(Ok(())).await,
        }
    }

    /// Removes the captured construction failure, if any.
    ///
    /// Specialized handlers call this before their own preprocessing so an
    /// oversized payload short-circuits everything downstream.
    pub(crate) fn take_construction_error(&mut self) -> Option<RelayError> {
        self.construction_error.take()
    }

    /// Shared terminal step for all handler flavors.
    ///
    /// A failed preprocessing result skips the action entirely; any error is
    /// fed to [`Response::put`] and only the redelivery signal propagates.
    pub(crate) async fn dispatch(mut self, pre: Result<(), RelayError>) -> Result<Response, RelayError> {
        debug!(event = %self.event, "Handling event");

        let outcome = match pre {
            Ok(()) => {
                debug!(name = %self.name, "Calling action");
                (self.action)(self.event.clone()).await
            }
            Err(err) => Err(err),
        };

        let redelivery = match &outcome {
            Err(err) if err.is_redelivery() => Some(err.clone()),
            _ => None,
        };

        self.response.put(outcome);

        if let Some(err) = redelivery {
            // Response is already populated for observability; failing the
            // invocation makes the platform redeliver the trigger.
            error!("Non-zero exit, Lambda execution will be retried by AWS");
            return Err(err);
        }

        info!("Event handling complete");
        Ok(self.response)
    }
}

fn validate_event_size(event: &Value) -> Option<RelayError> {
    let size = serde_json::to_string(event).map(|s| s.len()).unwrap_or(0);
    debug!(size, limit = MAX_EVENT_SIZE_BYTES, "Checking event payload size");

    if size > MAX_EVENT_SIZE_BYTES {
        return Some(RelayError::handled(format!(
            "Event payload exceeds limits: received {} bytes, max allowed {}",
            size, MAX_EVENT_SIZE_BYTES
        )));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn test_context() -> InvocationContext {
        InvocationContext::new("test-function", "$LATEST")
    }

    fn body_of(response: &Response) -> Value {
        serde_json::from_str(&response.body_string()).unwrap()
    }

    #[tokio::test]
    async fn test_successful_action() {
        let handler = EventHandler::new(
            "Echo",
            json!({"key": "value"}),
            &test_context(),
            action(|event| async move { Ok(event["key"].clone()) }),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 200);
        let body = body_of(&response);
        assert_eq!(body["message"], "value");
        assert_eq!(body["name"], "echo");
    }

    #[tokio::test]
    async fn test_action_failure_becomes_response() {
        let handler = EventHandler::new(
            "failing",
            json!({}),
            &test_context(),
            action(|_| async { Err(RelayError::with_status("no such domain", 404)) }),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 404);
        assert_eq!(body_of(&response)["error"], true);
    }

    #[tokio::test]
    async fn test_unexpected_failure_becomes_500_response() {
        let handler = EventHandler::new(
            "failing",
            json!({}),
            &test_context(),
            action(|_| async { Err(RelayError::Unexpected("integer overflow".into())) }),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 500);
    }

    #[tokio::test]
    async fn test_redelivery_signal_propagates_out() {
        let handler = EventHandler::new(
            "publisher",
            json!({}),
            &test_context(),
            action(|_| async { Err(RelayError::Redelivery("missing MessageId".into())) }),
        );

        let err = handler.respond().await.unwrap_err();
        assert!(err.is_redelivery());
    }

    #[tokio::test]
    async fn test_oversized_event_never_runs_action() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_probe = ran.clone();

        let oversized = json!({"payload": "x".repeat(MAX_EVENT_SIZE_BYTES + 1)});
        let handler = EventHandler::new(
            "bloated",
            oversized,
            &test_context(),
            action(move |_| {
                let ran = ran_probe.clone();
                async move {
                    ran.store(true, Ordering::SeqCst);
                    Ok(Value::Null)
                }
            }),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 400);
        assert!(body_of(&response)["message"]
            .as_str()
            .unwrap()
            .contains("exceeds limits"));
        assert!(!ran.load(Ordering::SeqCst));
    }
}
