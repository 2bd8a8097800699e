/// Public HTTPS REST API entry point
use lambda_runtime::{Error, LambdaEvent};
use relay_core::error::RelayError;
use relay_core::handlers::{action, ApiGatewayEventHandler, RouteTable};
use relay_core::models::InvocationContext;
use relay_core::response::Response;
use relay_core::services::lambda::{FunctionService, InvokeType, LambdaFunctionService};
use relay_core::services::logs::{read_all_streams, CloudWatchLogStreamClient, LogStreamClient};
use relay_core::utils::env_var;
use relay_core::utils::logging::redact_email;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Services the API routes depend on
pub struct ApiContext {
    pub functions: Arc<dyn FunctionService>,
    pub logs: Arc<dyn LogStreamClient>,
}

impl ApiContext {
    pub async fn from_env() -> Self {
        let aws_config = aws_config::load_from_env().await;

        Self {
            functions: Arc::new(LambdaFunctionService::new(aws_sdk_lambda::Client::new(
                &aws_config,
            ))),
            logs: Arc::new(CloudWatchLogStreamClient::new(
                aws_sdk_cloudwatchlogs::Client::new(&aws_config),
            )),
        }
    }
}

/// Contact form submission carried in the request body
#[derive(Debug, Deserialize)]
struct ContactSubmission {
    source: String,
    name: String,
    email: String,
    description: String,
}

/// Lambda entry point
pub async fn handler(event: LambdaEvent<Value>) -> Result<Response, Error> {
    let ctx = Arc::new(ApiContext::from_env().await);
    let invocation = InvocationContext::from_env();

    let handler =
        ApiGatewayEventHandler::new("api", event.payload, &invocation, route_table(ctx));

    handler.respond().await.map_err(Into::into)
}

/// Route table served by this function
pub fn route_table(ctx: Arc<ApiContext>) -> RouteTable {
    let mut routes = RouteTable::new();

    routes.insert(
        "GET /robots.txt".to_string(),
        action(|_| async { Ok(json!("User-agent: *\nDisallow: /")) }),
    );

    let contact_ctx = ctx.clone();
    routes.insert(
        "POST /contact".to_string(),
        action(move |event| {
            let ctx = contact_ctx.clone();
            async move { contact(&ctx, event).await }
        }),
    );

    routes.insert(
        "GET /social_report".to_string(),
        action(move |event| {
            let ctx = ctx.clone();
            async move { social_report(&ctx, event).await }
        }),
    );

    routes
}

/// Forwards a contact form submission to the notifications function
async fn contact(ctx: &ApiContext, event: Value) -> Result<Value, RelayError> {
    let notifications = env_var("LAMBDA_NOTIFICATIONS")?;

    let body = event
        .get("body")
        .and_then(Value::as_str)
        .ok_or_else(|| RelayError::handled("Missing 'body' in event"))?;

    debug!("Processing body payload");

    let submission: ContactSubmission = serde_json::from_str(body)
        .map_err(|err| RelayError::handled(format!("JSON body is malformatted: {}", err)))?;

    let message = format!(
        "Source: {}\nName: {}\nMail: {}\nDesc: {}\n",
        submission.source, submission.name, submission.email, submission.description
    );

    info!(payload = %redact_email(&message), "Forwarding contact submission");

    ctx.functions
        .invoke(
            &notifications,
            &json!({
                "title": "New /contact submission received",
                "payload": message,
            }),
            InvokeType::RequestResponse,
        )
        .await
}

/// All events from every stream of the report log group
async fn social_report(ctx: &ApiContext, _event: Value) -> Result<Value, RelayError> {
    let log_group = env_var("REPORT_LOG_GROUP_NAME")?;

    let streams = read_all_streams(ctx.logs.as_ref(), &log_group).await?;

    let mut report = Map::new();
    for (stream, events) in streams {
        let entries: Vec<Value> = events
            .into_iter()
            .map(|event| json!({"timestamp": event.timestamp, "message": event.message}))
            .collect();
        report.insert(stream, Value::Array(entries));
    }

    Ok(Value::Object(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::services::logs::{LogEvent, PutEventsError};
    use tokio::sync::Mutex;

    struct MockFunctionService {
        invocations: Mutex<Vec<(String, Value)>>,
    }

    impl MockFunctionService {
        fn new() -> Self {
            Self {
                invocations: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FunctionService for MockFunctionService {
        async fn invoke(
            &self,
            name: &str,
            payload: &Value,
            _invoke_type: InvokeType,
        ) -> Result<Value, RelayError> {
            self.invocations
                .lock()
                .await
                .push((name.to_string(), payload.clone()));
            Ok(json!("notification accepted"))
        }
    }

    struct StaticLogStreamClient;

    #[async_trait]
    impl LogStreamClient for StaticLogStreamClient {
        async fn put_events(
            &self,
            _group: &str,
            _stream: &str,
            _events: Vec<LogEvent>,
            _token: Option<String>,
        ) -> Result<(), PutEventsError> {
            Ok(())
        }

        async fn get_events(
            &self,
            _group: &str,
            _stream: &str,
            _start_time: i64,
        ) -> Result<Vec<LogEvent>, RelayError> {
            Ok(vec![LogEvent {
                timestamp: 1700000000000,
                message: "{\"status\": \"posted\"}".to_string(),
            }])
        }

        async fn stream_names(&self, _group: &str) -> Result<Vec<String>, RelayError> {
            Ok(vec!["mastodon".to_string()])
        }

        async fn delete_stream(&self, _group: &str, _stream: &str) -> Result<(), RelayError> {
            Ok(())
        }
    }

    fn test_ctx() -> (Arc<ApiContext>, Arc<MockFunctionService>) {
        let functions = Arc::new(MockFunctionService::new());
        let ctx = Arc::new(ApiContext {
            functions: functions.clone(),
            logs: Arc::new(StaticLogStreamClient),
        });
        (ctx, functions)
    }

    fn gateway_event(method: &str, path: &str, body: Option<&str>) -> Value {
        let mut event = json!({"httpMethod": method, "path": path});
        if let Some(body) = body {
            event["body"] = json!(body);
        }
        event
    }

    fn body_of(response: &Response) -> Value {
        serde_json::from_str(&response.body_string()).unwrap()
    }

    #[tokio::test]
    async fn test_robots_txt_route() {
        let (ctx, _) = test_ctx();
        let handler = ApiGatewayEventHandler::new(
            "api",
            gateway_event("GET", "/robots.txt", None),
            &InvocationContext::new("api", "$LATEST"),
            route_table(ctx),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 200);
        assert!(body_of(&response)["message"]
            .as_str()
            .unwrap()
            .starts_with("User-agent"));
    }

    #[tokio::test]
    async fn test_contact_forwards_to_notifications() {
        std::env::set_var("LAMBDA_NOTIFICATIONS", "notify-function");
        let (ctx, functions) = test_ctx();

        let body = json!({
            "source": "www.example.com",
            "name": "Jane",
            "email": "jane@example.com",
            "description": "Hello there"
        })
        .to_string();

        let handler = ApiGatewayEventHandler::new(
            "api",
            gateway_event("post", "/Contact", Some(&body)),
            &InvocationContext::new("api", "$LATEST"),
            route_table(ctx),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 200);

        let invocations = functions.invocations.lock().await;
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "notify-function");
        let payload = invocations[0].1["payload"].as_str().unwrap();
        assert!(payload.contains("Name: Jane"));
        assert!(payload.contains("Mail: jane@example.com"));
    }

    #[tokio::test]
    async fn test_contact_with_malformed_body_is_400() {
        std::env::set_var("LAMBDA_NOTIFICATIONS", "notify-function");
        let (ctx, functions) = test_ctx();

        let handler = ApiGatewayEventHandler::new(
            "api",
            gateway_event("POST", "/contact", Some("not json")),
            &InvocationContext::new("api", "$LATEST"),
            route_table(ctx),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 400);
        assert!(functions.invocations.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (ctx, _) = test_ctx();
        let handler = ApiGatewayEventHandler::new(
            "api",
            gateway_event("DELETE", "/contact", None),
            &InvocationContext::new("api", "$LATEST"),
            route_table(ctx),
        );

        assert_eq!(handler.respond().await.unwrap().status_code(), 404);
    }

    #[tokio::test]
    async fn test_social_report_collects_all_streams() {
        std::env::set_var("REPORT_LOG_GROUP_NAME", "report-group");
        let (ctx, _) = test_ctx();

        let handler = ApiGatewayEventHandler::new(
            "api",
            gateway_event("GET", "/social_report", None),
            &InvocationContext::new("api", "$LATEST"),
            route_table(ctx),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 200);
        let body = body_of(&response);
        assert!(body["message"]["mastodon"].is_array());
    }
}
