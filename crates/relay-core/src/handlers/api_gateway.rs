/// API Gateway proxy-integration event handler
use crate::error::RelayError;
use crate::handlers::{Action, EventHandler};
use crate::models::InvocationContext;
use crate::response::Response;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// Route key ("POST /contact") to action mapping supplied at construction
pub type RouteTable = HashMap<String, Action>;

/// Normalized route key: method uppercased, path lowercased
pub fn normalize_route(method: &str, path: &str) -> String {
    format!("{} {}", method.to_uppercase(), path.to_lowercase())
}

/// Handler for functions behind an API Gateway proxy integration.
///
/// Input and output shapes:
/// https://docs.aws.amazon.com/apigateway/latest/developerguide/set-up-lambda-proxy-integrations.html
///
/// Preprocessing resolves the action from the route table; the generic
/// dispatch then stays unaware of routing. An unmatched route falls back to
/// an action failing with 404 and the offending route in the message.
pub struct ApiGatewayEventHandler {
    inner: EventHandler,
    routes: RouteTable,
}

impl ApiGatewayEventHandler {
    pub fn new(name: &str, event: Value, context: &InvocationContext, routes: RouteTable) -> Self {
        // Placeholder action, always replaced during preprocessing
        let placeholder: Action = Box::new(|_| {
            async { Err(RelayError::Unexpected("no route resolved".into())) }.boxed()
        });

        Self {
            inner: EventHandler::new(name, event, context, placeholder),
            routes,
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
        let method = self.inner.event.get("httpMethod").and_then(Value::as_str);
        let path = self.inner.event.get("path").and_then(Value::as_str);

        let route = match (method, path) {
            (Some(method), Some(path)) => normalize_route(method, path),
            _ => return Err(RelayError::handled("Missing 'httpMethod' or 'path' in event")),
        };

        info!(route = %route, "Processing HTTP request");

        self.inner.action = match self.routes.remove(&route) {
            Some(action) => action,
            None => {
                let missed = route.clone();
                Box::new(move |_| {
                    let missed = missed.clone();
                    async move {
                        Err(RelayError::with_status(
                            format!("route {} not found", missed),
                            404,
                        ))
                    }
                    .boxed()
                })
            }
        };

        debug!(route = %route, "Adding 'route' key to working event");
        if let Some(object) = self.inner.event.as_object_mut() {
            object.insert("route".to_string(), Value::String(route));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::action;
    use serde_json::json;

    fn test_context() -> InvocationContext {
        InvocationContext::new("api", "$LATEST")
    }

    fn body_of(response: &Response) -> Value {
        serde_json::from_str(&response.body_string()).unwrap()
    }

    #[test]
    fn test_route_normalization() {
        assert_eq!(normalize_route("post", "/Contact"), "POST /contact");
        assert_eq!(normalize_route("GET", "/robots.txt"), "GET /robots.txt");
    }

    #[tokio::test]
    async fn test_matched_route_runs_action() {
        let mut routes = RouteTable::new();
        routes.insert(
            "POST /contact".to_string(),
            action(|event| async move { Ok(event["route"].clone()) }),
        );

        let handler = ApiGatewayEventHandler::new(
            "api",
            json!({"httpMethod": "post", "path": "/Contact", "body": "{}"}),
            &test_context(),
            routes,
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(body_of(&response)["message"], "POST /contact");
    }

    #[tokio::test]
    async fn test_unmatched_route_is_404_with_route_in_message() {
        let handler = ApiGatewayEventHandler::new(
            "api",
            json!({"httpMethod": "GET", "path": "/missing"}),
            &test_context(),
            RouteTable::new(),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 404);
        assert!(body_of(&response)["message"]
            .as_str()
            .unwrap()
            .contains("GET /missing"));
    }

    #[tokio::test]
    async fn test_missing_http_keys_is_400() {
        let handler = ApiGatewayEventHandler::new(
            "api",
            json!({"path": "/contact"}),
            &test_context(),
            RouteTable::new(),
        );

        let response = handler.respond().await.unwrap();
        assert_eq!(response.status_code(), 400);
    }
}
