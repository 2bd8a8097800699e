/// Scheduled domain-expiry monitor backed by whoisxmlapi.com
use chrono::{Duration, NaiveDateTime, Utc};
use futures::FutureExt;
use lambda_runtime::{Error, LambdaEvent};
use relay_core::error::RelayError;
use relay_core::handlers::{action, EventHandler};
use relay_core::models::InvocationContext;
use relay_core::response::Response;
use relay_core::services::lambda::{FunctionService, InvokeType, LambdaFunctionService};
use relay_core::utils::env_var;
use relay_core::utils::fanout::run_all;
use relay_core::utils::http::send_http_request;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

const WHOIS_API_ENDPOINT: &str = "https://www.whoisxmlapi.com/whoisserver/WhoisService";
const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 14;

#[derive(Debug, Clone)]
pub struct WhoisConfig {
    pub domains: Vec<String>,
    pub api_key: String,
    pub endpoint: String,
    pub notifications_function: String,
    pub expiry_window_days: i64,
}

impl WhoisConfig {
    pub fn from_env() -> Result<Self, RelayError> {
        let domains = env_var("WHOIS_DOMAINS")?
            .replace(' ', "")
            .split(',')
            .filter(|domain| !domain.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            domains,
            api_key: env_var("WHOISXMLAPI_KEY")?,
            endpoint: std::env::var("WHOIS_ENDPOINT")
                .unwrap_or_else(|_| WHOIS_API_ENDPOINT.to_string()),
            notifications_function: env_var("LAMBDA_NOTIFICATIONS")?,
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainStatus {
    pub domain: String,
    #[serde(rename = "expiringSoon")]
    pub expiring_soon: bool,
    #[serde(rename = "expiresDateUTC")]
    pub expires_date: String,
}

/// One WHOIS lookup; expiry within the window marks the domain as expiring
async fn domain_status(
    client: &Client,
    config: &WhoisConfig,
    domain: String,
) -> Result<DomainStatus, RelayError> {
    let url = format!(
        "{}?apiKey={}&domainName={}&outputFormat=JSON",
        config.endpoint, config.api_key, domain
    );

    let reply = send_http_request(client, &url, Method::GET, None, None, None).await?;

    let expires_date = reply["WhoisRecord"]["registryData"]["expiresDate"]
        .as_str()
        .ok_or_else(|| {
            RelayError::with_status(format!("Missing expiresDate for domain {}", domain), 500)
        })?
        .to_string();

    let expires = NaiveDateTime::parse_from_str(
        expires_date.trim_end_matches('Z'),
        "%Y-%m-%dT%H:%M:%S",
    )
    .map_err(|err| {
        RelayError::with_status(
            format!("Unparseable expiresDate '{}': {}", expires_date, err),
            500,
        )
    })?;

    let expiring_soon =
        expires - Utc::now().naive_utc() < Duration::days(config.expiry_window_days);

    Ok(DomainStatus {
        domain,
        expiring_soon,
        expires_date,
    })
}

/// Checks every configured domain in parallel and alerts on upcoming expiry
pub async fn check_domains(
    client: &Client,
    functions: &dyn FunctionService,
    config: &WhoisConfig,
    _event: Value,
) -> Result<Value, RelayError> {
    let jobs = config
        .domains
        .iter()
        .map(|domain| domain_status(client, config, domain.clone()).boxed())
        .collect();

    let statuses = run_all(jobs).await?;

    let expiring: Vec<&DomainStatus> = statuses
        .iter()
        .filter(|status| status.expiring_soon)
        .collect();

    if !expiring.is_empty() {
        let title = "Domain(s) expiring soon";
        let message = expiring
            .iter()
            .map(|status| format!("{}={}", status.domain, status.expires_date))
            .collect::<Vec<_>>()
            .join(", ");

        warn!(%message, "{}", title);
        info!(function = %config.notifications_function, "Sending alert notification");

        functions
            .invoke(
                &config.notifications_function,
                &json!({"title": title, "payload": message}),
                InvokeType::RequestResponse,
            )
            .await?;
    }

    Ok(serde_json::to_value(&statuses)?)
}

/// Lambda entry point
pub async fn handler(event: LambdaEvent<Value>) -> Result<Response, Error> {
    let aws_config = aws_config::load_from_env().await;
    let functions: Arc<dyn FunctionService> = Arc::new(LambdaFunctionService::new(
        aws_sdk_lambda::Client::new(&aws_config),
    ));
    let client = Client::new();
    let invocation = InvocationContext::from_env();

    let handler = EventHandler::new(
        "whois_poller",
        event.payload,
        &invocation,
        action(move |event| {
            let client = client.clone();
            let functions = functions.clone();
            async move {
                let config = WhoisConfig::from_env()?;
                check_domains(&client, functions.as_ref(), &config, event).await
            }
        }),
    );

    handler.respond().await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    pub(crate) struct MockFunctionService {
        pub invocations: Mutex<Vec<(String, Value)>>,
    }

    impl MockFunctionService {
        pub fn new() -> Self {
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
            Ok(json!("alert accepted"))
        }
    }

    #[tokio::test]
    async fn test_no_domains_means_no_alert() {
        let functions = MockFunctionService::new();
        let config = WhoisConfig {
            domains: vec![],
            api_key: "key".to_string(),
            endpoint: WHOIS_API_ENDPOINT.to_string(),
            notifications_function: "notify".to_string(),
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
        };

        let report = check_domains(&Client::new(), &functions, &config, json!({}))
            .await
            .unwrap();

        assert_eq!(report, json!([]));
        assert!(functions.invocations.lock().await.is_empty());
    }
}
