/// Outbound HTTP helper for third-party API integrations
use crate::error::RelayError;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};
use url::Url;

/// Basic-auth credentials for endpoints that need them
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub user: String,
    pub pass: String,
}

/// Rejects anything that is not an absolute http(s) URL
pub fn validate_url(url: &str) -> Result<(), RelayError> {
    debug!(url, "Validating URL string");

    let parsed = Url::parse(url).map_err(|_| RelayError::handled(format!("URL invalid: {}", url)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(RelayError::handled(format!("URL invalid: {}", url)));
    }

    Ok(())
}

/// Sends one HTTP request and decodes the reply.
///
/// Form data is URL-encoded into the body (rejected for GET); a non-2xx
/// reply becomes a Handled error carrying the upstream status code. The
/// response body is returned as JSON when it parses, as a plain string
/// value otherwise.
pub async fn send_http_request(
    client: &Client,
    url: &str,
    method: Method,
    form: Option<&HashMap<String, String>>,
    headers: Option<&HashMap<String, String>>,
    auth: Option<&BasicAuth>,
) -> Result<Value, RelayError> {
    validate_url(url)?;

    info!(%method, url, "Handling HTTP request");

    if form.is_some() && method == Method::GET {
        return Err(RelayError::handled("Invalid input: GET does not support 'data'"));
    }

    let mut request = client.request(method.clone(), url);

    if let Some(headers) = headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }

    if let Some(form) = form {
        request = request.form(form);
    }

    if let Some(auth) = auth {
        debug!(user = %auth.user, "Enabling basic authentication");
        request = request.basic_auth(&auth.user, Some(&auth.pass));
    }

    let reply = request
        .send()
        .await
        .map_err(|err| RelayError::Unexpected(format!("HTTP {} request failed: {}", method, err)))?;

    let status = reply.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(RelayError::with_status(
            format!(
                "Unexpected HTTP {} response: {}",
                method,
                status.canonical_reason().unwrap_or("unknown")
            ),
            status.as_u16(),
        ));
    }

    let text = reply
        .text()
        .await
        .map_err(|err| RelayError::Unexpected(format!("Failed reading HTTP response: {}", err)))?;

    let content = match serde_json::from_str::<Value>(&text) {
        Ok(json) => json,
        Err(_) => {
            debug!("Deserialization failed, using content as is");
            Value::String(text)
        }
    };

    info!(%method, url, "HTTP request successful");
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_https() {
        assert!(validate_url("https://api.pushover.net/1/messages.json").is_ok());
        assert!(validate_url("http://example.com/path").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_garbage() {
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url("/relative/path").is_err());
    }

    #[tokio::test]
    async fn test_get_with_form_data_is_rejected() {
        let client = Client::new();
        let form = HashMap::from([("key".to_string(), "value".to_string())]);

        let err = send_http_request(
            &client,
            "https://example.com",
            Method::GET,
            Some(&form),
            None,
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), 400);
    }
}
