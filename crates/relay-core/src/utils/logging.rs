/// Process-wide logging setup and redaction helpers
use crate::constants::{DEFAULT_LOG_LEVEL, LOG_LEVEL_ENV};
use regex::Regex;
use std::sync::LazyLock;
use tracing_subscriber::EnvFilter;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap());

/// Initializes the json tracing subscriber once at process start.
///
/// The filter comes from the LOG_LEVEL environment variable, defaulting to
/// `info`. Handlers receive no logger; they emit through the global
/// subscriber configured here.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();
}

/// Redacts email addresses from text, preserving the domain for debugging
pub fn redact_email(text: &str) -> String {
    EMAIL_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            let email = &caps[0];
            match email.find('@') {
                Some(at) => format!("***{}", &email[at..]),
                None => "***@***".to_string(),
            }
        })
        .to_string()
}
