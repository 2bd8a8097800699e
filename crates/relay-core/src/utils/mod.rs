/// Shared helpers for the relay functions
pub mod fanout;
pub mod http;
pub mod logging;

use crate::error::RelayError;

/// Reads a required environment variable, folding absence into the
/// unexpected-failure class (HTTP 500 at the dispatch boundary)
pub fn env_var(name: &str) -> Result<String, RelayError> {
    std::env::var(name)
        .map_err(|_| RelayError::Unexpected(format!("missing environment variable {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_missing_is_unexpected() {
        let err = env_var("RELAY_TEST_SURELY_UNSET").unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
