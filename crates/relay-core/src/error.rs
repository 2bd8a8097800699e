/// Error types for the relay dispatch framework
use crate::constants::DEFAULT_ERROR_STATUS;
use thiserror::Error;

/// Failure taxonomy for everything that crosses the dispatch boundary.
///
/// Every variant except `Redelivery` is converted into a well-formed
/// `Response` by the handlers; `Redelivery` is additionally re-raised so the
/// Lambda platform marks the invocation failed and redelivers the trigger.
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    /// Deliberate, status-coded failure recognized by the caller
    #[error("{message}")]
    Handled { message: String, status_code: u16 },

    /// Integration deliberately stubbed out, maps to HTTP 501
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Forced-redelivery signal, the only error propagated past the handler
    #[error("Forced redelivery: {0}")]
    Redelivery(String),

    /// Anything unanticipated, maps to HTTP 500
    #[error("{0}")]
    Unexpected(String),
}

impl RelayError {
    /// Handled failure with the default status code (400)
    pub fn handled(message: impl Into<String>) -> Self {
        Self::Handled {
            message: message.into(),
            status_code: DEFAULT_ERROR_STATUS,
        }
    }

    /// Handled failure with an explicit status code
    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Handled {
            message: message.into(),
            status_code,
        }
    }

    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Handled { status_code, .. } => *status_code,
            Self::NotImplemented(_) => 501,
            Self::Redelivery(_) => 500,
            Self::Unexpected(_) => 500,
        }
    }

    /// True only for the forced-redelivery signal
    pub fn is_redelivery(&self) -> bool {
        matches!(self, Self::Redelivery(_))
    }
}

// Conversions for error classes the framework never anticipates explicitly
impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unexpected(err.to_string())
    }
}

impl From<std::env::VarError> for RelayError {
    fn from(err: std::env::VarError) -> Self {
        Self::Unexpected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_code() {
        assert_eq!(RelayError::handled("bad input").status_code(), 400);
    }

    #[test]
    fn test_explicit_status_code() {
        let err = RelayError::with_status("suppressed", 304);
        assert_eq!(err.status_code(), 304);
        assert_eq!(err.to_string(), "suppressed");
    }

    #[test]
    fn test_unexpected_maps_to_500() {
        assert_eq!(RelayError::Unexpected("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_not_implemented_maps_to_501() {
        let err = RelayError::NotImplemented("facebook posting".into());
        assert_eq!(err.status_code(), 501);
    }

    #[test]
    fn test_redelivery_discriminant() {
        assert!(RelayError::Redelivery("missing ack".into()).is_redelivery());
        assert!(!RelayError::handled("nope").is_redelivery());
        assert_eq!(RelayError::Redelivery("x".into()).status_code(), 500);
    }
}
