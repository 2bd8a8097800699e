/// Relay Core - Shared dispatch framework for the relay Lambda functions
///
/// This crate contains the event dispatch framework (handlers + Response),
/// the fan-out and log-stream retry helpers, and the thin AWS service
/// clients used across the relay worker binaries.
pub mod constants;
pub mod error;
pub mod handlers;
pub mod models;
pub mod response;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use error::RelayError;
pub use response::Response;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
