/// Relay Worker - Lambda function handlers
///
/// Each binary under `src/bin/` wires one handler into the Lambda runtime;
/// the handlers themselves live here so they stay testable off-platform.
pub mod handlers;

pub use relay_core::*;
