/// Application constants
///
/// This module contains all hardcoded values used throughout the relay
/// functions. Constants are organized by category for easy maintenance.
// ============================================================================
// Event Dispatch
// ============================================================================
/// Maximum accepted size of a serialized trigger payload (10 KiB)
pub const MAX_EVENT_SIZE_BYTES: usize = 10 * 1024;

/// Default status code for a handled failure (HTTP Bad Request)
pub const DEFAULT_ERROR_STATUS: u16 = 400;

/// Key checked by SNS handlers for per-message opt-out lists
pub const DEFAULT_DISABLE_KEY: &str = "disable";

/// Wildcard entry in a disable list that suppresses every subscriber
pub const DISABLE_ALL_WILDCARD: &str = "all";

// ============================================================================
// Response Envelope
// ============================================================================

/// Environment variable overriding the CORS allow-origin response header
pub const CORS_ALLOW_ORIGIN_ENV: &str = "CORS_ALLOW_ORIGIN";

/// Default CORS allow-origin header value
pub const DEFAULT_CORS_ALLOW_ORIGIN: &str = "*";

// ============================================================================
// Log Stream Append
// ============================================================================

/// Maximum attempts when renegotiating a log stream sequence token
pub const LOG_APPEND_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// Logging
// ============================================================================

/// Environment variable selecting the tracing filter level
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Filter applied when LOG_LEVEL is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";
