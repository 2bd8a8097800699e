/// Data models for trigger envelopes and invocation metadata
pub mod context;
pub mod events;

pub use context::InvocationContext;
pub use events::{S3Envelope, SnsEnvelope, SnsNotification, SnsRecord};
