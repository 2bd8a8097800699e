/// Typed trigger envelopes decoded from raw Lambda payloads
///
/// Raw events stay `serde_json::Value` until a specialized handler decodes
/// them; preprocessing never mutates the inbound payload, it produces a new
/// working event instead.
use serde::Deserialize;

/// SNS notification envelope
///
/// https://docs.aws.amazon.com/lambda/latest/dg/with-sns.html
#[derive(Debug, Clone, Deserialize)]
pub struct SnsEnvelope {
    #[serde(rename = "Records")]
    pub records: Vec<SnsRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnsRecord {
    #[serde(rename = "Sns")]
    pub sns: SnsNotification,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnsNotification {
    #[serde(rename = "MessageId")]
    pub message_id: String,
    #[serde(rename = "Subject")]
    pub subject: Option<String>,
    #[serde(rename = "Message")]
    pub message: String,
}

/// S3 notification envelope
///
/// https://docs.aws.amazon.com/AmazonS3/latest/dev/notification-content-structure.html
#[derive(Debug, Clone, Deserialize)]
pub struct S3Envelope {
    #[serde(rename = "Records")]
    pub records: Vec<S3Record>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Record {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
}
