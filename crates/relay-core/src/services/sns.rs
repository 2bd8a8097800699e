/// Pub/sub topic publish service
use crate::error::RelayError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

#[async_trait]
pub trait TopicService: Send + Sync {
    /// Publishes JSON content under a subject, returns the MessageId
    async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        content: &Value,
    ) -> Result<String, RelayError>;
}

pub struct SnsTopicService {
    client: aws_sdk_sns::Client,
}

impl SnsTopicService {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TopicService for SnsTopicService {
    async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        content: &Value,
    ) -> Result<String, RelayError> {
        info!(topic = %topic_arn, subject, "Publishing message to SNS topic");

        let response = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(serde_json::to_string(content)?)
            .send()
            .await
            .map_err(|err| RelayError::Unexpected(format!("SNS publish failed: {}", err)))?;

        // A publish reply without MessageId means the broker never
        // acknowledged the message; failing the whole invocation makes the
        // platform redeliver the trigger.
        response
            .message_id()
            .map(str::to_string)
            .ok_or_else(|| RelayError::Redelivery("Missing MessageId in SNS response".into()))
    }
}
