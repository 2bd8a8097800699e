/// Blob storage service
use crate::error::RelayError;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use tracing::info;

/// One bucket entry as returned by a listing
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: DateTime<Utc>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), RelayError>;

    /// Missing key maps to Handled 404
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, RelayError>;

    /// Keys sorted lexicographically, as S3 returns them
    async fn list_bucket(&self, bucket: &str) -> Result<Vec<ObjectSummary>, RelayError>;
}

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), RelayError> {
        info!(bucket, key, "Putting object");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| RelayError::Unexpected(format!("put_object failed: {}", err)))?;

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, RelayError> {
        info!(bucket, key, "Getting object");

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let service_error = err.into_service_error();
                if service_error.is_no_such_key() {
                    RelayError::with_status(
                        format!("Key {} not found in bucket {}", key, bucket),
                        404,
                    )
                } else {
                    RelayError::Unexpected(format!("get_object failed: {}", service_error))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|err| RelayError::Unexpected(format!("reading object body failed: {}", err)))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn list_bucket(&self, bucket: &str) -> Result<Vec<ObjectSummary>, RelayError> {
        info!(bucket, "Fetching keys list from bucket");

        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| RelayError::Unexpected(format!("list_objects failed: {}", err)))?;

        response
            .contents()
            .iter()
            .map(|object| {
                let key = object
                    .key()
                    .ok_or_else(|| RelayError::handled("Unexpected S3 response: missing Key"))?
                    .to_string();
                let last_modified = object
                    .last_modified()
                    .and_then(|when| DateTime::from_timestamp(when.secs(), 0))
                    .ok_or_else(|| {
                        RelayError::handled(format!(
                            "Unexpected S3 response: missing LastModified for key {}",
                            key
                        ))
                    })?;

                Ok(ObjectSummary {
                    size: object.size().unwrap_or_default(),
                    key,
                    last_modified,
                })
            })
            .collect()
    }
}
