/// Function-invoke-by-name service
use crate::error::RelayError;
use async_trait::async_trait;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use serde_json::Value;
use tracing::debug;

/// Invocation flavors supported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeType {
    DryRun,
    RequestResponse,
    Event,
}

impl InvokeType {
    fn as_invocation_type(self) -> InvocationType {
        match self {
            Self::DryRun => InvocationType::DryRun,
            Self::RequestResponse => InvocationType::RequestResponse,
            Self::Event => InvocationType::Event,
        }
    }

    /// Synchronous flavors return a payload worth decoding
    fn returns_payload(self) -> bool {
        matches!(self, Self::DryRun | Self::RequestResponse)
    }
}

#[async_trait]
pub trait FunctionService: Send + Sync {
    /// Invokes another function with a JSON payload; the decoded reply
    /// payload is returned for synchronous invoke types
    async fn invoke(
        &self,
        name: &str,
        payload: &Value,
        invoke_type: InvokeType,
    ) -> Result<Value, RelayError>;
}

pub struct LambdaFunctionService {
    client: aws_sdk_lambda::Client,
}

impl LambdaFunctionService {
    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionService for LambdaFunctionService {
    async fn invoke(
        &self,
        name: &str,
        payload: &Value,
        invoke_type: InvokeType,
    ) -> Result<Value, RelayError> {
        debug!(name, "Invoking lambda");

        let response = self
            .client
            .invoke()
            .function_name(name)
            .invocation_type(invoke_type.as_invocation_type())
            .payload(Blob::new(serde_json::to_vec(payload)?))
            .send()
            .await
            .map_err(|err| RelayError::Unexpected(format!("lambda invoke failed: {}", err)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(RelayError::with_status(
                format!("lambda response status: {}", status),
                status as u16,
            ));
        }

        if invoke_type.returns_payload() {
            if let Some(blob) = response.payload() {
                debug!(name, "Deserializing lambda response payload");
                return Ok(serde_json::from_slice(blob.as_ref())?);
            }
        }

        Ok(Value::Null)
    }
}
