/// Key-value table service
use crate::error::RelayError;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, AttributeValueUpdate};
use std::collections::HashMap;
use tracing::info;

#[async_trait]
pub trait TableService: Send + Sync {
    /// Full table scan, returns raw attribute rows
    async fn scan(&self, table: &str)
        -> Result<Vec<HashMap<String, AttributeValue>>, RelayError>;

    /// Applies attribute updates to one row
    async fn update_item(
        &self,
        table: &str,
        key: HashMap<String, AttributeValue>,
        updates: HashMap<String, AttributeValueUpdate>,
    ) -> Result<(), RelayError>;
}

pub struct DynamoTableService {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoTableService {
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TableService for DynamoTableService {
    async fn scan(
        &self,
        table: &str,
    ) -> Result<Vec<HashMap<String, AttributeValue>>, RelayError> {
        info!(table, "Scanning table");

        let response = self
            .client
            .scan()
            .table_name(table)
            .send()
            .await
            .map_err(|err| RelayError::Unexpected(format!("table scan failed: {}", err)))?;

        Ok(response.items().to_vec())
    }

    async fn update_item(
        &self,
        table: &str,
        key: HashMap<String, AttributeValue>,
        updates: HashMap<String, AttributeValueUpdate>,
    ) -> Result<(), RelayError> {
        self.client
            .update_item()
            .table_name(table)
            .set_key(Some(key))
            .set_attribute_updates(Some(updates))
            .send()
            .await
            .map_err(|err| RelayError::Unexpected(format!("update_item failed: {}", err)))?;

        Ok(())
    }
}
