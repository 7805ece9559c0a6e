//! [`AwsStore`]: the production [`DynamoStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types as sdk;
use ddbkit_model::input::{
    BatchGetItemInput, BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput,
    QueryInput, ScanInput, TransactWriteItemsInput, UpdateItemInput,
};
use ddbkit_model::output::{
    BatchGetItemOutput, BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput,
    QueryOutput, ScanOutput, TransactWriteItemsOutput, UpdateItemOutput,
};
use ddbkit_model::types::{KeysAndAttributes, WriteRequest};
use ddbkit_model::{DynamoDBError, DynamoDBErrorCode, DynamoStore, StoreOperation};
use tracing::debug;

use crate::config::AwsStoreConfig;
use crate::convert::{item_from_sdk, item_to_sdk, non_empty};

/// A [`DynamoStore`] backed by Amazon DynamoDB (or anything speaking its API).
#[derive(Debug, Clone)]
pub struct AwsStore {
    client: Client,
}

impl AwsStore {
    /// Wrap an existing SDK client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from `config` and the default AWS provider chain.
    pub async fn from_config(config: &AwsStoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if config.static_credentials {
            loader = loader.credentials_provider(Credentials::new(
                "ddbkit", "ddbkit", None, None, "ddbkit-static",
            ));
        }
        let shared = loader.load().await;
        debug!(region = %config.region, endpoint = ?config.endpoint_url, "created DynamoDB client");
        Self::new(Client::new(&shared))
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl DynamoStore for AwsStore {
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        log_call(StoreOperation::PutItem, &input.table_name);
        self.client
            .put_item()
            .table_name(input.table_name)
            .set_item(Some(item_to_sdk(input.item)))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(PutItemOutput::default())
    }

    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError> {
        log_call(StoreOperation::GetItem, &input.table_name);
        let output = self
            .client
            .get_item()
            .table_name(input.table_name)
            .set_key(Some(item_to_sdk(input.key)))
            .set_consistent_read(input.consistent_read)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(non_empty(input.expression_attribute_names))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(GetItemOutput {
            item: output.item.map(item_from_sdk),
        })
    }

    async fn update_item(
        &self,
        input: UpdateItemInput,
    ) -> Result<UpdateItemOutput, DynamoDBError> {
        log_call(StoreOperation::UpdateItem, &input.table_name);
        self.client
            .update_item()
            .table_name(input.table_name)
            .set_key(Some(item_to_sdk(input.key)))
            .update_expression(input.update_expression)
            .set_expression_attribute_names(non_empty(input.expression_attribute_names))
            .set_expression_attribute_values(non_empty(item_to_sdk(
                input.expression_attribute_values,
            )))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(UpdateItemOutput::default())
    }

    async fn delete_item(
        &self,
        input: DeleteItemInput,
    ) -> Result<DeleteItemOutput, DynamoDBError> {
        log_call(StoreOperation::DeleteItem, &input.table_name);
        self.client
            .delete_item()
            .table_name(input.table_name)
            .set_key(Some(item_to_sdk(input.key)))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(DeleteItemOutput::default())
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        log_call(StoreOperation::Query, &input.table_name);
        let output = self
            .client
            .query()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_key_condition_expression(input.key_condition_expression)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(non_empty(input.expression_attribute_names))
            .set_expression_attribute_values(non_empty(item_to_sdk(
                input.expression_attribute_values,
            )))
            .set_scan_index_forward(input.scan_index_forward)
            .set_limit(input.limit)
            .set_exclusive_start_key(non_empty(item_to_sdk(input.exclusive_start_key)))
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(QueryOutput {
            items: output
                .items
                .unwrap_or_default()
                .into_iter()
                .map(item_from_sdk)
                .collect(),
            count: output.count,
            scanned_count: output.scanned_count,
            last_evaluated_key: output
                .last_evaluated_key
                .map(item_from_sdk)
                .unwrap_or_default(),
        })
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        log_call(StoreOperation::Scan, &input.table_name);
        let output = self
            .client
            .scan()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(non_empty(input.expression_attribute_names))
            .set_expression_attribute_values(non_empty(item_to_sdk(
                input.expression_attribute_values,
            )))
            .set_limit(input.limit)
            .set_exclusive_start_key(non_empty(item_to_sdk(input.exclusive_start_key)))
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(ScanOutput {
            items: output
                .items
                .unwrap_or_default()
                .into_iter()
                .map(item_from_sdk)
                .collect(),
            count: output.count,
            scanned_count: output.scanned_count,
            last_evaluated_key: output
                .last_evaluated_key
                .map(item_from_sdk)
                .unwrap_or_default(),
        })
    }

    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, DynamoDBError> {
        debug!(
            operation = %StoreOperation::BatchGetItem,
            tables = input.request_items.len(),
            "store call"
        );
        let request_items = input
            .request_items
            .into_iter()
            .map(|(table, ka)| Ok((table, keys_and_attributes_to_sdk(ka)?)))
            .collect::<Result<HashMap<_, _>, DynamoDBError>>()?;

        let output = self
            .client
            .batch_get_item()
            .set_request_items(Some(request_items))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(BatchGetItemOutput {
            responses: output
                .responses
                .unwrap_or_default()
                .into_iter()
                .map(|(table, items)| (table, items.into_iter().map(item_from_sdk).collect()))
                .collect(),
            unprocessed_keys: output
                .unprocessed_keys
                .unwrap_or_default()
                .into_iter()
                .map(|(table, ka)| (table, keys_and_attributes_from_sdk(ka)))
                .collect(),
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, DynamoDBError> {
        debug!(
            operation = %StoreOperation::BatchWriteItem,
            tables = input.request_items.len(),
            "store call"
        );
        let request_items = input
            .request_items
            .into_iter()
            .map(|(table, requests)| {
                let requests = requests
                    .into_iter()
                    .map(write_request_to_sdk)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((table, requests))
            })
            .collect::<Result<HashMap<_, _>, DynamoDBError>>()?;

        let output = self
            .client
            .batch_write_item()
            .set_request_items(Some(request_items))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(BatchWriteItemOutput {
            unprocessed_items: output
                .unprocessed_items
                .unwrap_or_default()
                .into_iter()
                .map(|(table, requests)| {
                    (
                        table,
                        requests.into_iter().filter_map(write_request_from_sdk).collect(),
                    )
                })
                .collect(),
        })
    }

    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, DynamoDBError> {
        debug!(
            operation = %StoreOperation::TransactWriteItems,
            items = input.transact_items.len(),
            "store call"
        );
        let mut items = Vec::with_capacity(input.transact_items.len());
        for item in input.transact_items {
            let Some(update) = item.update else {
                return Err(DynamoDBError::validation(
                    "Transaction items may only contain Update actions",
                ));
            };
            let update = sdk::Update::builder()
                .table_name(update.table_name)
                .set_key(Some(item_to_sdk(update.key)))
                .update_expression(update.update_expression)
                .set_expression_attribute_names(non_empty(update.expression_attribute_names))
                .set_expression_attribute_values(non_empty(item_to_sdk(
                    update.expression_attribute_values,
                )))
                .build()
                .map_err(build_error)?;
            items.push(sdk::TransactWriteItem::builder().update(update).build());
        }

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .set_client_request_token(input.client_request_token)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(TransactWriteItemsOutput::default())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn log_call(operation: StoreOperation, table: &str) {
    debug!(%operation, table, "store call");
}

/// Map an SDK failure to a [`DynamoDBError`] carrying the service error code.
fn sdk_error<E, R>(err: SdkError<E, R>) -> DynamoDBError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err
        .code()
        .map_or(DynamoDBErrorCode::Unknown, DynamoDBErrorCode::from_code);
    let message = err
        .message()
        .map_or_else(|| DisplayErrorContext(&err).to_string(), ToOwned::to_owned);
    DynamoDBError::with_message(code, message).with_source(err)
}

fn build_error(err: BuildError) -> DynamoDBError {
    DynamoDBError::validation(err.to_string()).with_source(err)
}

fn keys_and_attributes_to_sdk(
    ka: KeysAndAttributes,
) -> Result<sdk::KeysAndAttributes, DynamoDBError> {
    sdk::KeysAndAttributes::builder()
        .set_keys(Some(ka.keys.into_iter().map(item_to_sdk).collect()))
        .set_projection_expression(ka.projection_expression)
        .set_expression_attribute_names(non_empty(ka.expression_attribute_names))
        .set_consistent_read(ka.consistent_read)
        .build()
        .map_err(build_error)
}

fn keys_and_attributes_from_sdk(ka: sdk::KeysAndAttributes) -> KeysAndAttributes {
    KeysAndAttributes {
        keys: ka.keys.into_iter().map(item_from_sdk).collect(),
        projection_expression: ka.projection_expression,
        expression_attribute_names: ka.expression_attribute_names.unwrap_or_default(),
        consistent_read: ka.consistent_read,
    }
}

fn write_request_to_sdk(request: WriteRequest) -> Result<sdk::WriteRequest, DynamoDBError> {
    let put_request = request
        .put_request
        .map(|put| {
            sdk::PutRequest::builder()
                .set_item(Some(item_to_sdk(put.item)))
                .build()
                .map_err(build_error)
        })
        .transpose()?;
    let delete_request = request
        .delete_request
        .map(|delete| {
            sdk::DeleteRequest::builder()
                .set_key(Some(item_to_sdk(delete.key)))
                .build()
                .map_err(build_error)
        })
        .transpose()?;
    Ok(sdk::WriteRequest::builder()
        .set_put_request(put_request)
        .set_delete_request(delete_request)
        .build())
}

fn write_request_from_sdk(request: sdk::WriteRequest) -> Option<WriteRequest> {
    match (request.put_request, request.delete_request) {
        (Some(put), _) => Some(WriteRequest::put(item_from_sdk(put.item))),
        (None, Some(delete)) => Some(WriteRequest::delete(item_from_sdk(delete.key))),
        (None, None) => None,
    }
}
