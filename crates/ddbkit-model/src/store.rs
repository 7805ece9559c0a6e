//! The store abstraction.
//!
//! [`DynamoStore`] uses `#[async_trait]` because it must be object-safe: the
//! higher layers hold stores as `Arc<dyn DynamoStore>` and never care whether
//! the items live in DynamoDB or in process memory.

use async_trait::async_trait;

use crate::error::DynamoDBError;
use crate::input::{
    BatchGetItemInput, BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput,
    QueryInput, ScanInput, TransactWriteItemsInput, UpdateItemInput,
};
use crate::output::{
    BatchGetItemOutput, BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput,
    QueryOutput, ScanOutput, TransactWriteItemsOutput, UpdateItemOutput,
};

/// A DynamoDB-compatible key-value/document store.
///
/// Each method is one round trip. Implementations report every failure as a
/// [`DynamoDBError`] carrying the service error code.
#[async_trait]
pub trait DynamoStore: Send + Sync + std::fmt::Debug {
    /// Insert or replace an item.
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError>;

    /// Read an item by primary key.
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError>;

    /// Apply an update expression to an item, creating it if absent.
    async fn update_item(&self, input: UpdateItemInput)
    -> Result<UpdateItemOutput, DynamoDBError>;

    /// Delete an item by primary key. Deleting a missing item succeeds.
    async fn delete_item(&self, input: DeleteItemInput)
    -> Result<DeleteItemOutput, DynamoDBError>;

    /// Read one page of a partition.
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError>;

    /// Read one page of a whole table or index.
    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError>;

    /// Read many items by key.
    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, DynamoDBError>;

    /// Put or delete many items.
    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, DynamoDBError>;

    /// Apply all writes or none.
    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, DynamoDBError>;
}
