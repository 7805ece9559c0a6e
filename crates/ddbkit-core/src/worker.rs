//! The fluent table accessor.
//!
//! A [`Worker`] is an immutable request configuration bound to a shared store
//! handle. Setters consume the worker and return the updated configuration;
//! terminal operations borrow it and issue exactly one store call each.
//!
//! ```text
//! Worker::new(store).table("Task").key("ID", "1").get::<Task>()
//! Worker::new(store).table("Event").key("Stream", "s").limit(20).query::<Event>()
//! ```
//!
//! Paginated reads return a [`Page`]; feed it back with [`Worker::after`] to
//! read the next one.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ddbkit_model::input::{
    BatchGetItemInput, BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput,
    QueryInput, ScanInput, UpdateItemInput,
};
use ddbkit_model::types::{KeysAndAttributes, Update, WriteRequest};
use ddbkit_model::{
    AttributeValue, DynamoDBError, DynamoStore, Item, Key, StoreOperation, StringSet,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::codec;
use crate::cursor::{Cursor, encode_last_evaluated_key};
use crate::error::{DdbKitError, DdbKitResult};
use crate::expression::{
    Expression, ExpressionBuilder, ExpressionError, UpdateBuilder, filter_from,
    key_condition_from,
};

/// One page of a query or scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Decoded records, in store order.
    pub items: Vec<T>,
    /// Cursor for the next page; empty when there is none.
    pub cursor: Cursor,
}

impl<T> Page<T> {
    /// Returns `true` when another page can be requested.
    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.cursor.is_empty()
    }

    fn empty() -> Self {
        Self {
            items: Vec::new(),
            cursor: Cursor::empty(),
        }
    }
}

/// Fluent accessor for one table (or one of its indexes).
#[derive(Debug, Clone)]
pub struct Worker {
    store: Arc<dyn DynamoStore>,
    table_name: String,
    index_name: Option<String>,
    key: BTreeMap<String, AttributeValue>,
    filter: BTreeMap<String, AttributeValue>,
    projection: Vec<String>,
    limit: Option<i32>,
    offset: Cursor,
    reverse: bool,
    consistent_read: bool,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

impl Worker {
    /// A blank configuration over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DynamoStore>) -> Self {
        Self {
            store,
            table_name: String::new(),
            index_name: None,
            key: BTreeMap::new(),
            filter: BTreeMap::new(),
            projection: Vec::new(),
            limit: None,
            offset: Cursor::empty(),
            reverse: false,
            consistent_read: false,
        }
    }

    /// Target table.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Read from a secondary index instead of the base table.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Add one key attribute.
    #[must_use]
    pub fn key(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.key.insert(name.into(), value.into());
        self
    }

    /// Replace the whole key specification.
    #[must_use]
    pub fn keys<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.key = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Add one equality filter.
    #[must_use]
    pub fn filter(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.filter.insert(name.into(), value.into());
        self
    }

    /// Return only these attributes.
    #[must_use]
    pub fn projection<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = names.into_iter().map(Into::into).collect();
        self
    }

    /// Evaluate at most `limit` items per page. Zero or negative means no
    /// limit.
    #[must_use]
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    /// Resume after the key encoded in `cursor`. An empty or unreadable
    /// cursor starts from the beginning.
    #[must_use]
    pub fn offset(mut self, cursor: impl Into<Cursor>) -> Self {
        self.offset = cursor.into();
        self
    }

    /// Resume after `page`.
    #[must_use]
    pub fn after<T>(self, page: &Page<T>) -> Self {
        self.offset(page.cursor.clone())
    }

    /// Read in descending sort key order.
    #[must_use]
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Ask for strongly consistent reads.
    #[must_use]
    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = consistent;
        self
    }

    /// The configured table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The configured cursor.
    #[must_use]
    pub fn cursor(&self) -> &Cursor {
        &self.offset
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

impl Worker {
    /// Put the whole record, replacing any item with the same key.
    pub async fn save<T: Serialize + ?Sized>(&self, record: &T) -> DdbKitResult<()> {
        let item = codec::to_item(record)?;
        debug!(table = %self.table_name, "put item");
        self.store
            .put_item(PutItemInput {
                table_name: self.table_name.clone(),
                item,
            })
            .await
            .map_err(fail(StoreOperation::PutItem))?;
        Ok(())
    }

    /// Put all records in one batch call.
    ///
    /// The batch is not split: callers keep it within the store's per-call
    /// limits. Writes the store reports as unprocessed are not retried; they
    /// fail the call with [`DdbKitError::Unprocessed`].
    pub async fn batch_save<T: Serialize>(&self, records: &[T]) -> DdbKitResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let writes = records
            .iter()
            .map(|r| codec::to_item(r).map(WriteRequest::put))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(table = %self.table_name, count = writes.len(), "batch put items");

        let output = self
            .store
            .batch_write_item(BatchWriteItemInput {
                request_items: HashMap::from([(self.table_name.clone(), writes)]),
            })
            .await
            .map_err(fail(StoreOperation::BatchWriteItem))?;

        let count: usize = output.unprocessed_items.values().map(Vec::len).sum();
        if count > 0 {
            return Err(DdbKitError::Unprocessed {
                operation: StoreOperation::BatchWriteItem,
                count,
            });
        }
        Ok(())
    }

    /// Delete the item with the configured key. Deleting a missing item
    /// succeeds.
    pub async fn delete(&self) -> DdbKitResult<()> {
        let key = self.require_key(StoreOperation::DeleteItem)?;
        debug!(table = %self.table_name, "delete item");
        self.store
            .delete_item(DeleteItemInput {
                table_name: self.table_name.clone(),
                key,
            })
            .await
            .map_err(fail(StoreOperation::DeleteItem))?;
        Ok(())
    }

    /// `ADD name by` on the configured item.
    pub async fn incr(&self, name: &str, by: i64) -> DdbKitResult<()> {
        self.apply_update(UpdateBuilder::new().add(name, by)).await
    }

    /// `ADD name {values}` on a string set attribute.
    pub async fn add_to_set<I, S>(&self, name: &str, values: I) -> DdbKitResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: StringSet = values.into_iter().collect();
        self.apply_update(UpdateBuilder::new().add(name, set)).await
    }

    /// `SET name = value` on the configured item.
    pub async fn update(&self, name: &str, value: impl Into<AttributeValue>) -> DdbKitResult<()> {
        self.apply_update(UpdateBuilder::new().set(name, value)).await
    }

    /// `REMOVE name` on the configured item.
    pub async fn remove_attribute(&self, name: &str) -> DdbKitResult<()> {
        self.apply_update(UpdateBuilder::new().remove(name)).await
    }

    /// `SET` every pair in one update.
    pub async fn batch_update<I, K, V>(&self, values: I) -> DdbKitResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.apply_update(set_all(values)).await
    }

    /// Run the update part of a pre-built expression against the configured
    /// item.
    pub async fn update_by_expression(&self, expression: &Expression) -> DdbKitResult<()> {
        let key = self.require_key(StoreOperation::UpdateItem)?;
        let update_expression = expression
            .update()
            .ok_or(ExpressionError::EmptyUpdate)?
            .to_owned();
        debug!(table = %self.table_name, expression = %update_expression, "update item");

        self.store
            .update_item(UpdateItemInput {
                table_name: self.table_name.clone(),
                key,
                update_expression,
                expression_attribute_names: expression.names().clone(),
                expression_attribute_values: expression.values().clone(),
            })
            .await
            .map_err(fail(StoreOperation::UpdateItem))?;
        Ok(())
    }

    /// Prepare a batch `SET` for a transaction without executing it.
    pub fn to_update_item<I, K, V>(&self, values: I) -> DdbKitResult<Update>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.prepare_update(set_all(values))
    }

    /// Prepare any update for a transaction without executing it.
    pub fn prepare_update(&self, update: UpdateBuilder) -> DdbKitResult<Update> {
        let key = self.require_key(StoreOperation::UpdateItem)?;
        let expression = ExpressionBuilder::new().with_update(update).build()?;
        let update_expression = expression
            .update()
            .ok_or(ExpressionError::EmptyUpdate)?
            .to_owned();
        Ok(Update {
            table_name: self.table_name.clone(),
            key,
            update_expression,
            expression_attribute_names: expression.names().clone(),
            expression_attribute_values: expression.values().clone(),
        })
    }

    async fn apply_update(&self, update: UpdateBuilder) -> DdbKitResult<()> {
        let expression = ExpressionBuilder::new().with_update(update).build()?;
        self.update_by_expression(&expression).await
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

impl Worker {
    /// Read the item with the configured key.
    ///
    /// Fails with [`DdbKitError::NotFound`] when there is no such item.
    pub async fn get<T: DeserializeOwned>(&self) -> DdbKitResult<T> {
        self.find().await?.ok_or_else(|| DdbKitError::NotFound {
            table: self.table_name.clone(),
        })
    }

    /// Read the item with the configured key, `None` when there is no such
    /// item.
    pub async fn find<T: DeserializeOwned>(&self) -> DdbKitResult<Option<T>> {
        let key = self.require_key(StoreOperation::GetItem)?;
        let projection = self.projection_expression()?;
        debug!(table = %self.table_name, "get item");

        let output = self
            .store
            .get_item(GetItemInput {
                table_name: self.table_name.clone(),
                key,
                consistent_read: self.consistent_read.then_some(true),
                projection_expression: projection
                    .as_ref()
                    .and_then(|e| e.projection().map(str::to_owned)),
                expression_attribute_names: projection
                    .map(|e| e.names().clone())
                    .unwrap_or_default(),
            })
            .await
            .map_err(fail(StoreOperation::GetItem))?;

        Ok(output.item.map(codec::from_item).transpose()?)
    }

    /// Read one item per id, addressing each by partition key `pk_name` only.
    ///
    /// Ids with no item are silently missing from the result, and the result
    /// order is whatever the store returns. Keys the store leaves unprocessed
    /// fail the call with [`DdbKitError::Unprocessed`].
    pub async fn batch_get<T, I, V>(&self, pk_name: &str, ids: I) -> DdbKitResult<Vec<T>>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        let keys: Vec<Key> = ids
            .into_iter()
            .map(|id| Key::from([(pk_name.to_owned(), id.into())]))
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let projection = self.projection_expression()?;
        let request = KeysAndAttributes {
            keys,
            projection_expression: projection
                .as_ref()
                .and_then(|e| e.projection().map(str::to_owned)),
            expression_attribute_names: projection
                .map(|e| e.names().clone())
                .unwrap_or_default(),
            consistent_read: self.consistent_read.then_some(true),
        };
        debug!(table = %self.table_name, count = request.keys.len(), "batch get items");

        let mut output = self
            .store
            .batch_get_item(BatchGetItemInput {
                request_items: HashMap::from([(self.table_name.clone(), request)]),
            })
            .await
            .map_err(fail(StoreOperation::BatchGetItem))?;

        let count: usize = output
            .unprocessed_keys
            .values()
            .map(|ka| ka.keys.len())
            .sum();
        if count > 0 {
            return Err(DdbKitError::Unprocessed {
                operation: StoreOperation::BatchGetItem,
                count,
            });
        }

        let items = output
            .responses
            .remove(&self.table_name)
            .unwrap_or_default();
        Ok(codec::from_items(items)?)
    }

    /// Read one page using the configured key (AND of equalities), filter
    /// and projection.
    pub async fn query<T: DeserializeOwned>(&self) -> DdbKitResult<Page<T>> {
        let Some(key_condition) = key_condition_from(&self.key) else {
            return Err(DdbKitError::MissingKey {
                operation: StoreOperation::Query,
            });
        };
        let mut builder = ExpressionBuilder::new().with_key_condition(key_condition);
        if let Some(filter) = filter_from(&self.filter) {
            builder = builder.with_filter(filter);
        }
        if !self.projection.is_empty() {
            builder = builder.with_projection(self.projection.iter().cloned());
        }
        self.query_by_expression(&builder.build()?).await
    }

    /// Read one page using a pre-built expression. This is the way to run
    /// range and prefix key conditions.
    pub async fn query_by_expression<T: DeserializeOwned>(
        &self,
        expression: &Expression,
    ) -> DdbKitResult<Page<T>> {
        debug!(
            table = %self.table_name,
            index = ?self.index_name,
            key_condition = ?expression.key_condition(),
            "query"
        );
        let output = self
            .store
            .query(QueryInput {
                table_name: self.table_name.clone(),
                index_name: self.index_name.clone(),
                key_condition_expression: expression.key_condition().map(str::to_owned),
                filter_expression: expression.filter().map(str::to_owned),
                projection_expression: expression.projection().map(str::to_owned),
                expression_attribute_names: expression.names().clone(),
                expression_attribute_values: expression.values().clone(),
                scan_index_forward: self.reverse.then_some(false),
                limit: self.limit,
                exclusive_start_key: self.offset.to_key().unwrap_or_default(),
                consistent_read: self.consistent_read.then_some(true),
            })
            .await
            .map_err(fail(StoreOperation::Query))?;

        into_page(output.items, &output.last_evaluated_key)
    }

    /// Read one page of the whole table or index, using the configured
    /// filter and projection.
    pub async fn scan<T: DeserializeOwned>(&self) -> DdbKitResult<Page<T>> {
        let mut builder = ExpressionBuilder::new();
        if let Some(filter) = filter_from(&self.filter) {
            builder = builder.with_filter(filter);
        }
        if !self.projection.is_empty() {
            builder = builder.with_projection(self.projection.iter().cloned());
        }
        let expression = match builder.build() {
            Ok(expression) => expression,
            Err(ExpressionError::Unset) => Expression::default(),
            Err(err) => return Err(err.into()),
        };
        debug!(table = %self.table_name, index = ?self.index_name, "scan");

        let output = self
            .store
            .scan(ScanInput {
                table_name: self.table_name.clone(),
                index_name: self.index_name.clone(),
                filter_expression: expression.filter().map(str::to_owned),
                projection_expression: expression.projection().map(str::to_owned),
                expression_attribute_names: expression.names().clone(),
                expression_attribute_values: expression.values().clone(),
                limit: self.limit,
                exclusive_start_key: self.offset.to_key().unwrap_or_default(),
                consistent_read: self.consistent_read.then_some(true),
            })
            .await
            .map_err(fail(StoreOperation::Scan))?;

        into_page(output.items, &output.last_evaluated_key)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl Worker {
    fn require_key(&self, operation: StoreOperation) -> DdbKitResult<Key> {
        if self.key.is_empty() {
            return Err(DdbKitError::MissingKey { operation });
        }
        Ok(self
            .key
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn projection_expression(&self) -> DdbKitResult<Option<Expression>> {
        if self.projection.is_empty() {
            return Ok(None);
        }
        let expression = ExpressionBuilder::new()
            .with_projection(self.projection.iter().cloned())
            .build()?;
        Ok(Some(expression))
    }
}

fn fail(operation: StoreOperation) -> impl FnOnce(DynamoDBError) -> DdbKitError {
    move |source| DdbKitError::store(operation, source)
}

/// One `SET` per distinct name, in name order; a repeated name keeps its
/// last value so no two paths overlap.
fn set_all<I, K, V>(values: I) -> UpdateBuilder
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttributeValue>,
{
    values
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect::<BTreeMap<String, AttributeValue>>()
        .into_iter()
        .fold(UpdateBuilder::new(), |update, (k, v)| update.set(k, v))
}

/// The cursor is only derived when the page carries items; an empty page
/// always ends pagination.
fn into_page<T: DeserializeOwned>(
    items: Vec<Item>,
    last_evaluated_key: &Key,
) -> DdbKitResult<Page<T>> {
    if items.is_empty() {
        return Ok(Page::empty());
    }
    Ok(Page {
        items: codec::from_items(items)?,
        cursor: encode_last_evaluated_key(last_evaluated_key),
    })
}

#[cfg(test)]
mod tests {
    use ddbkit_memory::{KeyAttribute, MemoryStore, TableDefinition};
    use ddbkit_model::DynamoDBErrorCode;
    use ddbkit_model::input::TransactWriteItemsInput;
    use ddbkit_model::output::{
        BatchGetItemOutput, BatchWriteItemOutput, DeleteItemOutput, GetItemOutput,
        PutItemOutput, QueryOutput, ScanOutput, TransactWriteItemsOutput, UpdateItemOutput,
    };
    use serde::Deserialize;

    use super::*;
    use crate::error::ErrorKind;
    use crate::expression::key;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Task {
        #[serde(rename = "ID")]
        id: String,
        #[serde(default)]
        count: i64,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        title: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Event {
        stream: String,
        seq: i64,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        kind: String,
    }

    fn task(id: &str, count: i64) -> Task {
        Task {
            id: id.to_owned(),
            count,
            title: String::new(),
        }
    }

    fn event(seq: i64, kind: &str) -> Event {
        Event {
            stream: "s".to_owned(),
            seq,
            kind: kind.to_owned(),
        }
    }

    fn store() -> Arc<dyn DynamoStore> {
        Arc::new(
            MemoryStore::new()
                .with_table(TableDefinition::new("Task", KeyAttribute::string("ID")))
                .with_table(
                    TableDefinition::new("Event", KeyAttribute::string("Stream"))
                        .with_sort_key(KeyAttribute::number("Seq")),
                ),
        )
    }

    async fn raw_item(store: &Arc<dyn DynamoStore>, id: &str) -> Option<Item> {
        store
            .get_item(GetItemInput {
                table_name: "Task".to_owned(),
                key: Key::from([("ID".to_owned(), AttributeValue::from(id))]),
                ..Default::default()
            })
            .await
            .unwrap()
            .item
    }

    async fn seed_events(store: &Arc<dyn DynamoStore>, count: i64) {
        let worker = Worker::new(Arc::clone(store)).table("Event");
        for seq in 1..=count {
            let kind = if seq % 2 == 0 { "even" } else { "odd" };
            worker.save(&event(seq, kind)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_should_save_and_get_record() {
        let store = store();
        let worker = Worker::new(Arc::clone(&store)).table("Task");
        worker.save(&task("1", 3)).await.unwrap();

        let got: Task = worker.clone().key("ID", "1").get().await.unwrap();
        assert_eq!(got, task("1", 3));
    }

    #[tokio::test]
    async fn test_should_distinguish_not_found_from_other_errors() {
        let store = store();
        let worker = Worker::new(store).table("Task").key("ID", "missing");

        let err = worker.get::<Task>().await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(worker.find::<Task>().await.unwrap(), None);

        let err = worker.clone().table("Nope").get::<Task>().await.unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(
            err.store_code(),
            Some(DynamoDBErrorCode::ResourceNotFoundException)
        );
    }

    #[tokio::test]
    async fn test_should_delete_idempotently() {
        let store = store();
        let worker = Worker::new(store).table("Task");
        worker.save(&task("1", 0)).await.unwrap();

        let keyed = worker.key("ID", "1");
        keyed.delete().await.unwrap();
        keyed.delete().await.unwrap();
        assert!(keyed.find::<Task>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_require_key_for_keyed_operations() {
        let worker = Worker::new(store()).table("Task");
        for err in [
            worker.delete().await.unwrap_err(),
            worker.get::<Task>().await.unwrap_err(),
            worker.incr("Count", 1).await.unwrap_err(),
            worker.query::<Task>().await.unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }
        assert!(worker.to_update_item([("A", 1)]).is_err());
    }

    #[tokio::test]
    async fn test_should_increment_counter() {
        let store = store();
        let worker = Worker::new(Arc::clone(&store)).table("Task");
        worker.save(&task("1", 0)).await.unwrap();

        let keyed = worker.key("ID", "1");
        keyed.incr("Count", 5).await.unwrap();
        let got: Task = keyed.get().await.unwrap();
        assert_eq!(got.count, 5);

        keyed.incr("Count", -2).await.unwrap();
        let got: Task = keyed.get().await.unwrap();
        assert_eq!(got.count, 3);
    }

    #[tokio::test]
    async fn test_should_set_and_remove_attributes() {
        let store = store();
        let worker = Worker::new(Arc::clone(&store)).table("Task").key("ID", "1");
        worker.save(&task("1", 0)).await.unwrap();

        worker.update("Title", "first").await.unwrap();
        assert_eq!(worker.get::<Task>().await.unwrap().title, "first");

        worker
            .batch_update([
                ("Title", AttributeValue::from("second")),
                ("Count", AttributeValue::from(9)),
            ])
            .await
            .unwrap();
        let got: Task = worker.get().await.unwrap();
        assert_eq!((got.title.as_str(), got.count), ("second", 9));

        worker.remove_attribute("Title").await.unwrap();
        let item = raw_item(&store, "1").await.unwrap();
        assert!(!item.contains_key("Title"));
    }

    #[tokio::test]
    async fn test_should_add_members_to_string_set() {
        let store = store();
        let worker = Worker::new(Arc::clone(&store)).table("Task").key("ID", "1");
        worker.save(&task("1", 0)).await.unwrap();

        worker.add_to_set("Tags", ["a", "b"]).await.unwrap();
        worker.add_to_set("Tags", ["b", "c"]).await.unwrap();

        let item = raw_item(&store, "1").await.unwrap();
        let mut tags = item.get("Tags").and_then(AttributeValue::as_ss).unwrap().to_vec();
        tags.sort();
        assert_eq!(tags, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_should_run_update_expression() {
        let store = store();
        let worker = Worker::new(Arc::clone(&store)).table("Task").key("ID", "1");
        worker.save(&task("1", 1)).await.unwrap();

        let expression = ExpressionBuilder::new()
            .with_update(UpdateBuilder::new().add("Count", 10).set("Title", "x"))
            .build()
            .unwrap();
        worker.update_by_expression(&expression).await.unwrap();
        assert_eq!(
            worker.get::<Task>().await.unwrap(),
            Task {
                id: "1".to_owned(),
                count: 11,
                title: "x".to_owned(),
            }
        );

        let no_update = ExpressionBuilder::new()
            .with_projection(["ID"])
            .build()
            .unwrap();
        let err = worker.update_by_expression(&no_update).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expression);
    }

    #[tokio::test]
    async fn test_should_batch_get_present_ids_only() {
        let store = store();
        let worker = Worker::new(store).table("Task");
        worker
            .batch_save(&[task("1", 1), task("2", 2), task("3", 3)])
            .await
            .unwrap();

        let mut got: Vec<Task> = worker.batch_get("ID", ["1", "3", "9"]).await.unwrap();
        got.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(got, vec![task("1", 1), task("3", 3)]);

        let none: Vec<Task> = worker.batch_get("ID", Vec::<String>::new()).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_should_project_batch_get_attributes() {
        let store = store();
        let worker = Worker::new(store).table("Task");
        worker.save(&Task {
            id: "1".to_owned(),
            count: 4,
            title: "t".to_owned(),
        })
        .await
        .unwrap();

        let got: Vec<Task> = worker
            .projection(["ID", "Title"])
            .batch_get("ID", ["1"])
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].title, "t");
        assert_eq!(got[0].count, 0);
    }

    #[tokio::test]
    async fn test_should_fail_batch_save_over_store_limit() {
        let worker = Worker::new(store()).table("Task");
        let tasks: Vec<Task> = (0..26).map(|i| task(&i.to_string(), i)).collect();
        let err = worker.batch_save(&tasks).await.unwrap_err();
        assert_eq!(err.store_code(), Some(DynamoDBErrorCode::ValidationException));
    }

    #[tokio::test]
    async fn test_should_paginate_query_with_cursor() {
        let store = store();
        seed_events(&store, 5).await;
        let worker = Worker::new(store).table("Event").key("Stream", "s").limit(2);

        let first: Page<Event> = worker.query().await.unwrap();
        assert_eq!(first.items.iter().map(|e| e.seq).collect::<Vec<_>>(), [1, 2]);
        assert!(first.has_more());

        let worker = worker.after(&first);
        let second: Page<Event> = worker.query().await.unwrap();
        assert_eq!(second.items.iter().map(|e| e.seq).collect::<Vec<_>>(), [3, 4]);
        assert!(second.has_more());

        let third: Page<Event> = worker.after(&second).query().await.unwrap();
        assert_eq!(third.items.iter().map(|e| e.seq).collect::<Vec<_>>(), [5]);
        assert!(third.cursor.is_empty());
    }

    #[tokio::test]
    async fn test_should_query_in_reverse() {
        let store = store();
        seed_events(&store, 3).await;
        let page: Page<Event> = Worker::new(store)
            .table("Event")
            .key("Stream", "s")
            .reverse(true)
            .query()
            .await
            .unwrap();
        assert_eq!(page.items.iter().map(|e| e.seq).collect::<Vec<_>>(), [3, 2, 1]);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn test_should_filter_query_results() {
        let store = store();
        seed_events(&store, 4).await;
        let page: Page<Event> = Worker::new(store)
            .table("Event")
            .key("Stream", "s")
            .filter("Kind", "even")
            .query()
            .await
            .unwrap();
        assert_eq!(page.items.iter().map(|e| e.seq).collect::<Vec<_>>(), [2, 4]);
    }

    #[tokio::test]
    async fn test_should_ignore_garbage_cursor() {
        let store = store();
        seed_events(&store, 2).await;
        let page: Page<Event> = Worker::new(store)
            .table("Event")
            .key("Stream", "s")
            .offset("not-a-cursor!")
            .query()
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn test_should_query_range_by_expression() {
        let store = store();
        seed_events(&store, 5).await;
        let expression = ExpressionBuilder::new()
            .with_key_condition(key("Stream").equal("s").and(key("Seq").between(2, 4)))
            .build()
            .unwrap();
        let page: Page<Event> = Worker::new(store)
            .table("Event")
            .query_by_expression(&expression)
            .await
            .unwrap();
        assert_eq!(page.items.iter().map(|e| e.seq).collect::<Vec<_>>(), [2, 3, 4]);
    }

    #[tokio::test]
    async fn test_should_scan_pages() {
        let store = store();
        seed_events(&store, 3).await;
        let worker = Worker::new(store).table("Event").limit(2);

        let first: Page<Event> = worker.scan().await.unwrap();
        assert_eq!(first.items.len(), 2);
        let second: Page<Event> = worker.after(&first).scan().await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(!second.has_more());
    }

    #[tokio::test]
    async fn test_should_return_empty_page_without_cursor() {
        let store = store();
        let page: Page<Event> = Worker::new(store)
            .table("Event")
            .key("Stream", "nothing")
            .query()
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(page.cursor.is_empty());
    }

    #[test]
    fn test_should_prepare_update_descriptor() {
        let worker = Worker::new(store()).table("Task").key("ID", "1");
        let update = worker.to_update_item([("Count", 2)]).unwrap();
        assert_eq!(update.table_name, "Task");
        assert_eq!(update.key.get("ID"), Some(&AttributeValue::from("1")));
        assert_eq!(update.update_expression, "SET #n0 = :v0");

        let update = worker
            .prepare_update(UpdateBuilder::new().add("Count", 1))
            .unwrap();
        assert_eq!(update.update_expression, "ADD #n0 :v0");
    }

    #[test]
    fn test_should_keep_last_value_for_repeated_set_name() {
        let worker = Worker::new(store()).table("Task").key("ID", "1");
        let update = worker
            .to_update_item([("Count", 1), ("Title", 5), ("Count", 2)])
            .unwrap();
        assert_eq!(update.update_expression, "SET #n0 = :v0, #n1 = :v1");
        assert_eq!(
            update.expression_attribute_names.get("#n0").map(String::as_str),
            Some("Count")
        );
        assert_eq!(
            update.expression_attribute_values.get(":v0"),
            Some(&AttributeValue::from(2))
        );
    }

    /// Accepts every batch call and reports all of it back as unprocessed.
    #[derive(Debug)]
    struct ThrottledStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl DynamoStore for ThrottledStore {
        async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
            self.inner.put_item(input).await
        }

        async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError> {
            self.inner.get_item(input).await
        }

        async fn update_item(
            &self,
            input: UpdateItemInput,
        ) -> Result<UpdateItemOutput, DynamoDBError> {
            self.inner.update_item(input).await
        }

        async fn delete_item(
            &self,
            input: DeleteItemInput,
        ) -> Result<DeleteItemOutput, DynamoDBError> {
            self.inner.delete_item(input).await
        }

        async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
            self.inner.query(input).await
        }

        async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
            self.inner.scan(input).await
        }

        async fn batch_get_item(
            &self,
            input: BatchGetItemInput,
        ) -> Result<BatchGetItemOutput, DynamoDBError> {
            Ok(BatchGetItemOutput {
                responses: HashMap::new(),
                unprocessed_keys: input.request_items,
            })
        }

        async fn batch_write_item(
            &self,
            input: BatchWriteItemInput,
        ) -> Result<BatchWriteItemOutput, DynamoDBError> {
            Ok(BatchWriteItemOutput {
                unprocessed_items: input.request_items,
            })
        }

        async fn transact_write_items(
            &self,
            input: TransactWriteItemsInput,
        ) -> Result<TransactWriteItemsOutput, DynamoDBError> {
            self.inner.transact_write_items(input).await
        }
    }

    fn throttled() -> Arc<dyn DynamoStore> {
        Arc::new(ThrottledStore {
            inner: MemoryStore::new()
                .with_table(TableDefinition::new("Task", KeyAttribute::string("ID"))),
        })
    }

    #[tokio::test]
    async fn test_should_fail_batch_save_with_unprocessed_writes() {
        let store = throttled();
        let worker = Worker::new(Arc::clone(&store)).table("Task");

        let err = worker
            .batch_save(&[task("1", 0), task("2", 0)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unprocessed);
        assert!(matches!(
            err,
            DdbKitError::Unprocessed {
                operation: StoreOperation::BatchWriteItem,
                count: 2,
            }
        ));
        assert!(raw_item(&store, "1").await.is_none());
    }

    #[tokio::test]
    async fn test_should_fail_batch_get_with_unprocessed_keys() {
        let store = throttled();
        let worker = Worker::new(Arc::clone(&store)).table("Task");
        worker.save(&task("1", 0)).await.unwrap();

        let err = worker
            .batch_get::<Task, _, _>("ID", ["1", "2", "3"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DdbKitError::Unprocessed {
                operation: StoreOperation::BatchGetItem,
                count: 3,
            }
        ));
    }
}
