//! [`MemoryStore`]: a [`DynamoStore`] that keeps every table in process memory.
//!
//! The store mirrors the DynamoDB behaviors ddbkit relies on: key schema
//! validation, key-condition rules, `Limit` applied before the filter,
//! `LastEvaluatedKey` pagination, batch size limits and all-or-nothing
//! transactions that cancel when they touch an item another transaction is
//! still writing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use ddbkit_model::input::{
    BatchGetItemInput, BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput,
    QueryInput, ScanInput, TransactWriteItemsInput, UpdateItemInput,
};
use ddbkit_model::output::{
    BatchGetItemOutput, BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput,
    QueryOutput, ScanOutput, TransactWriteItemsOutput, UpdateItemOutput,
};
use ddbkit_model::types::{ExpressionAttributeNames, ExpressionAttributeValues, Update};
use ddbkit_model::{AttributeValue, DynamoDBError, DynamoDBErrorCode, DynamoStore, Item, Key};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{expression_error_to_dynamodb, storage_error_to_dynamodb};
use crate::expression::{
    CompareOp, EvalContext, Expr, FunctionName, Operand, parse_condition, parse_projection,
    parse_update, resolve_name,
};
use crate::schema::{KeyAttribute, KeySchema, TableDefinition};
use crate::storage::{
    PrimaryKey, SortableAttributeValue, StorageError, TableStorage, extract_primary_key,
    parse_key,
};

/// Maximum number of keys in one `BatchGetItem` call.
pub const MAX_BATCH_GET_KEYS: usize = 100;
/// Maximum number of requests in one `BatchWriteItem` call.
pub const MAX_BATCH_WRITE_REQUESTS: usize = 25;
/// Maximum number of actions in one `TransactWriteItems` call.
pub const MAX_TRANSACT_ITEMS: usize = 100;

type ClaimKey = (String, PrimaryKey);

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Table {
    definition: TableDefinition,
    storage: TableStorage,
}

/// One page request, shared by `Query` and `Scan`.
struct PageRequest<'a> {
    index_name: Option<&'a str>,
    key_condition: Option<&'a str>,
    filter: Option<&'a str>,
    projection: Option<&'a str>,
    names: &'a ExpressionAttributeNames,
    values: &'a ExpressionAttributeValues,
    forward: bool,
    limit: Option<i32>,
    exclusive_start_key: &'a Key,
}

struct PageResult {
    items: Vec<Item>,
    count: i32,
    scanned_count: i32,
    last_evaluated_key: Key,
}

impl Table {
    fn new(definition: TableDefinition) -> Self {
        let storage = TableStorage::new(definition.key_schema.clone());
        Self {
            definition,
            storage,
        }
    }

    fn schema_for(&self, index_name: Option<&str>) -> Result<&KeySchema, DynamoDBError> {
        match index_name {
            None => Ok(&self.definition.key_schema),
            Some(name) => self
                .definition
                .index(name)
                .map(|index| &index.key_schema)
                .ok_or_else(|| {
                    DynamoDBError::validation("The table does not have the specified index")
                }),
        }
    }

    /// Sort position of an item: index key first, then the table key so that
    /// items sharing an index key still have a total order.
    fn position(
        &self,
        schema: &KeySchema,
        item: &Item,
    ) -> Result<Vec<SortableAttributeValue>, StorageError> {
        key_attributes(schema)
            .chain(key_attributes(&self.definition.key_schema))
            .map(|def| {
                let value = item
                    .get(&def.name)
                    .ok_or_else(|| StorageError::MissingKeyAttribute {
                        attr: def.name.clone(),
                    })?;
                SortableAttributeValue::from_attribute_value(&def.name, value)
            })
            .collect()
    }

    fn last_evaluated_key(&self, schema: &KeySchema, item: &Item) -> Key {
        key_attributes(schema)
            .chain(key_attributes(&self.definition.key_schema))
            .filter_map(|def| {
                item.get(&def.name)
                    .map(|value| (def.name.clone(), value.clone()))
            })
            .collect()
    }

    fn read_page(&self, request: &PageRequest<'_>) -> Result<PageResult, DynamoDBError> {
        let schema = self.schema_for(request.index_name)?;

        let key_condition = request
            .key_condition
            .map(parse_condition)
            .transpose()
            .map_err(expression_error_to_dynamodb)?;
        if let Some(condition) = &key_condition {
            validate_key_condition(condition, schema, request.names)?;
        }
        let filter = request
            .filter
            .map(parse_condition)
            .transpose()
            .map_err(expression_error_to_dynamodb)?;
        let projection = request
            .projection
            .map(parse_projection)
            .transpose()
            .map_err(expression_error_to_dynamodb)?;
        let limit = match request.limit {
            None => usize::MAX,
            Some(limit) => usize::try_from(limit)
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or_else(|| {
                    DynamoDBError::validation("Limit must be greater than or equal to 1")
                })?,
        };

        let mut candidates = Vec::new();
        for item in self.storage.items() {
            if !has_keys(schema, &item) {
                continue;
            }
            if let Some(condition) = &key_condition {
                let ctx = EvalContext {
                    item: &item,
                    names: request.names,
                    values: request.values,
                };
                if !ctx.evaluate(condition).map_err(expression_error_to_dynamodb)? {
                    continue;
                }
            }
            let position = self
                .position(schema, &item)
                .map_err(storage_error_to_dynamodb)?;
            candidates.push((position, item));
        }
        candidates.sort_by(|a, b| a.0.cmp(&b.0));
        if !request.forward {
            candidates.reverse();
        }

        if !request.exclusive_start_key.is_empty() {
            let start = self
                .position(schema, request.exclusive_start_key)
                .map_err(|_| DynamoDBError::validation("The provided starting key is invalid"))?;
            candidates.retain(|(position, _)| {
                if request.forward {
                    *position > start
                } else {
                    *position < start
                }
            });
        }

        let has_more = candidates.len() > limit;
        candidates.truncate(limit);
        let scanned_count = candidates.len();
        let last_evaluated_key = match candidates.last() {
            Some((_, item)) if has_more => self.last_evaluated_key(schema, item),
            _ => Key::new(),
        };

        let mut items = Vec::with_capacity(scanned_count);
        for (_, item) in candidates {
            let ctx = EvalContext {
                item: &item,
                names: request.names,
                values: request.values,
            };
            if let Some(filter) = &filter {
                if !ctx.evaluate(filter).map_err(expression_error_to_dynamodb)? {
                    continue;
                }
            }
            let item = match &projection {
                Some(names) => ctx
                    .apply_projection(names)
                    .map_err(expression_error_to_dynamodb)?,
                None => item,
            };
            items.push(item);
        }

        Ok(PageResult {
            count: clamp_count(items.len()),
            scanned_count: clamp_count(scanned_count),
            items,
            last_evaluated_key,
        })
    }

    /// Compute the item an update expression produces without storing it.
    fn updated_item(
        &self,
        key: &Key,
        update_expression: &str,
        names: &ExpressionAttributeNames,
        values: &ExpressionAttributeValues,
    ) -> Result<(PrimaryKey, Item), DynamoDBError> {
        let primary_key =
            parse_key(&self.definition.key_schema, key).map_err(storage_error_to_dynamodb)?;
        let update = parse_update(update_expression).map_err(expression_error_to_dynamodb)?;
        for target in update.targets() {
            let name = resolve_name(target, names).map_err(expression_error_to_dynamodb)?;
            if self.definition.key_schema.is_key_attribute(&name) {
                return Err(DynamoDBError::validation(format!(
                    "Cannot update attribute {name}. This attribute is part of the key"
                )));
            }
        }

        let current = self
            .storage
            .get_item(&primary_key)
            .unwrap_or_else(|| key.clone());
        let ctx = EvalContext {
            item: &current,
            names,
            values,
        };
        let item = ctx
            .apply_update(&update)
            .map_err(expression_error_to_dynamodb)?;
        Ok((primary_key, item))
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory DynamoDB-compatible store.
///
/// ```
/// use ddbkit_memory::{KeyAttribute, MemoryStore, TableDefinition};
///
/// let store = MemoryStore::new()
///     .with_table(TableDefinition::new("Task", KeyAttribute::string("ID")));
/// assert!(store.has_table("Task"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, Arc<Table>>,
    in_flight: Mutex<HashSet<ClaimKey>>,
    writes: Mutex<()>,
    transaction_latency: Duration,
}

impl MemoryStore {
    /// A store without tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing any table with the same name.
    #[must_use]
    pub fn with_table(self, definition: TableDefinition) -> Self {
        self.create_table(definition);
        self
    }

    /// Delay between claiming a transaction's items and applying its writes.
    ///
    /// Widens the window in which overlapping transactions conflict.
    #[must_use]
    pub fn with_transaction_latency(mut self, latency: Duration) -> Self {
        self.transaction_latency = latency;
        self
    }

    /// Add a table, replacing any table with the same name.
    pub fn create_table(&self, definition: TableDefinition) {
        debug!(table = %definition.name, "creating table");
        self.tables
            .insert(definition.name.clone(), Arc::new(Table::new(definition)));
    }

    /// Returns `true` if the table exists.
    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Number of items stored in a table, `None` if it does not exist.
    #[must_use]
    pub fn item_count(&self, name: &str) -> Option<u64> {
        self.tables.get(name).map(|table| table.storage.item_count())
    }

    fn require_table(&self, name: &str) -> Result<Arc<Table>, DynamoDBError> {
        self.tables
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                DynamoDBError::resource_not_found(format!(
                    "Requested resource not found: Table: {name} not found"
                ))
            })
    }

    fn ensure_unclaimed(&self, table: &str, key: &PrimaryKey) -> Result<(), DynamoDBError> {
        if self
            .in_flight
            .lock()
            .contains(&(table.to_owned(), key.clone()))
        {
            return Err(DynamoDBError::with_message(
                DynamoDBErrorCode::TransactionConflictException,
                "Transaction is ongoing for the item",
            ));
        }
        Ok(())
    }

    /// Claim every target of a transaction, or cancel it if another
    /// transaction holds any of them.
    fn claim(&self, targets: Vec<ClaimKey>) -> Result<Claim<'_>, DynamoDBError> {
        let mut in_flight = self.in_flight.lock();
        let reasons: Vec<&str> = targets
            .iter()
            .map(|target| {
                if in_flight.contains(target) {
                    "TransactionConflict"
                } else {
                    "None"
                }
            })
            .collect();
        if reasons.iter().any(|reason| *reason != "None") {
            return Err(DynamoDBError::transaction_canceled(&reasons));
        }
        in_flight.extend(targets.iter().cloned());
        Ok(Claim {
            in_flight: &self.in_flight,
            keys: targets,
        })
    }

    fn apply_transaction(
        &self,
        prepared: &[(Arc<Table>, &Update)],
    ) -> Result<(), DynamoDBError> {
        let _writes = self.writes.lock();

        let mut new_items = Vec::with_capacity(prepared.len());
        for (index, (table, update)) in prepared.iter().enumerate() {
            match table.updated_item(
                &update.key,
                &update.update_expression,
                &update.expression_attribute_names,
                &update.expression_attribute_values,
            ) {
                Ok((_, item)) => new_items.push(item),
                Err(e) => {
                    debug!(error = %e, index, "transaction item failed validation");
                    let reasons: Vec<&str> = (0..prepared.len())
                        .map(|i| if i == index { "ValidationError" } else { "None" })
                        .collect();
                    return Err(DynamoDBError::transaction_canceled(&reasons));
                }
            }
        }

        for ((table, _), item) in prepared.iter().zip(new_items) {
            table
                .storage
                .put_item(item)
                .map_err(storage_error_to_dynamodb)?;
        }
        Ok(())
    }
}

/// Releases a transaction's claimed items when dropped.
struct Claim<'a> {
    in_flight: &'a Mutex<HashSet<ClaimKey>>,
    keys: Vec<ClaimKey>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        for key in &self.keys {
            in_flight.remove(key);
        }
    }
}

#[async_trait]
impl DynamoStore for MemoryStore {
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let key = extract_primary_key(&table.definition.key_schema, &input.item)
            .map_err(storage_error_to_dynamodb)?;
        self.ensure_unclaimed(&input.table_name, &key)?;

        let _writes = self.writes.lock();
        table
            .storage
            .put_item(input.item)
            .map_err(storage_error_to_dynamodb)?;
        debug!(table = %input.table_name, "put item");
        Ok(PutItemOutput::default())
    }

    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let key = parse_key(&table.definition.key_schema, &input.key)
            .map_err(storage_error_to_dynamodb)?;
        let projection = input
            .projection_expression
            .as_deref()
            .map(parse_projection)
            .transpose()
            .map_err(expression_error_to_dynamodb)?;

        let item = match (table.storage.get_item(&key), projection) {
            (Some(item), Some(names)) => {
                let values = HashMap::new();
                let ctx = EvalContext {
                    item: &item,
                    names: &input.expression_attribute_names,
                    values: &values,
                };
                Some(
                    ctx.apply_projection(&names)
                        .map_err(expression_error_to_dynamodb)?,
                )
            }
            (item, _) => item,
        };
        Ok(GetItemOutput { item })
    }

    async fn update_item(
        &self,
        input: UpdateItemInput,
    ) -> Result<UpdateItemOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;

        let _writes = self.writes.lock();
        let (key, item) = table.updated_item(
            &input.key,
            &input.update_expression,
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;
        self.ensure_unclaimed(&input.table_name, &key)?;
        table
            .storage
            .put_item(item)
            .map_err(storage_error_to_dynamodb)?;
        debug!(table = %input.table_name, expression = %input.update_expression, "updated item");
        Ok(UpdateItemOutput::default())
    }

    async fn delete_item(
        &self,
        input: DeleteItemInput,
    ) -> Result<DeleteItemOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let key = parse_key(&table.definition.key_schema, &input.key)
            .map_err(storage_error_to_dynamodb)?;
        self.ensure_unclaimed(&input.table_name, &key)?;

        let _writes = self.writes.lock();
        let existed = table.storage.delete_item(&key).is_some();
        debug!(table = %input.table_name, existed, "deleted item");
        Ok(DeleteItemOutput::default())
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let Some(key_condition) = input.key_condition_expression.as_deref() else {
            return Err(DynamoDBError::validation(
                "Either the KeyConditions or KeyConditionExpression parameter must be specified",
            ));
        };
        let page = table.read_page(&PageRequest {
            index_name: input.index_name.as_deref(),
            key_condition: Some(key_condition),
            filter: input.filter_expression.as_deref(),
            projection: input.projection_expression.as_deref(),
            names: &input.expression_attribute_names,
            values: &input.expression_attribute_values,
            forward: input.scan_index_forward.unwrap_or(true),
            limit: input.limit,
            exclusive_start_key: &input.exclusive_start_key,
        })?;
        debug!(
            table = %input.table_name,
            count = page.count,
            scanned = page.scanned_count,
            "query"
        );
        Ok(QueryOutput {
            items: page.items,
            count: page.count,
            scanned_count: page.scanned_count,
            last_evaluated_key: page.last_evaluated_key,
        })
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        let table = self.require_table(&input.table_name)?;
        let page = table.read_page(&PageRequest {
            index_name: input.index_name.as_deref(),
            key_condition: None,
            filter: input.filter_expression.as_deref(),
            projection: input.projection_expression.as_deref(),
            names: &input.expression_attribute_names,
            values: &input.expression_attribute_values,
            forward: true,
            limit: input.limit,
            exclusive_start_key: &input.exclusive_start_key,
        })?;
        debug!(
            table = %input.table_name,
            count = page.count,
            scanned = page.scanned_count,
            "scan"
        );
        Ok(ScanOutput {
            items: page.items,
            count: page.count,
            scanned_count: page.scanned_count,
            last_evaluated_key: page.last_evaluated_key,
        })
    }

    async fn batch_get_item(
        &self,
        input: BatchGetItemInput,
    ) -> Result<BatchGetItemOutput, DynamoDBError> {
        let total_keys: usize = input.request_items.values().map(|ka| ka.keys.len()).sum();
        if total_keys == 0 {
            return Err(DynamoDBError::validation(
                "The requestItems parameter must contain at least one key",
            ));
        }
        if total_keys > MAX_BATCH_GET_KEYS {
            return Err(DynamoDBError::validation(
                "Too many items requested for the BatchGetItem call",
            ));
        }

        let mut responses = HashMap::with_capacity(input.request_items.len());
        for (table_name, keys_and_attrs) in &input.request_items {
            let table = self.require_table(table_name)?;
            let projection = keys_and_attrs
                .projection_expression
                .as_deref()
                .map(parse_projection)
                .transpose()
                .map_err(expression_error_to_dynamodb)?;

            let mut seen = HashSet::with_capacity(keys_and_attrs.keys.len());
            let mut items = Vec::new();
            for key in &keys_and_attrs.keys {
                let key = parse_key(&table.definition.key_schema, key)
                    .map_err(storage_error_to_dynamodb)?;
                if !seen.insert(key.clone()) {
                    return Err(duplicate_keys());
                }
                let Some(item) = table.storage.get_item(&key) else {
                    continue;
                };
                let item = match &projection {
                    Some(names) => {
                        let values = HashMap::new();
                        let ctx = EvalContext {
                            item: &item,
                            names: &keys_and_attrs.expression_attribute_names,
                            values: &values,
                        };
                        ctx.apply_projection(names)
                            .map_err(expression_error_to_dynamodb)?
                    }
                    None => item,
                };
                items.push(item);
            }
            responses.insert(table_name.clone(), items);
        }

        Ok(BatchGetItemOutput {
            responses,
            unprocessed_keys: HashMap::new(),
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, DynamoDBError> {
        let total_writes: usize = input.request_items.values().map(Vec::len).sum();
        if total_writes == 0 {
            return Err(DynamoDBError::validation(
                "The requestItems parameter must contain at least one write request",
            ));
        }
        if total_writes > MAX_BATCH_WRITE_REQUESTS {
            return Err(DynamoDBError::validation(format!(
                "Too many items in the BatchWriteItem request; \
                 the request length {total_writes} exceeds the limit of {MAX_BATCH_WRITE_REQUESTS}"
            )));
        }

        // Validate everything before writing anything.
        let mut writes = Vec::with_capacity(total_writes);
        for (table_name, requests) in &input.request_items {
            let table = self.require_table(table_name)?;
            let schema = &table.definition.key_schema;
            let mut seen = HashSet::with_capacity(requests.len());
            for request in requests {
                let key = match (&request.put_request, &request.delete_request) {
                    (Some(put), None) => extract_primary_key(schema, &put.item),
                    (None, Some(delete)) => parse_key(schema, &delete.key),
                    _ => {
                        return Err(DynamoDBError::validation(
                            "A write request must contain exactly one of PutRequest or DeleteRequest",
                        ));
                    }
                }
                .map_err(storage_error_to_dynamodb)?;
                self.ensure_unclaimed(table_name, &key)?;
                if !seen.insert(key.clone()) {
                    return Err(duplicate_keys());
                }
                writes.push((Arc::clone(&table), key, request));
            }
        }

        let _writes = self.writes.lock();
        for (table, key, request) in writes {
            if let Some(put) = &request.put_request {
                table
                    .storage
                    .put_item(put.item.clone())
                    .map_err(storage_error_to_dynamodb)?;
            } else {
                table.storage.delete_item(&key);
            }
        }
        debug!(requests = total_writes, "batch write");

        Ok(BatchWriteItemOutput {
            unprocessed_items: HashMap::new(),
        })
    }

    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, DynamoDBError> {
        let count = input.transact_items.len();
        if count == 0 || count > MAX_TRANSACT_ITEMS {
            return Err(DynamoDBError::validation(format!(
                "Member must have length between 1 and {MAX_TRANSACT_ITEMS}, got {count}"
            )));
        }

        let mut prepared = Vec::with_capacity(count);
        let mut targets = Vec::with_capacity(count);
        for item in &input.transact_items {
            let update = item.update.as_ref().ok_or_else(|| {
                DynamoDBError::validation("Transaction items may only contain Update actions")
            })?;
            let table = self.require_table(&update.table_name)?;
            let key = parse_key(&table.definition.key_schema, &update.key)
                .map_err(storage_error_to_dynamodb)?;
            let target = (update.table_name.clone(), key);
            if targets.contains(&target) {
                return Err(DynamoDBError::validation(
                    "Transaction request cannot include multiple operations on one item",
                ));
            }
            targets.push(target);
            prepared.push((table, update));
        }

        let claim = self.claim(targets)?;
        if !self.transaction_latency.is_zero() {
            tokio::time::sleep(self.transaction_latency).await;
        }
        let result = self.apply_transaction(&prepared);
        drop(claim);

        result?;
        debug!(items = count, "transaction committed");
        Ok(TransactWriteItemsOutput::default())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn key_attributes(schema: &KeySchema) -> impl Iterator<Item = &KeyAttribute> {
    std::iter::once(&schema.partition_key).chain(schema.sort_key.as_ref())
}

/// Returns `true` if `item` carries every key attribute of `schema` with the
/// declared type. Items without an index's keys are absent from that index.
fn has_keys(schema: &KeySchema, item: &Item) -> bool {
    key_attributes(schema).all(|def| {
        item.get(&def.name)
            .is_some_and(|value| def.attr_type.matches(value))
    })
}

fn duplicate_keys() -> DynamoDBError {
    DynamoDBError::validation("Provided list of item keys contains duplicates")
}

fn clamp_count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// A key condition is an equality on the partition key, optionally `AND` one
/// sort key condition.
fn validate_key_condition(
    condition: &Expr,
    schema: &KeySchema,
    names: &ExpressionAttributeNames,
) -> Result<(), DynamoDBError> {
    let conjuncts = condition.conjuncts();
    if conjuncts.len() > 2 {
        return Err(DynamoDBError::validation(
            "Conditions can be of length 1 or 2 only",
        ));
    }

    let (mut has_partition, mut has_sort) = (false, false);
    for part in conjuncts {
        let (name, is_equality) = key_condition_attribute(part, names)?;
        if name == schema.partition_key.name && !has_partition {
            if !is_equality {
                return Err(DynamoDBError::validation(
                    "Query key condition not supported",
                ));
            }
            has_partition = true;
        } else if schema.sort_key.as_ref().is_some_and(|sk| sk.name == name) && !has_sort {
            has_sort = true;
        } else {
            return Err(DynamoDBError::validation(format!(
                "Query key condition not supported on attribute {name}"
            )));
        }
    }

    if !has_partition {
        return Err(DynamoDBError::validation(format!(
            "Query condition missed key schema element: {}",
            schema.partition_key.name
        )));
    }
    Ok(())
}

/// The attribute a single key condition constrains, and whether it is an
/// equality.
fn key_condition_attribute(
    part: &Expr,
    names: &ExpressionAttributeNames,
) -> Result<(String, bool), DynamoDBError> {
    let unsupported = || DynamoDBError::validation("Query key condition not supported");
    let (name, is_equality) = match part {
        Expr::Compare {
            left: Operand::Name(name),
            op,
            right: Operand::Value(_),
        } if *op != CompareOp::Ne => (name, *op == CompareOp::Eq),
        Expr::Between {
            value: Operand::Name(name),
            low: Operand::Value(_),
            high: Operand::Value(_),
        } => (name, false),
        Expr::Function {
            name: FunctionName::BeginsWith,
            args,
        } => match args.as_slice() {
            [Operand::Name(name), Operand::Value(_)] => (name, false),
            _ => return Err(unsupported()),
        },
        _ => return Err(unsupported()),
    };
    let name = resolve_name(name, names).map_err(expression_error_to_dynamodb)?;
    Ok((name, is_equality))
}
