//! Request types for the store operations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    ExpressionAttributeNames, ExpressionAttributeValues, Item, Key, KeysAndAttributes,
    TransactWriteItem, WriteRequest,
};

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Input for `PutItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// Target table.
    pub table_name: String,
    /// The full item, key attributes included.
    pub item: Item,
}

/// Input for `GetItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    /// Target table.
    pub table_name: String,
    /// Primary key of the item.
    pub key: Key,
    /// Strongly consistent read when `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Name aliases used by the projection.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
}

/// Input for `UpdateItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemInput {
    /// Target table.
    pub table_name: String,
    /// Primary key of the item; the item is created if absent.
    pub key: Key,
    /// The update expression.
    pub update_expression: String,
    /// Name aliases used by the expression.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Value aliases used by the expression.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
}

/// Input for `DeleteItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemInput {
    /// Target table.
    pub table_name: String,
    /// Primary key of the item.
    pub key: Key,
}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Input for `Query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// Target table.
    pub table_name: String,
    /// Secondary index to query instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Key condition; must constrain the partition key by equality.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,
    /// Filter applied after the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Name aliases used by the expressions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Value aliases used by the expressions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
    /// Ascending sort key order when `true` (the default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,
    /// Maximum number of items to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
    /// Resume after this key.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub exclusive_start_key: Key,
    /// Strongly consistent read when `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

/// Input for `Scan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInput {
    /// Target table.
    pub table_name: String,
    /// Secondary index to scan instead of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Filter applied after the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Name aliases used by the expressions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Value aliases used by the expressions.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
    /// Maximum number of items to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
    /// Resume after this key.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub exclusive_start_key: Key,
    /// Strongly consistent read when `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

// ---------------------------------------------------------------------------
// Batch & transactions
// ---------------------------------------------------------------------------

/// Input for `BatchGetItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetItemInput {
    /// Table name to the keys read from it.
    pub request_items: HashMap<String, KeysAndAttributes>,
}

/// Input for `BatchWriteItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemInput {
    /// Table name to the writes applied to it.
    pub request_items: HashMap<String, Vec<WriteRequest>>,
}

/// Input for `TransactWriteItems`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItemsInput {
    /// The actions, applied all-or-nothing.
    pub transact_items: Vec<TransactWriteItem>,
    /// Idempotency token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_request_token: Option<String>,
}
