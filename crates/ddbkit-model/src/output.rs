//! Response types for the store operations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Item, Key, KeysAndAttributes, WriteRequest};

/// Output for `PutItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemOutput {}

/// Output for `GetItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    /// The item, absent when no item has the requested key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

/// Output for `UpdateItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateItemOutput {}

/// Output for `DeleteItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemOutput {}

/// Output for `Query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryOutput {
    /// Matching items, after filtering and projection.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Number of items returned.
    pub count: i32,
    /// Number of items evaluated before the filter.
    pub scanned_count: i32,
    /// Where the query stopped; empty when there is nothing left to read.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub last_evaluated_key: Key,
}

/// Output for `Scan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanOutput {
    /// Matching items, after filtering and projection.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Number of items returned.
    pub count: i32,
    /// Number of items evaluated before the filter.
    pub scanned_count: i32,
    /// Where the scan stopped; empty when there is nothing left to read.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub last_evaluated_key: Key,
}

/// Output for `BatchGetItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchGetItemOutput {
    /// Table name to the items found in it.
    #[serde(default)]
    pub responses: HashMap<String, Vec<Item>>,
    /// Keys the store did not get to.
    #[serde(default)]
    pub unprocessed_keys: HashMap<String, KeysAndAttributes>,
}

/// Output for `BatchWriteItem`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemOutput {
    /// Writes the store did not get to.
    #[serde(default)]
    pub unprocessed_items: HashMap<String, Vec<WriteRequest>>,
}

/// Output for `TransactWriteItems`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItemsOutput {}
