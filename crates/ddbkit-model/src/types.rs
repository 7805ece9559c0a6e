//! Shared DynamoDB types used inside requests and responses.
//!
//! Structs use `#[serde(rename_all = "PascalCase")]` to match the DynamoDB
//! JSON wire format.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A DynamoDB item: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

/// A primary key: key attribute name to value.
pub type Key = HashMap<String, AttributeValue>;

/// Expression attribute names (`#alias` to attribute name).
pub type ExpressionAttributeNames = HashMap<String, String>;

/// Expression attribute values (`:alias` to value).
pub type ExpressionAttributeValues = HashMap<String, AttributeValue>;

// ---------------------------------------------------------------------------
// Key schema
// ---------------------------------------------------------------------------

/// Scalar types allowed for key attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarAttributeType {
    /// String.
    S,
    /// Number.
    N,
    /// Binary.
    B,
}

impl ScalarAttributeType {
    /// Wire-format type descriptor.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
        }
    }

    /// Returns `true` if `value` is of this scalar type.
    #[must_use]
    pub fn matches(&self, value: &AttributeValue) -> bool {
        matches!(
            (self, value),
            (Self::S, AttributeValue::S(_))
                | (Self::N, AttributeValue::N(_))
                | (Self::B, AttributeValue::B(_))
        )
    }
}

impl fmt::Display for ScalarAttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Batch operations
// ---------------------------------------------------------------------------

/// Keys to read from one table in a `BatchGetItem` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeysAndAttributes {
    /// The primary keys of the items to retrieve.
    pub keys: Vec<Key>,
    /// Attributes to return; all attributes when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
    /// Name aliases used by `projection_expression`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Whether to use a strongly consistent read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

/// A single put or delete inside a `BatchWriteItem` call.
///
/// Exactly one of the two requests is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WriteRequest {
    /// Put an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put_request: Option<PutRequest>,
    /// Delete an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_request: Option<DeleteRequest>,
}

impl WriteRequest {
    /// A put of `item`.
    #[must_use]
    pub fn put(item: Item) -> Self {
        Self {
            put_request: Some(PutRequest { item }),
            delete_request: None,
        }
    }

    /// A delete of `key`.
    #[must_use]
    pub fn delete(key: Key) -> Self {
        Self {
            put_request: None,
            delete_request: Some(DeleteRequest { key }),
        }
    }
}

/// The put half of a [`WriteRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRequest {
    /// The item to write.
    pub item: Item,
}

/// The delete half of a [`WriteRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRequest {
    /// The key of the item to delete.
    pub key: Key,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// An update prepared for a transaction but not yet executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Update {
    /// Target table.
    pub table_name: String,
    /// Key of the item to update.
    pub key: Key,
    /// The update expression, e.g. `SET #n0 = :v0`.
    pub update_expression: String,
    /// Name aliases used by the expression.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: ExpressionAttributeNames,
    /// Value aliases used by the expression.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,
}

/// One action inside a `TransactWriteItems` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactWriteItem {
    /// Update an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Update>,
}

impl From<Update> for TransactWriteItem {
    fn from(update: Update) -> Self {
        Self {
            update: Some(update),
        }
    }
}
