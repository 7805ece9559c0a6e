//! Partitioned item storage for one table.
//!
//! ```text
//! DashMap<PartitionKey, BTreeMap<SortableAttributeValue, Item>>
//! ```
//!
//! - Different partitions can be read and written concurrently.
//! - Within a partition, items are ordered by [`SortableAttributeValue`],
//!   which follows DynamoDB comparison rules.
//! - Tables without a sort key use a sentinel as the single `BTreeMap` key
//!   per partition.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use dashmap::DashMap;
use ddbkit_model::types::ScalarAttributeType;
use ddbkit_model::{AttributeValue, Item};
use thiserror::Error;
use tracing::debug;

use crate::schema::{KeyAttribute, KeySchema};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while extracting or validating keys.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required key attribute was not found.
    #[error("missing required key attribute: {attr}")]
    MissingKeyAttribute {
        /// The name of the missing attribute.
        attr: String,
    },
    /// A key attribute has the wrong type.
    #[error("key attribute '{attr}' has wrong type: expected {expected}, got {actual}")]
    InvalidKeyType {
        /// The name of the attribute.
        attr: String,
        /// The expected type descriptor.
        expected: String,
        /// The actual type descriptor.
        actual: String,
    },
    /// A key carries attributes outside the key schema.
    #[error("the provided key element does not match the schema")]
    KeySchemaMismatch,
}

// ---------------------------------------------------------------------------
// SortableAttributeValue
// ---------------------------------------------------------------------------

/// Key-eligible attribute value with DynamoDB ordering.
///
/// - **S**: UTF-8 byte order.
/// - **N**: numeric order (parsed as `f64`).
/// - **B**: unsigned byte order.
/// - **Sentinel**: stands in for the missing sort key.
#[derive(Debug, Clone)]
pub enum SortableAttributeValue {
    /// String key.
    S(String),
    /// Number key, in its original string form.
    N(String),
    /// Binary key.
    B(bytes::Bytes),
    /// Sentinel for tables without a sort key.
    Sentinel,
}

impl SortableAttributeValue {
    /// Converts back into an [`AttributeValue`]; `None` for the sentinel.
    #[must_use]
    pub fn to_attribute_value(&self) -> Option<AttributeValue> {
        match self {
            Self::S(s) => Some(AttributeValue::S(s.clone())),
            Self::N(n) => Some(AttributeValue::N(n.clone())),
            Self::B(b) => Some(AttributeValue::B(b.clone())),
            Self::Sentinel => None,
        }
    }

    /// Wraps a key-eligible value.
    pub fn from_attribute_value(
        attr_name: &str,
        value: &AttributeValue,
    ) -> Result<Self, StorageError> {
        match value {
            AttributeValue::S(s) => Ok(Self::S(s.clone())),
            AttributeValue::N(n) => Ok(Self::N(n.clone())),
            AttributeValue::B(b) => Ok(Self::B(b.clone())),
            other => Err(StorageError::InvalidKeyType {
                attr: attr_name.to_owned(),
                expected: "S, N, or B".to_owned(),
                actual: other.type_descriptor().to_owned(),
            }),
        }
    }
}

/// Unparseable numbers become NaN, which compares equal to everything.
fn parse_number(s: &str) -> f64 {
    s.parse::<f64>().unwrap_or(f64::NAN)
}

impl PartialEq for SortableAttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortableAttributeValue {}

impl PartialOrd for SortableAttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortableAttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::S(a), Self::S(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::N(a), Self::N(b)) => parse_number(a)
                .partial_cmp(&parse_number(b))
                .unwrap_or(Ordering::Equal),
            (Self::B(a), Self::B(b)) => a.as_ref().cmp(b.as_ref()),
            (Self::Sentinel, Self::Sentinel) => Ordering::Equal,
            // Mixed variants never share a map; the order only has to be total.
            (Self::S(_), _) => Ordering::Less,
            (_, Self::S(_)) => Ordering::Greater,
            (Self::N(_), _) => Ordering::Less,
            (_, Self::N(_)) => Ordering::Greater,
            (Self::B(_), _) => Ordering::Less,
            (_, Self::B(_)) => Ordering::Greater,
        }
    }
}

// ---------------------------------------------------------------------------
// PrimaryKey
// ---------------------------------------------------------------------------

/// A table's primary key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    /// The partition key value.
    pub partition_key: AttributeValue,
    /// The sort key value, for tables that have one.
    pub sort_key: Option<AttributeValue>,
}

impl PrimaryKey {
    fn sort_position(&self, schema: &KeySchema) -> Result<SortableAttributeValue, StorageError> {
        match (&self.sort_key, &schema.sort_key) {
            (Some(value), Some(def)) => {
                SortableAttributeValue::from_attribute_value(&def.name, value)
            }
            _ => Ok(SortableAttributeValue::Sentinel),
        }
    }
}

// ---------------------------------------------------------------------------
// TableStorage
// ---------------------------------------------------------------------------

/// Item storage for one table.
#[derive(Debug)]
pub struct TableStorage {
    data: DashMap<AttributeValue, BTreeMap<SortableAttributeValue, Item>>,
    key_schema: KeySchema,
    item_count: AtomicU64,
}

impl TableStorage {
    /// Empty storage for `key_schema`.
    #[must_use]
    pub fn new(key_schema: KeySchema) -> Self {
        Self {
            data: DashMap::new(),
            key_schema,
            item_count: AtomicU64::new(0),
        }
    }

    /// The table's key schema.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    /// Number of stored items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.item_count.load(AtomicOrdering::Relaxed)
    }

    /// Insert or replace an item, returning the replaced one.
    pub fn put_item(&self, item: Item) -> Result<Option<Item>, StorageError> {
        let key = extract_primary_key(&self.key_schema, &item)?;
        let position = key.sort_position(&self.key_schema)?;

        let old = self
            .data
            .entry(key.partition_key)
            .or_default()
            .insert(position, item);
        if old.is_none() {
            self.item_count.fetch_add(1, AtomicOrdering::Relaxed);
            debug!("inserted new item");
        } else {
            debug!("replaced existing item");
        }
        Ok(old)
    }

    /// Read an item by primary key.
    #[must_use]
    pub fn get_item(&self, key: &PrimaryKey) -> Option<Item> {
        let position = key.sort_position(&self.key_schema).ok()?;
        self.data
            .get(&key.partition_key)
            .and_then(|partition| partition.get(&position).cloned())
    }

    /// Delete an item by primary key, returning it if it existed.
    pub fn delete_item(&self, key: &PrimaryKey) -> Option<Item> {
        let position = key.sort_position(&self.key_schema).ok()?;
        let removed = self.data.get_mut(&key.partition_key)?.remove(&position)?;
        self.item_count.fetch_sub(1, AtomicOrdering::Relaxed);
        debug!("deleted item");
        Some(removed)
    }

    /// Items of one partition in sort key order.
    #[must_use]
    pub fn partition(&self, partition_key: &AttributeValue) -> Vec<Item> {
        self.data
            .get(partition_key)
            .map(|partition| partition.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every item, partitions in key order.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        let mut partitions: Vec<(SortableAttributeValue, Vec<Item>)> = self
            .data
            .iter()
            .map(|entry| {
                let pk = SortableAttributeValue::from_attribute_value("", entry.key())
                    .unwrap_or(SortableAttributeValue::Sentinel);
                (pk, entry.value().values().cloned().collect())
            })
            .collect();
        partitions.sort_by(|a, b| a.0.cmp(&b.0));
        partitions.into_iter().flat_map(|(_, items)| items).collect()
    }
}

// ---------------------------------------------------------------------------
// Key extraction
// ---------------------------------------------------------------------------

/// Extract the primary key from an item.
#[allow(clippy::implicit_hasher)]
pub fn extract_primary_key(schema: &KeySchema, item: &Item) -> Result<PrimaryKey, StorageError> {
    let partition_key = key_value(&schema.partition_key, item)?;
    let sort_key = schema
        .sort_key
        .as_ref()
        .map(|def| key_value(def, item))
        .transpose()?;
    Ok(PrimaryKey {
        partition_key,
        sort_key,
    })
}

/// Extract the primary key from a request key, which must name exactly the
/// schema's key attributes.
#[allow(clippy::implicit_hasher)]
pub fn parse_key(schema: &KeySchema, key: &Item) -> Result<PrimaryKey, StorageError> {
    if key.len() != schema.len() {
        return Err(StorageError::KeySchemaMismatch);
    }
    extract_primary_key(schema, key)
}

fn key_value(def: &KeyAttribute, item: &Item) -> Result<AttributeValue, StorageError> {
    let value = item
        .get(&def.name)
        .ok_or_else(|| StorageError::MissingKeyAttribute {
            attr: def.name.clone(),
        })?;
    validate_key_type(&def.name, def.attr_type, value)?;
    Ok(value.clone())
}

fn validate_key_type(
    attr_name: &str,
    expected: ScalarAttributeType,
    value: &AttributeValue,
) -> Result<(), StorageError> {
    if expected.matches(value) {
        Ok(())
    } else {
        Err(StorageError::InvalidKeyType {
            attr: attr_name.to_owned(),
            expected: expected.as_str().to_owned(),
            actual: value.type_descriptor().to_owned(),
        })
    }
}
