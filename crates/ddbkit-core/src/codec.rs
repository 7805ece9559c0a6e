//! Record <-> item conversion.
//!
//! Records are any serde types. The field mapping is delegated to
//! `serde_dynamo`; this module only bridges its attribute value type to the
//! one the store speaks. Field renames and empty-value omission are expressed
//! with the usual serde attributes on the record.

use std::collections::HashMap;

use ddbkit_model::{AttributeValue, Item};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors raised while converting between records and items.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The record could not be turned into an item.
    #[error("failed to marshal record: {0}")]
    Encode(#[source] serde_dynamo::Error),
    /// The item could not be turned into the requested record type.
    #[error("failed to unmarshal item: {0}")]
    Decode(#[source] serde_dynamo::Error),
}

/// Marshal a record into a store item.
pub fn to_item<T: Serialize + ?Sized>(record: &T) -> Result<Item, CodecError> {
    let item: serde_dynamo::Item = serde_dynamo::to_item(record).map_err(CodecError::Encode)?;
    Ok(HashMap::<String, serde_dynamo::AttributeValue>::from(item)
        .into_iter()
        .map(|(name, value)| (name, from_dynamo(value)))
        .collect())
}

/// Unmarshal a store item into a record.
pub fn from_item<T: DeserializeOwned>(item: Item) -> Result<T, CodecError> {
    let item: HashMap<String, serde_dynamo::AttributeValue> = item
        .into_iter()
        .map(|(name, value)| (name, into_dynamo(value)))
        .collect();
    serde_dynamo::from_item(serde_dynamo::Item::from(item)).map_err(CodecError::Decode)
}

/// Unmarshal a list of items, failing on the first bad one.
pub fn from_items<T: DeserializeOwned>(items: Vec<Item>) -> Result<Vec<T>, CodecError> {
    items.into_iter().map(from_item).collect()
}

/// Marshal a single value into an attribute value.
pub fn to_attribute_value<T: Serialize + ?Sized>(value: &T) -> Result<AttributeValue, CodecError> {
    let value: serde_dynamo::AttributeValue =
        serde_dynamo::to_attribute_value(value).map_err(CodecError::Encode)?;
    Ok(from_dynamo(value))
}

/// Unmarshal a single attribute value.
pub fn from_attribute_value<T: DeserializeOwned>(value: AttributeValue) -> Result<T, CodecError> {
    serde_dynamo::from_attribute_value(into_dynamo(value)).map_err(CodecError::Decode)
}

fn from_dynamo(value: serde_dynamo::AttributeValue) -> AttributeValue {
    use serde_dynamo::AttributeValue as D;

    match value {
        D::S(s) => AttributeValue::S(s),
        D::N(n) => AttributeValue::N(n),
        D::B(b) => AttributeValue::B(bytes::Bytes::from(b)),
        D::Bool(b) => AttributeValue::Bool(b),
        D::Null(b) => AttributeValue::Null(b),
        D::Ss(v) => AttributeValue::Ss(v),
        D::Ns(v) => AttributeValue::Ns(v),
        D::Bs(v) => AttributeValue::Bs(v.into_iter().map(bytes::Bytes::from).collect()),
        D::L(v) => AttributeValue::L(v.into_iter().map(from_dynamo).collect()),
        D::M(m) => AttributeValue::M(m.into_iter().map(|(k, v)| (k, from_dynamo(v))).collect()),
    }
}

fn into_dynamo(value: AttributeValue) -> serde_dynamo::AttributeValue {
    use serde_dynamo::AttributeValue as D;

    match value {
        AttributeValue::S(s) => D::S(s),
        AttributeValue::N(n) => D::N(n),
        AttributeValue::B(b) => D::B(b.to_vec()),
        AttributeValue::Bool(b) => D::Bool(b),
        AttributeValue::Null(b) => D::Null(b),
        AttributeValue::Ss(v) => D::Ss(v),
        AttributeValue::Ns(v) => D::Ns(v),
        AttributeValue::Bs(v) => D::Bs(v.into_iter().map(|b| b.to_vec()).collect()),
        AttributeValue::L(v) => D::L(v.into_iter().map(into_dynamo).collect()),
        AttributeValue::M(m) => D::M(m.into_iter().map(|(k, v)| (k, into_dynamo(v))).collect()),
    }
}
