//! Conversions between ddbkit model values and SDK values.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types as sdk;
use bytes::Bytes;
use ddbkit_model::{AttributeValue, Item};
use tracing::warn;

/// Convert a model value into an SDK value.
#[must_use]
pub fn to_sdk(value: AttributeValue) -> sdk::AttributeValue {
    match value {
        AttributeValue::S(s) => sdk::AttributeValue::S(s),
        AttributeValue::N(n) => sdk::AttributeValue::N(n),
        AttributeValue::B(b) => sdk::AttributeValue::B(Blob::new(b.to_vec())),
        AttributeValue::Ss(ss) => sdk::AttributeValue::Ss(ss),
        AttributeValue::Ns(ns) => sdk::AttributeValue::Ns(ns),
        AttributeValue::Bs(bs) => {
            sdk::AttributeValue::Bs(bs.into_iter().map(|b| Blob::new(b.to_vec())).collect())
        }
        AttributeValue::Bool(b) => sdk::AttributeValue::Bool(b),
        AttributeValue::Null(n) => sdk::AttributeValue::Null(n),
        AttributeValue::L(list) => sdk::AttributeValue::L(list.into_iter().map(to_sdk).collect()),
        AttributeValue::M(map) => sdk::AttributeValue::M(item_to_sdk(map)),
    }
}

/// Convert an SDK value into a model value.
///
/// Variants added to the SDK after this crate was written become `NULL`.
#[must_use]
pub fn from_sdk(value: sdk::AttributeValue) -> AttributeValue {
    match value {
        sdk::AttributeValue::S(s) => AttributeValue::S(s),
        sdk::AttributeValue::N(n) => AttributeValue::N(n),
        sdk::AttributeValue::B(b) => AttributeValue::B(Bytes::from(b.into_inner())),
        sdk::AttributeValue::Ss(ss) => AttributeValue::Ss(ss),
        sdk::AttributeValue::Ns(ns) => AttributeValue::Ns(ns),
        sdk::AttributeValue::Bs(bs) => {
            AttributeValue::Bs(bs.into_iter().map(|b| Bytes::from(b.into_inner())).collect())
        }
        sdk::AttributeValue::Bool(b) => AttributeValue::Bool(b),
        sdk::AttributeValue::Null(n) => AttributeValue::Null(n),
        sdk::AttributeValue::L(list) => AttributeValue::L(list.into_iter().map(from_sdk).collect()),
        sdk::AttributeValue::M(map) => AttributeValue::M(item_from_sdk(map)),
        other => {
            warn!(value = ?other, "unsupported attribute value from store, reading as NULL");
            AttributeValue::Null(true)
        }
    }
}

/// Convert a model item (or key) into an SDK item.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn item_to_sdk(item: Item) -> HashMap<String, sdk::AttributeValue> {
    item.into_iter().map(|(k, v)| (k, to_sdk(v))).collect()
}

/// Convert an SDK item (or key) into a model item.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn item_from_sdk(item: HashMap<String, sdk::AttributeValue>) -> Item {
    item.into_iter().map(|(k, v)| (k, from_sdk(v))).collect()
}

/// `None` for an empty map, the SDK's way of omitting a parameter.
pub(crate) fn non_empty<K, V>(map: HashMap<K, V>) -> Option<HashMap<K, V>> {
    (!map.is_empty()).then_some(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_convert_nested_item_both_ways() {
        let item = Item::from([
            ("ID".to_owned(), AttributeValue::from("w1")),
            ("Count".to_owned(), AttributeValue::from(3)),
            ("Blob".to_owned(), AttributeValue::B(Bytes::from_static(b"\x00\x01"))),
            (
                "Nested".to_owned(),
                AttributeValue::M(HashMap::from([(
                    "Tags".to_owned(),
                    AttributeValue::L(vec![AttributeValue::Bool(true), AttributeValue::Null(true)]),
                )])),
            ),
        ]);

        let sdk_item = item_to_sdk(item.clone());
        assert_eq!(sdk_item.get("Count"), Some(&sdk::AttributeValue::N("3".to_owned())));
        assert_eq!(item_from_sdk(sdk_item), item);
    }

    #[test]
    fn test_should_convert_binary_sets() {
        let value = AttributeValue::Bs(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        let sdk_value = to_sdk(value.clone());
        assert!(matches!(&sdk_value, sdk::AttributeValue::Bs(bs) if bs.len() == 2));
        assert_eq!(from_sdk(sdk_value), value);
    }

    #[test]
    fn test_should_omit_empty_maps() {
        assert!(non_empty(HashMap::<String, String>::new()).is_none());
        assert!(non_empty(HashMap::from([("#n0", "ID")])).is_some());
    }
}
