//! Conditions built from ordered maps of attribute values.

use std::collections::BTreeMap;

use ddbkit_model::AttributeValue;

use super::condition::{Condition, KeyCondition, key, name};

/// AND of `key = value` for every entry, in attribute-name order.
///
/// Returns `None` for an empty map: a query without a key condition is
/// rejected rather than silently turned into something else.
#[must_use]
pub fn key_condition_from(pairs: &BTreeMap<String, AttributeValue>) -> Option<KeyCondition> {
    pairs
        .iter()
        .map(|(n, v)| key(n.as_str()).equal(v.clone()))
        .reduce(KeyCondition::and)
}

/// AND of `name = value` for every entry, in attribute-name order.
///
/// Returns `None` for an empty map.
#[must_use]
pub fn filter_from(pairs: &BTreeMap<String, AttributeValue>) -> Option<Condition> {
    pairs
        .iter()
        .map(|(n, v)| name(n.as_str()).equal(v.clone()))
        .reduce(Condition::and)
}
