//! Opaque pagination cursors.
//!
//! A cursor is the store's `LastEvaluatedKey` rendered as JSON (attribute
//! names sorted, values in their typed wire form) and then base64url-encoded
//! without padding, so it can travel in URLs and query strings untouched.
//!
//! Decoding is fail-open: anything that does not decode to a non-empty key is
//! treated as "no cursor" and the read starts from the beginning.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ddbkit_model::{AttributeValue, Key};
use tracing::debug;

/// An opaque pagination token. Empty means "no more pages" when returned by a
/// read, and "start from the beginning" when passed into one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// The empty cursor.
    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Returns `true` when there is no cursor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the key this cursor points at, if any.
    #[must_use]
    pub fn to_key(&self) -> Option<Key> {
        decode_last_evaluated_key(&self.0)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Cursor {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.0
    }
}

/// Encode a `LastEvaluatedKey` into a cursor. An empty key yields the empty
/// cursor.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn encode_last_evaluated_key(key: &Key) -> Cursor {
    if key.is_empty() {
        return Cursor::empty();
    }
    let sorted: BTreeMap<&String, &AttributeValue> = key.iter().collect();
    match serde_json::to_vec(&sorted) {
        Ok(json) => Cursor(URL_SAFE_NO_PAD.encode(json)),
        // Serializing string-keyed attribute values into memory cannot fail.
        Err(_) => Cursor::empty(),
    }
}

/// Decode a cursor back into a `LastEvaluatedKey`.
///
/// Returns `None` for an empty cursor, bad base64, bad JSON, or an empty key.
#[must_use]
pub fn decode_last_evaluated_key(cursor: &str) -> Option<Key> {
    if cursor.is_empty() {
        return None;
    }
    let json = match URL_SAFE_NO_PAD.decode(cursor) {
        Ok(json) => json,
        Err(err) => {
            debug!(%err, "ignoring cursor that is not base64url");
            return None;
        }
    };
    let key: Key = match serde_json::from_slice(&json) {
        Ok(key) => key,
        Err(err) => {
            debug!(%err, "ignoring cursor that is not a key");
            return None;
        }
    };
    (!key.is_empty()).then_some(key)
}
