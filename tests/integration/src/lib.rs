//! End-to-end tests for ddbkit.
//!
//! Most scenarios run against [`MemoryStore`] and need nothing else. The
//! `#[ignore]`d ones in `test_aws` need a DynamoDB-compatible endpoint:
//!
//! ```text
//! DDBKIT_ENDPOINT_URL=http://localhost:8000 cargo test -p ddbkit-integration -- --ignored
//! ```

use std::sync::{Arc, Once};
use std::time::Duration;

use ddbkit_memory::{KeyAttribute, MemoryStore, TableDefinition};
use ddbkit_model::DynamoStore;
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod test_aws;
#[cfg(test)]
mod test_pagination;
#[cfg(test)]
mod test_transaction;
#[cfg(test)]
mod test_worker;

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Table of [`Message`] records: `Room` partition key, `Seq` sort key, and
/// an `Author` index.
pub const MESSAGES: &str = "Message";
/// Index of messages by author and topic.
pub const BY_AUTHOR: &str = "Author-Topic-index";
/// Table of [`Counter`] records keyed by `Name`.
pub const COUNTERS: &str = "Counter";

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    /// Partition key.
    pub room: String,
    /// Sort key.
    pub seq: i64,
    /// Index partition key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    /// Index sort key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topic: String,
    /// Message text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

impl Message {
    /// A message in `room` with sequence number `seq`.
    #[must_use]
    pub fn new(room: &str, seq: i64) -> Self {
        Self {
            room: room.to_owned(),
            seq,
            author: String::new(),
            topic: String::new(),
            body: format!("message {seq}"),
        }
    }

    /// Set author and topic.
    #[must_use]
    pub fn by(mut self, author: &str, topic: &str) -> Self {
        self.author = author.to_owned();
        self.topic = topic.to_owned();
        self
    }
}

/// A named counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Counter {
    /// Primary key.
    pub name: String,
    /// Current value.
    #[serde(default)]
    pub value: i64,
    /// Labels, stored as a string set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl Counter {
    /// A counter at `value`.
    #[must_use]
    pub fn new(name: &str, value: i64) -> Self {
        Self {
            name: name.to_owned(),
            value,
            labels: Vec::new(),
        }
    }
}

/// A memory store holding the message and counter tables.
#[must_use]
pub fn memory_store() -> Arc<dyn DynamoStore> {
    memory_store_with_latency(Duration::ZERO)
}

/// Like [`memory_store`], with transactions held open for `latency`.
#[must_use]
pub fn memory_store_with_latency(latency: Duration) -> Arc<dyn DynamoStore> {
    init_tracing();
    Arc::new(
        MemoryStore::new()
            .with_table(
                TableDefinition::new(MESSAGES, KeyAttribute::string("Room"))
                    .with_sort_key(KeyAttribute::number("Seq"))
                    .with_global_index(
                        BY_AUTHOR,
                        KeyAttribute::string("Author"),
                        Some(KeyAttribute::string("Topic")),
                    ),
            )
            .with_table(TableDefinition::new(COUNTERS, KeyAttribute::string("Name")))
            .with_transaction_latency(latency),
    )
}

/// A unique table or partition name for one test.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}
