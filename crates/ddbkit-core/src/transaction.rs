//! All-or-nothing batches of prepared updates.

use std::sync::Arc;

use ddbkit_model::{DynamoStore, StoreOperation};
use ddbkit_model::input::TransactWriteItemsInput;
use ddbkit_model::types::{TransactWriteItem, Update};
use tracing::debug;

use crate::error::{DdbKitError, DdbKitResult};

/// Collects update descriptors (see [`Worker::to_update_item`] and
/// [`Worker::prepare_update`]) and commits them in one transactional write.
///
/// Either every update is applied or none is. A rejected commit is reported
/// as [`DdbKitError::Store`] for `TransactWriteItems` and is not retried.
///
/// [`Worker::to_update_item`]: crate::Worker::to_update_item
/// [`Worker::prepare_update`]: crate::Worker::prepare_update
#[derive(Debug, Clone)]
pub struct Transaction {
    store: Arc<dyn DynamoStore>,
    updates: Vec<Update>,
}

impl Transaction {
    /// An empty transaction over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DynamoStore>) -> Self {
        Self {
            store,
            updates: Vec::new(),
        }
    }

    /// A transaction over `store` holding a pre-built list of updates.
    #[must_use]
    pub fn from_updates(
        store: Arc<dyn DynamoStore>,
        updates: impl IntoIterator<Item = Update>,
    ) -> Self {
        Self {
            store,
            updates: updates.into_iter().collect(),
        }
    }

    /// Append one update.
    pub fn push(&mut self, update: Update) -> &mut Self {
        self.updates.push(update);
        self
    }

    /// Append one update, builder style.
    #[must_use]
    pub fn with(mut self, update: Update) -> Self {
        self.updates.push(update);
        self
    }

    /// Number of collected updates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Returns `true` if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Submit every collected update as one transactional write.
    ///
    /// An empty transaction is submitted as is; the store decides whether
    /// that is valid.
    pub async fn commit(self) -> DdbKitResult<()> {
        debug!(count = self.updates.len(), "commit transaction");
        let transact_items = self
            .updates
            .into_iter()
            .map(TransactWriteItem::from)
            .collect();
        self.store
            .transact_write_items(TransactWriteItemsInput {
                transact_items,
                client_request_token: None,
            })
            .await
            .map_err(|source| DdbKitError::store(StoreOperation::TransactWriteItems, source))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ddbkit_memory::{KeyAttribute, MemoryStore, TableDefinition};
    use ddbkit_model::{AttributeValue, DynamoDBErrorCode};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::Worker;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Account {
        #[serde(rename = "ID")]
        id: String,
        balance: i64,
    }

    fn store(latency: Duration) -> Arc<dyn DynamoStore> {
        Arc::new(
            MemoryStore::new()
                .with_table(TableDefinition::new("Account", KeyAttribute::string("ID")))
                .with_transaction_latency(latency),
        )
    }

    async fn seed(store: &Arc<dyn DynamoStore>, ids: &[&str]) -> Worker {
        let worker = Worker::new(Arc::clone(store)).table("Account");
        for id in ids {
            worker
                .save(&Account {
                    id: (*id).to_owned(),
                    balance: 10,
                })
                .await
                .unwrap();
        }
        worker
    }

    async fn balance(worker: &Worker, id: &str) -> i64 {
        worker
            .clone()
            .key("ID", id)
            .get::<Account>()
            .await
            .unwrap()
            .balance
    }

    #[tokio::test]
    async fn test_should_apply_all_updates() {
        let store = store(Duration::ZERO);
        let worker = seed(&store, &["a", "b"]).await;

        let mut tx = Transaction::new(Arc::clone(&store));
        tx.push(
            worker
                .clone()
                .key("ID", "a")
                .to_update_item([("Balance", 5)])
                .unwrap(),
        )
        .push(
            worker
                .clone()
                .key("ID", "b")
                .to_update_item([("Balance", 15)])
                .unwrap(),
        );
        assert_eq!(tx.len(), 2);
        tx.commit().await.unwrap();

        assert_eq!(balance(&worker, "a").await, 5);
        assert_eq!(balance(&worker, "b").await, 15);
    }

    #[tokio::test]
    async fn test_should_commit_prebuilt_updates() {
        let store = store(Duration::ZERO);
        let worker = seed(&store, &["a", "b"]).await;
        let updates: Vec<Update> = ["a", "b"]
            .into_iter()
            .map(|id| {
                worker
                    .clone()
                    .key("ID", id)
                    .to_update_item([("Balance", 0)])
                    .unwrap()
            })
            .collect();

        let tx = Transaction::from_updates(Arc::clone(&store), updates);
        assert_eq!(tx.len(), 2);
        tx.commit().await.unwrap();
        assert_eq!(balance(&worker, "b").await, 0);
    }

    #[tokio::test]
    async fn test_should_reject_empty_transaction_at_store() {
        let tx = Transaction::new(store(Duration::ZERO));
        assert!(tx.is_empty());
        let err = tx.commit().await.unwrap_err();
        assert!(matches!(
            err,
            DdbKitError::Store {
                operation: StoreOperation::TransactWriteItems,
                ..
            }
        ));
        assert_eq!(err.store_code(), Some(DynamoDBErrorCode::ValidationException));
    }

    #[tokio::test]
    async fn test_should_apply_nothing_when_one_update_fails() {
        let store = store(Duration::ZERO);
        let worker = seed(&store, &["a"]).await;

        let good = worker
            .clone()
            .key("ID", "a")
            .to_update_item([("Balance", 0)])
            .unwrap();
        let bad = worker
            .clone()
            .table("Missing")
            .key("ID", "a")
            .to_update_item([("Balance", 0)])
            .unwrap();
        let err = Transaction::new(Arc::clone(&store))
            .with(good)
            .with(bad)
            .commit()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DdbKitError::Store {
                operation: StoreOperation::TransactWriteItems,
                ..
            }
        ));
        assert_eq!(balance(&worker, "a").await, 10);
    }

    #[tokio::test]
    async fn test_should_fail_one_of_two_overlapping_transactions() {
        let store = store(Duration::from_millis(50));
        let worker = seed(&store, &["a", "b", "c"]).await;
        let update = |id: &str, value: i64| {
            worker
                .clone()
                .key("ID", id)
                .to_update_item([("Balance", AttributeValue::from(value))])
                .unwrap()
        };

        let first = Transaction::new(Arc::clone(&store))
            .with(update("a", 1))
            .with(update("b", 1));
        let second = Transaction::new(Arc::clone(&store))
            .with(update("b", 2))
            .with(update("c", 2));

        let (r1, r2) = tokio::join!(first.commit(), second.commit());
        assert!(r1.is_ok() != r2.is_ok(), "exactly one should commit");

        let failed = r1.err().or(r2.err()).unwrap();
        assert_eq!(
            failed.store_code(),
            Some(DynamoDBErrorCode::TransactionCanceledException)
        );
    }
}
