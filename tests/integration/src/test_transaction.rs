//! Transactions end to end.

use std::sync::Arc;
use std::time::Duration;

use ddbkit_core::{DdbKitError, Transaction, Worker};
use ddbkit_model::{DynamoDBErrorCode, StoreOperation};
use futures::future::join_all;

use crate::{COUNTERS, Counter, memory_store, memory_store_with_latency};

async fn value(worker: &Worker, name: &str) -> i64 {
    worker
        .clone()
        .key("Name", name)
        .get::<Counter>()
        .await
        .unwrap()
        .value
}

#[tokio::test]
async fn test_should_commit_all_updates() {
    let store = memory_store();
    let worker = Worker::new(Arc::clone(&store)).table(COUNTERS);
    worker
        .batch_save(&[Counter::new("from", 10), Counter::new("to", 0)])
        .await
        .unwrap();

    Transaction::new(Arc::clone(&store))
        .with(worker.clone().key("Name", "from").to_update_item([("Value", 7)]).unwrap())
        .with(worker.clone().key("Name", "to").to_update_item([("Value", 3)]).unwrap())
        .commit()
        .await
        .unwrap();

    assert_eq!(value(&worker, "from").await, 7);
    assert_eq!(value(&worker, "to").await, 3);
}

#[tokio::test]
async fn test_should_let_one_of_many_overlapping_transactions_win() {
    let store = memory_store_with_latency(Duration::from_millis(30));
    let worker = Worker::new(Arc::clone(&store)).table(COUNTERS);
    worker.save(&Counter::new("shared", 0)).await.unwrap();

    let commits = (1..=4).map(|i| {
        Transaction::new(Arc::clone(&store))
            .with(
                worker
                    .clone()
                    .key("Name", "shared")
                    .to_update_item([("Value", i)])
                    .unwrap(),
            )
            .commit()
    });
    let results = join_all(commits).await;

    let winners: Vec<usize> = results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.is_ok().then_some(i))
        .collect();
    assert_eq!(winners.len(), 1);
    for err in results.into_iter().filter_map(Result::err) {
        assert!(matches!(
            err,
            DdbKitError::Store {
                operation: StoreOperation::TransactWriteItems,
                ..
            }
        ));
        assert_eq!(
            err.store_code(),
            Some(DynamoDBErrorCode::TransactionCanceledException)
        );
    }
    let expected = i64::try_from(winners[0]).unwrap() + 1;
    assert_eq!(value(&worker, "shared").await, expected);
}
