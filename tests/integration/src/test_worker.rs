//! Worker scenarios against the memory store.

use std::sync::Arc;

use ddbkit_core::expression::{key, name};
use ddbkit_core::{ErrorKind, ExpressionBuilder, Page, Worker};
use ddbkit_model::DynamoDBErrorCode;
use futures::future::try_join_all;

use crate::{BY_AUTHOR, COUNTERS, Counter, MESSAGES, Message, memory_store, unique_name};

#[tokio::test]
async fn test_should_tell_not_found_from_none() {
    let worker = Worker::new(memory_store()).table(COUNTERS).key("Name", "missing");

    let err = worker.get::<Counter>().await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(worker.find::<Counter>().await.unwrap(), None);
}

#[tokio::test]
async fn test_should_delete_missing_item() {
    let worker = Worker::new(memory_store()).table(COUNTERS).key("Name", "ghost");
    worker.delete().await.unwrap();
    worker.delete().await.unwrap();
}

#[tokio::test]
async fn test_should_count_concurrent_increments() {
    let store = memory_store();
    let worker = Worker::new(Arc::clone(&store)).table(COUNTERS).key("Name", "hits");
    worker.save(&Counter::new("hits", 0)).await.unwrap();

    try_join_all((0..10).map(|_| worker.incr("Value", 1)))
        .await
        .unwrap();
    assert_eq!(worker.get::<Counter>().await.unwrap().value, 10);
}

#[tokio::test]
async fn test_should_collect_labels_as_set() {
    let worker = Worker::new(memory_store()).table(COUNTERS).key("Name", "c");
    worker.add_to_set("Labels", ["red"]).await.unwrap();
    worker.add_to_set("Labels", ["red", "blue"]).await.unwrap();

    let mut counter: Counter = worker.get().await.unwrap();
    counter.labels.sort();
    assert_eq!(counter.labels, ["blue", "red"]);
}

#[tokio::test]
async fn test_should_batch_get_only_existing() {
    let worker = Worker::new(memory_store()).table(COUNTERS);
    worker
        .batch_save(&[Counter::new("a", 1), Counter::new("b", 2)])
        .await
        .unwrap();

    let mut got: Vec<Counter> = worker.batch_get("Name", ["a", "b", "zzz"]).await.unwrap();
    got.sort_by(|x, y| x.name.cmp(&y.name));
    assert_eq!(got, vec![Counter::new("a", 1), Counter::new("b", 2)]);
}

#[tokio::test]
async fn test_should_fail_oversized_batch_save() {
    let worker = Worker::new(memory_store()).table(COUNTERS);
    let counters: Vec<Counter> = (0..30).map(|i| Counter::new(&i.to_string(), i)).collect();

    let err = worker.batch_save(&counters).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(err.store_code(), Some(DynamoDBErrorCode::ValidationException));
}

#[tokio::test]
async fn test_should_query_index_by_prefix() {
    let store = memory_store();
    let room = unique_name("room");
    let worker = Worker::new(Arc::clone(&store)).table(MESSAGES);
    worker
        .batch_save(&[
            Message::new(&room, 1).by("ann", "rust-async"),
            Message::new(&room, 2).by("ann", "rust-macros"),
            Message::new(&room, 3).by("ann", "go"),
            Message::new(&room, 4).by("bob", "rust-async"),
        ])
        .await
        .unwrap();

    let expression = ExpressionBuilder::new()
        .with_key_condition(key("Author").equal("ann").and(key("Topic").begins_with("rust")))
        .build()
        .unwrap();
    let page: Page<Message> = worker
        .index(BY_AUTHOR)
        .query_by_expression(&expression)
        .await
        .unwrap();
    let topics: Vec<&str> = page.items.iter().map(|m| m.topic.as_str()).collect();
    assert_eq!(topics, ["rust-async", "rust-macros"]);
}

#[tokio::test]
async fn test_should_combine_range_and_rich_filter() {
    let store = memory_store();
    let room = unique_name("room");
    let worker = Worker::new(Arc::clone(&store)).table(MESSAGES);
    let messages: Vec<Message> = (1..=6)
        .map(|seq| Message::new(&room, seq).by(if seq % 2 == 0 { "ann" } else { "bob" }, "t"))
        .collect();
    worker.batch_save(&messages).await.unwrap();

    let expression = ExpressionBuilder::new()
        .with_key_condition(key("Room").equal(room.as_str()).and(key("Seq").greater_than(2)))
        .with_filter(name("Author").equal("ann").or(name("Seq").equal(5)))
        .build()
        .unwrap();
    let page: Page<Message> = worker.query_by_expression(&expression).await.unwrap();
    let seqs: Vec<i64> = page.items.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, [4, 5, 6]);
}
