//! The worker against a real DynamoDB endpoint.
//!
//! Ignored by default; set `DDBKIT_ENDPOINT_URL` (for example to a local
//! DynamoDB) and run with `--ignored`.

use std::sync::Arc;

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use ddbkit_aws::{AwsStore, AwsStoreConfig};
use ddbkit_core::{Page, Transaction, Worker};
use ddbkit_model::{DynamoDBErrorCode, DynamoStore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{init_tracing, unique_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Entry {
    owner: String,
    seq: i64,
    #[serde(default)]
    score: i64,
}

async fn store_with_table() -> (Arc<dyn DynamoStore>, String) {
    init_tracing();
    let store = AwsStore::from_config(&AwsStoreConfig::from_env()).await;
    let table = unique_name("ddbkit");
    store
        .client()
        .create_table()
        .table_name(&table)
        .billing_mode(BillingMode::PayPerRequest)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("Owner")
                .attribute_type(ScalarAttributeType::S)
                .build()
                .unwrap(),
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("Seq")
                .attribute_type(ScalarAttributeType::N)
                .build()
                .unwrap(),
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("Owner")
                .key_type(KeyType::Hash)
                .build()
                .unwrap(),
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("Seq")
                .key_type(KeyType::Range)
                .build()
                .unwrap(),
        )
        .send()
        .await
        .unwrap();
    info!(%table, "created test table");
    (Arc::new(store), table)
}

fn entry(owner: &str, seq: i64) -> Entry {
    Entry {
        owner: owner.to_owned(),
        seq,
        score: 0,
    }
}

#[tokio::test]
#[ignore = "requires a DynamoDB endpoint"]
async fn test_should_save_get_and_page_against_dynamodb() {
    let (store, table) = store_with_table().await;
    let worker = Worker::new(store).table(table);
    let entries: Vec<Entry> = (1..=3).map(|seq| entry("ann", seq)).collect();
    worker.batch_save(&entries).await.unwrap();

    let got: Entry = worker
        .clone()
        .key("Owner", "ann")
        .key("Seq", 2)
        .get()
        .await
        .unwrap();
    assert_eq!(got, entries[1]);

    let paged = worker.clone().key("Owner", "ann").limit(2);
    let first: Page<Entry> = paged.query().await.unwrap();
    assert_eq!(first.items.len(), 2);
    assert!(first.has_more());
    let second: Page<Entry> = paged.after(&first).query().await.unwrap();
    assert_eq!(second.items, vec![entries[2].clone()]);
}

#[tokio::test]
#[ignore = "requires a DynamoDB endpoint"]
async fn test_should_commit_transaction_against_dynamodb() {
    let (store, table) = store_with_table().await;
    let worker = Worker::new(Arc::clone(&store)).table(table);
    worker
        .batch_save(&[entry("ann", 1), entry("bob", 1)])
        .await
        .unwrap();

    Transaction::new(store)
        .with(
            worker
                .clone()
                .key("Owner", "ann")
                .key("Seq", 1)
                .to_update_item([("Score", 5)])
                .unwrap(),
        )
        .with(
            worker
                .clone()
                .key("Owner", "bob")
                .key("Seq", 1)
                .to_update_item([("Score", 7)])
                .unwrap(),
        )
        .commit()
        .await
        .unwrap();

    let bob: Entry = worker
        .key("Owner", "bob")
        .key("Seq", 1)
        .get()
        .await
        .unwrap();
    assert_eq!(bob.score, 7);
}

#[tokio::test]
#[ignore = "requires a DynamoDB endpoint"]
async fn test_should_report_missing_table_code() {
    init_tracing();
    let store = AwsStore::from_config(&AwsStoreConfig::from_env()).await;
    let err = Worker::new(Arc::new(store))
        .table(unique_name("missing"))
        .key("Owner", "ann")
        .find::<Entry>()
        .await
        .unwrap_err();
    assert_eq!(
        err.store_code(),
        Some(DynamoDBErrorCode::ResourceNotFoundException)
    );
}
