//! Cursor pagination end to end.

use std::sync::Arc;

use ddbkit_core::{Cursor, Page, Worker, decode_last_evaluated_key, encode_last_evaluated_key};
use ddbkit_model::{AttributeValue, DynamoStore, Key};

use crate::{MESSAGES, Message, memory_store, unique_name};

async fn seed(store: &Arc<dyn DynamoStore>, room: &str, count: i64) -> Worker {
    let worker = Worker::new(Arc::clone(store)).table(MESSAGES);
    let messages: Vec<Message> = (1..=count).map(|seq| Message::new(room, seq)).collect();
    worker.batch_save(&messages).await.unwrap();
    worker
}

fn seqs(page: &Page<Message>) -> Vec<i64> {
    page.items.iter().map(|m| m.seq).collect()
}

#[test]
fn test_should_round_trip_cursor() {
    let key = Key::from([
        ("Room".to_owned(), AttributeValue::from("lobby")),
        ("Seq".to_owned(), AttributeValue::from(42)),
    ]);
    let cursor = encode_last_evaluated_key(&key);
    assert!(!cursor.is_empty());
    assert!(
        cursor
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
    assert_eq!(decode_last_evaluated_key(cursor.as_str()), Some(key));
    assert!(encode_last_evaluated_key(&Key::new()).is_empty());
    assert_eq!(decode_last_evaluated_key(""), None);
}

#[tokio::test]
async fn test_should_walk_every_page() {
    let store = memory_store();
    let room = unique_name("room");
    let worker = seed(&store, &room, 5).await.key("Room", room.as_str()).limit(2);

    let mut pages = Vec::new();
    let mut offset = Cursor::empty();
    loop {
        let page: Page<Message> = worker.clone().offset(offset).query().await.unwrap();
        pages.push(seqs(&page));
        if !page.has_more() {
            break;
        }
        offset = page.cursor;
    }
    assert_eq!(pages, vec![vec![1, 2], vec![3, 4], vec![5]]);
}

#[tokio::test]
async fn test_should_end_on_exact_multiple_without_cursor() {
    let store = memory_store();
    let room = unique_name("room");
    let worker = seed(&store, &room, 4).await.key("Room", room.as_str()).limit(2);

    let first: Page<Message> = worker.query().await.unwrap();
    assert!(first.has_more());
    let second: Page<Message> = worker.after(&first).query().await.unwrap();
    assert_eq!(seqs(&second), [3, 4]);
    assert!(second.cursor.is_empty());
}

#[tokio::test]
async fn test_should_resume_from_cursor_string() {
    let store = memory_store();
    let room = unique_name("room");
    let worker = seed(&store, &room, 3).await.key("Room", room.as_str()).limit(1);

    let first: Page<Message> = worker.query().await.unwrap();
    let token: String = first.cursor.into();
    let second: Page<Message> = worker.offset(token).query().await.unwrap();
    assert_eq!(seqs(&second), [2]);
}
