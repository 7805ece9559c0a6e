//! In-memory DynamoDB-compatible store.
//!
//! [`MemoryStore`] implements [`ddbkit_model::DynamoStore`] over partitioned
//! in-process tables so that ddbkit code can be exercised without a DynamoDB
//! endpoint. Tables are declared up front with a [`TableDefinition`]; items
//! are schemaless apart from their key attributes.

pub mod error;
pub mod expression;
pub mod schema;
pub mod storage;
pub mod store;

pub use schema::{GlobalIndex, KeyAttribute, KeySchema, TableDefinition};
pub use store::MemoryStore;
