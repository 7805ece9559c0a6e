//! DynamoDB model types for ddbkit.
//!
//! Attribute values, the request/response shapes of the item-level operations
//! ddbkit issues, the store error type, and the [`DynamoStore`] trait that
//! every backing store implements. The types mirror the DynamoDB JSON wire
//! format so that a store adapter is a mechanical conversion.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod store;
pub mod types;

pub use attribute_value::{AttributeValue, StringSet};
pub use error::{DynamoDBError, DynamoDBErrorCode};
pub use operations::StoreOperation;
pub use store::DynamoStore;
pub use types::{Item, Key};
