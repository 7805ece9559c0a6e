//! Fluent DynamoDB access for serde records.
//!
//! The pieces, bottom up:
//!
//! - [`codec`]: record <-> item conversion;
//! - [`cursor`]: opaque pagination tokens wrapping `LastEvaluatedKey`;
//! - [`expression`]: condition, projection and update expression rendering;
//! - [`Worker`]: the per-table accessor that turns a configuration into one
//!   store call;
//! - [`Transaction`]: prepared updates committed all-or-nothing.
//!
//! Everything talks to a [`DynamoStore`](ddbkit_model::DynamoStore) behind an
//! `Arc`, so the same code runs against DynamoDB or an in-memory store.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod cursor;
pub mod error;
pub mod expression;
pub mod transaction;
pub mod worker;

pub use codec::CodecError;
pub use cursor::{Cursor, decode_last_evaluated_key, encode_last_evaluated_key};
pub use error::{DdbKitError, DdbKitResult, ErrorKind};
pub use expression::{Expression, ExpressionBuilder, ExpressionError, UpdateBuilder, key, name};
pub use transaction::Transaction;
pub use worker::{Page, Worker};
