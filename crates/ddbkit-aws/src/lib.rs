//! [`DynamoStore`](ddbkit_model::DynamoStore) over `aws-sdk-dynamodb`.
//!
//! [`AwsStore`] converts each ddbkit request into the matching SDK fluent
//! call and converts the response back. Service errors keep their DynamoDB
//! error code.

pub mod client;
pub mod config;
pub mod convert;

pub use client::AwsStore;
pub use config::AwsStoreConfig;
