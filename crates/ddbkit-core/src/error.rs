//! Error types for the accessor layer.

use ddbkit_model::{DynamoDBError, DynamoDBErrorCode, StoreOperation};

use crate::codec::CodecError;
use crate::expression::ExpressionError;

/// Coarse classification of a [`DdbKitError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A read by key found no item.
    NotFound,
    /// The request was rejected before reaching the store.
    InvalidRequest,
    /// Record marshalling failed.
    Codec,
    /// Expression rendering failed.
    Expression,
    /// The store rejected or failed the call.
    Store,
    /// The store accepted a batch call but skipped part of it.
    Unprocessed,
}

/// Errors returned by [`Worker`](crate::Worker) and
/// [`Transaction`](crate::Transaction).
#[derive(Debug, thiserror::Error)]
pub enum DdbKitError {
    /// No item exists for the configured key.
    #[error("item not found in table {table}")]
    NotFound {
        /// Table that was read.
        table: String,
    },
    /// A key-addressed operation was issued without a key.
    #[error("{operation} requires a key")]
    MissingKey {
        /// The operation that was attempted.
        operation: StoreOperation,
    },
    /// Record marshalling failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Expression rendering failed.
    #[error("failed to build expression: {0}")]
    Expression(#[from] ExpressionError),
    /// The store call failed.
    #[error("{operation} failed")]
    Store {
        /// The failed store call.
        operation: StoreOperation,
        /// The store's error.
        #[source]
        source: DynamoDBError,
    },
    /// A batch call returned unprocessed keys or writes. Nothing is retried.
    #[error("{operation} left {count} requests unprocessed")]
    Unprocessed {
        /// The batch call.
        operation: StoreOperation,
        /// Keys or writes the store did not get to.
        count: usize,
    },
}

impl DdbKitError {
    /// Wrap a store error with the operation that produced it.
    #[must_use]
    pub fn store(operation: StoreOperation, source: DynamoDBError) -> Self {
        Self::Store { operation, source }
    }

    /// The error's kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MissingKey { .. } => ErrorKind::InvalidRequest,
            Self::Codec(_) => ErrorKind::Codec,
            Self::Expression(_) => ErrorKind::Expression,
            Self::Store { .. } => ErrorKind::Store,
            Self::Unprocessed { .. } => ErrorKind::Unprocessed,
        }
    }

    /// Returns `true` when a read by key found nothing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The store's error code, for store failures.
    #[must_use]
    pub fn store_code(&self) -> Option<DynamoDBErrorCode> {
        match self {
            Self::Store { source, .. } => Some(source.code),
            _ => None,
        }
    }
}

/// Result alias for the accessor layer.
pub type DdbKitResult<T> = Result<T, DdbKitError>;
