//! Store operation enum.

use std::fmt;

/// Every store call ddbkit issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Put (insert or replace) an item.
    PutItem,
    /// Get an item by primary key.
    GetItem,
    /// Update an item.
    UpdateItem,
    /// Delete an item by primary key.
    DeleteItem,
    /// Query items by key condition.
    Query,
    /// Scan a table or index.
    Scan,
    /// Get many items across tables.
    BatchGetItem,
    /// Put or delete many items across tables.
    BatchWriteItem,
    /// Apply several writes atomically.
    TransactWriteItems,
}

impl StoreOperation {
    /// Returns the AWS operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PutItem => "PutItem",
            Self::GetItem => "GetItem",
            Self::UpdateItem => "UpdateItem",
            Self::DeleteItem => "DeleteItem",
            Self::Query => "Query",
            Self::Scan => "Scan",
            Self::BatchGetItem => "BatchGetItem",
            Self::BatchWriteItem => "BatchWriteItem",
            Self::TransactWriteItems => "TransactWriteItems",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
