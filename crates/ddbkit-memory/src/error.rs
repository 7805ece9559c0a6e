//! Conversions from internal errors into store errors.

use ddbkit_model::{DynamoDBError, DynamoDBErrorCode};

use crate::expression::ExpressionError;
use crate::storage::StorageError;

/// Convert a storage error into a validation error.
///
/// Takes `e` by value because this is used as a closure argument to `.map_err()`.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn storage_error_to_dynamodb(e: StorageError) -> DynamoDBError {
    DynamoDBError::with_message(DynamoDBErrorCode::ValidationException, e.to_string())
}

/// Convert an expression error into a validation error.
///
/// Takes `e` by value because this is used as a closure argument to `.map_err()`.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn expression_error_to_dynamodb(e: ExpressionError) -> DynamoDBError {
    DynamoDBError::with_message(
        DynamoDBErrorCode::ValidationException,
        format!("Invalid expression: {e}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_key_errors_to_validation() {
        let err = storage_error_to_dynamodb(StorageError::KeySchemaMismatch);
        assert_eq!(err.code, DynamoDBErrorCode::ValidationException);
        assert!(err.message.contains("does not match the schema"));
    }
}
