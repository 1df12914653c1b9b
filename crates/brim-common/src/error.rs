//! Error types for Brim.

use thiserror::Error;

/// Result type alias using BrimError.
pub type Result<T> = std::result::Result<T, BrimError>;

/// Errors that can occur in Brim operations.
#[derive(Debug, Error)]
pub enum BrimError {
    #[error("select index {index} out of range for cardinality {cardinality}")]
    OutOfRange { index: u64, cardinality: u64 },

    #[error("malformed buffer: {0}")]
    MalformedBuffer(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_display() {
        let err = BrimError::OutOfRange {
            index: 10,
            cardinality: 5,
        };
        assert_eq!(
            err.to_string(),
            "select index 10 out of range for cardinality 5"
        );
    }

    #[test]
    fn test_malformed_buffer_display() {
        let err = BrimError::MalformedBuffer("odd byte length".to_string());
        assert_eq!(err.to_string(), "malformed buffer: odd byte length");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(BrimError::Internal("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BrimError>();
    }
}
