//! Error handling for the birch index engine

use thiserror::Error;

/// Main error type for index operations.
///
/// The compression layer keeps its own internal error type
/// ([`crate::compression::CompressionError`]); encode-side failures are
/// absorbed there and never surface. Only decode failures cross into
/// `BirchError`, because a blob that no longer decodes means the in-memory
/// page state is corrupt.
#[derive(Error, Debug)]
pub enum BirchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type alias for convenience
pub type BirchResult<T> = std::result::Result<T, BirchError>;

/// Macro for creating invalid-argument errors
#[macro_export]
macro_rules! invalid_arg {
    ($msg:expr) => {
        $crate::common::error::BirchError::InvalidArgument($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::common::error::BirchError::InvalidArgument(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BirchError::InvalidArgument("order must be >= 4".to_string());
        assert_eq!(format!("{}", err), "invalid argument: order must be >= 4");

        let err = BirchError::Decompression("blob truncated".to_string());
        assert_eq!(format!("{}", err), "decompression failed: blob truncated");
    }

    #[test]
    fn test_invalid_arg_macro() {
        let err = invalid_arg!("order {} is below the minimum of 4", 2);
        assert!(matches!(err, BirchError::InvalidArgument(_)));
        assert_eq!(
            format!("{}", err),
            "invalid argument: order 2 is below the minimum of 4"
        );
    }
}
