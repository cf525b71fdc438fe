//! Cache connector error types

use thiserror::Error;

/// Boxed error produced by a caller-supplied decode function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cache connector errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no such entity: {key}")]
    NotFound { key: String },

    #[error("error while decoding value for key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("error while encoding value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("connection error: {0}")]
    Connection(String),
}

impl CacheError {
    pub(crate) fn not_found(key: &str) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    /// Whether this error reports a missing key
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Connection(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_decode_error_chains_source() {
        let source: BoxError = "bad payload".into();
        let err = CacheError::Decode {
            key: "session:42".to_string(),
            source,
        };

        assert!(err.to_string().contains("session:42"));
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("bad payload"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(CacheError::not_found("k").is_not_found());
        assert!(!CacheError::Connection("refused".to_string()).is_not_found());
    }
}
