//! Error types for memento.
//!
//! Advice never recovers from, retries, or rewraps a failure. The wrapped
//! operation's own error value reaches the caller untouched inside
//! [`AdviceError::Operation`].

use thiserror::Error;

/// Result type alias for key generation.
pub type Result<T> = std::result::Result<T, KeyGenerationError>;

/// A key generator could not derive a cache key from the arguments.
#[derive(Debug, Error)]
pub enum KeyGenerationError {
    /// The arguments have no canonical serialized form.
    #[error("Arguments cannot be serialized into a cache key: {0}")]
    Unserializable(#[from] serde_json::Error),

    /// A custom key generator refused the arguments.
    #[error("Key generator rejected arguments: {0}")]
    Rejected(String),
}

impl KeyGenerationError {
    /// Creates a `Rejected` error from any message.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Failure of a single advised call.
///
/// `E` is the wrapped operation's error type.
#[derive(Debug, Error)]
pub enum AdviceError<E> {
    /// No key could be derived. Raised before the store is touched.
    #[error(transparent)]
    KeyGeneration(#[from] KeyGenerationError),

    /// The wrapped operation failed. Nothing was stored.
    #[error("Advised operation failed: {0}")]
    Operation(E),
}

impl<E> AdviceError<E> {
    /// Returns true if no key could be derived for the call.
    pub fn is_key_generation(&self) -> bool {
        matches!(self, AdviceError::KeyGeneration(_))
    }

    /// Returns true if the wrapped operation itself failed.
    pub fn is_operation(&self) -> bool {
        matches!(self, AdviceError::Operation(_))
    }

    /// Returns the wrapped operation's error, if that is what failed.
    pub fn into_operation(self) -> Option<E> {
        match self {
            AdviceError::Operation(e) => Some(e),
            AdviceError::KeyGeneration(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: AdviceError<String> = AdviceError::Operation("boom".into());
        assert!(err.to_string().contains("boom"));

        let err = KeyGenerationError::rejected("no functions");
        assert!(err.to_string().contains("no functions"));
    }

    #[test]
    fn test_error_classification() {
        let op: AdviceError<&str> = AdviceError::Operation("boom");
        assert!(op.is_operation());
        assert!(!op.is_key_generation());
        assert_eq!(op.into_operation(), Some("boom"));

        let key: AdviceError<&str> = KeyGenerationError::rejected("cyclic").into();
        assert!(key.is_key_generation());
        assert_eq!(key.into_operation(), None);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result = serde_json::from_str::<serde_json::Value>("invalid");
        let key_result: Result<serde_json::Value> = json_result.map_err(KeyGenerationError::from);
        assert!(matches!(key_result, Err(KeyGenerationError::Unserializable(_))));
    }
}
