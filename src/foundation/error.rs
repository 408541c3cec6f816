use std::io;
use thiserror::Error;

use crate::foundation::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidPoint,
    ConfigError,
    NotFound,
    Authorization,
    ChainCommunication,
    CacheConsistency,
    StorageError,
    SerializationError,
    CryptoError,
    KeyDerivation,
    Message,
}

#[derive(Debug, Error)]
pub enum TillerError {
    #[error("invalid point '{input}': {reason}")]
    InvalidPoint { input: String, reason: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("{resource} not found for point {point}")]
    NotFound { point: Point, resource: String },

    #[error("not authorized for point {point}: {reason}")]
    Authorization { point: Point, reason: String },

    #[error("chain communication failed during {operation}: {details}")]
    ChainCommunication {
        operation: String,
        details: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("cache inconsistency for point {point}: {details}")]
    CacheConsistency { point: Point, details: String },

    #[error("storage error during {operation}: {details}")]
    StorageError { operation: String, details: String },

    #[error("{format} serialization error: {details}")]
    SerializationError { format: String, details: String },

    #[error("crypto error during {operation}: {details}")]
    CryptoError { operation: String, details: String },

    #[error("key derivation failed for point {point}: {details}")]
    KeyDerivation { point: Point, details: String },

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, TillerError>;

impl TillerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TillerError::InvalidPoint { .. } => ErrorCode::InvalidPoint,
            TillerError::ConfigError(_) => ErrorCode::ConfigError,
            TillerError::NotFound { .. } => ErrorCode::NotFound,
            TillerError::Authorization { .. } => ErrorCode::Authorization,
            TillerError::ChainCommunication { .. } => ErrorCode::ChainCommunication,
            TillerError::CacheConsistency { .. } => ErrorCode::CacheConsistency,
            TillerError::StorageError { .. } => ErrorCode::StorageError,
            TillerError::SerializationError { .. } => ErrorCode::SerializationError,
            TillerError::CryptoError { .. } => ErrorCode::CryptoError,
            TillerError::KeyDerivation { .. } => ErrorCode::KeyDerivation,
            TillerError::Message(_) => ErrorCode::Message,
        }
    }

    /// The only error class that may trigger dominion fallback during
    /// data-source selection. Everything else propagates unchanged.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TillerError::NotFound { .. })
    }

    pub fn invalid_point(input: impl Into<String>, reason: impl Into<String>) -> Self {
        TillerError::InvalidPoint { input: input.into(), reason: reason.into() }
    }

    pub fn not_found(point: Point, resource: impl Into<String>) -> Self {
        TillerError::NotFound { point, resource: resource.into() }
    }

    pub fn chain(operation: impl Into<String>, details: impl Into<String>) -> Self {
        TillerError::ChainCommunication { operation: operation.into(), details: details.into(), source: None }
    }

    pub fn chain_with_source(
        operation: impl Into<String>,
        details: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        TillerError::ChainCommunication {
            operation: operation.into(),
            details: details.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<io::Error> for TillerError {
    fn from(err: io::Error) -> Self {
        TillerError::StorageError { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for TillerError {
    fn from(err: serde_json::Error) -> Self {
        TillerError::SerializationError { format: "json".to_string(), details: err.to_string() }
    }
}

impl From<toml::de::Error> for TillerError {
    fn from(err: toml::de::Error) -> Self {
        TillerError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<hex::FromHexError> for TillerError {
    fn from(err: hex::FromHexError) -> Self {
        TillerError::SerializationError { format: "hex".to_string(), details: err.to_string() }
    }
}

impl From<secp256k1::Error> for TillerError {
    fn from(err: secp256k1::Error) -> Self {
        TillerError::CryptoError { operation: "secp256k1".to_string(), details: err.to_string() }
    }
}

// NOTE: reqwest errors are converted at the call site via `chain_with_source`
// so the failing operation name is preserved.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_variants() {
        let err = TillerError::invalid_point("~zodzod", "no such name");
        assert_eq!(err.code(), ErrorCode::InvalidPoint);

        let err = TillerError::not_found(Point::new(65792), "roller point record");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(err.is_not_found());

        let err = TillerError::chain("getPoint", "connection refused");
        assert_eq!(err.code(), ErrorCode::ChainCommunication);
        assert!(!err.is_not_found());
    }

    #[test]
    fn errors_render_point_context() {
        let err = TillerError::Authorization { point: Point::new(0), reason: "owner or management proxy required".into() };
        assert!(err.to_string().contains("~zod"));
    }
}
