//! Error types for zkBank operations.

use crate::TransactionId;
use thiserror::Error;

/// Main error type for zkBank operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZkBankError {
    /// Missing or malformed input.
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Unknown transaction identifier.
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// Transaction already reached its terminal state.
    #[error("Transaction already completed: {0}")]
    AlreadyCompleted(TransactionId),

    /// Signer already signed this transaction.
    #[error("Signer {signer} already signed transaction {id}")]
    DuplicateSigner { id: TransactionId, signer: String },

    /// Notary signature submitted for a transaction without a notary gate.
    #[error("Notary signature not required for transaction {0}")]
    NotaryNotRequired(TransactionId),

    /// Fewer signatures than the threshold.
    #[error("Not enough signatures for transaction {id}: have {have}, need {required}")]
    InsufficientSignatures {
        id: TransactionId,
        have: usize,
        required: u32,
    },

    /// Notary signature required but not provided.
    #[error("Notary signature required but not provided for transaction {0}")]
    MissingNotary(TransactionId),

    /// Notary signature already recorded.
    #[error("Notary signature already recorded for transaction {0}")]
    NotaryAlreadySet(TransactionId),

    /// Unexpected failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Transport failure talking to the API.
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ZkBankError {
    /// Create a validation error for a field.
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        ZkBankError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a missing-field validation error.
    pub fn missing_field(field: &str) -> Self {
        Self::validation(format!("Missing required field: {}", field), field)
    }

    /// Check if the caller caused this error (400/404-class at the boundary).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ZkBankError::Internal(_) | ZkBankError::Network(_) | ZkBankError::Configuration(_)
        )
    }

    /// Get error code for response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            ZkBankError::Validation { .. } => "VALIDATION_ERROR",
            ZkBankError::NotFound(_) => "NOT_FOUND",
            ZkBankError::AlreadyCompleted(_) => "ALREADY_COMPLETED",
            ZkBankError::DuplicateSigner { .. } => "DUPLICATE_SIGNER",
            ZkBankError::NotaryNotRequired(_) => "NOTARY_NOT_REQUIRED",
            ZkBankError::InsufficientSignatures { .. } => "INSUFFICIENT_SIGNATURES",
            ZkBankError::MissingNotary(_) => "MISSING_NOTARY",
            ZkBankError::NotaryAlreadySet(_) => "NOTARY_ALREADY_SET",
            ZkBankError::Internal(_) => "INTERNAL_ERROR",
            ZkBankError::Network(_) => "NETWORK_ERROR",
            ZkBankError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Rebuild an error from a response body's code and message.
    ///
    /// Structured detail (signer, counts) is not carried over the wire, so
    /// the rebuilt variants hold what the body provides.
    pub fn from_code(code: &str, message: impl Into<String>, id: Option<&TransactionId>) -> Self {
        let message = message.into();
        let id = || id.cloned().unwrap_or_else(|| TransactionId::new(""));
        match code {
            "VALIDATION_ERROR" => ZkBankError::Validation {
                message,
                field: None,
            },
            "NOT_FOUND" => ZkBankError::NotFound(id()),
            "ALREADY_COMPLETED" => ZkBankError::AlreadyCompleted(id()),
            "DUPLICATE_SIGNER" => ZkBankError::DuplicateSigner {
                id: id(),
                signer: String::new(),
            },
            "NOTARY_NOT_REQUIRED" => ZkBankError::NotaryNotRequired(id()),
            "INSUFFICIENT_SIGNATURES" => ZkBankError::InsufficientSignatures {
                id: id(),
                have: 0,
                required: 0,
            },
            "MISSING_NOTARY" => ZkBankError::MissingNotary(id()),
            "NOTARY_ALREADY_SET" => ZkBankError::NotaryAlreadySet(id()),
            "CONFIGURATION_ERROR" => ZkBankError::Configuration(message),
            "NETWORK_ERROR" => ZkBankError::Network(message),
            _ => ZkBankError::Internal(message),
        }
    }
}

/// Result type alias for zkBank operations.
pub type Result<T> = std::result::Result<T, ZkBankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_from_code() {
        let id = TransactionId::new("0xabc");
        let errors = vec![
            ZkBankError::missing_field("initiator"),
            ZkBankError::NotFound(id.clone()),
            ZkBankError::AlreadyCompleted(id.clone()),
            ZkBankError::NotaryNotRequired(id.clone()),
            ZkBankError::MissingNotary(id.clone()),
            ZkBankError::NotaryAlreadySet(id.clone()),
            ZkBankError::Internal("boom".to_string()),
        ];

        for err in errors {
            let rebuilt = ZkBankError::from_code(err.error_code(), err.to_string(), Some(&id));
            assert_eq!(rebuilt.error_code(), err.error_code());
        }
    }

    #[test]
    fn test_unknown_code_is_internal() {
        let err = ZkBankError::from_code("SOMETHING_ELSE", "odd", None);
        assert!(matches!(err, ZkBankError::Internal(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_missing_field_message() {
        let err = ZkBankError::missing_field("amount");
        assert_eq!(err.to_string(), "Missing required field: amount");
        assert!(err.is_client_error());
    }
}
