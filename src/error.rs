//! Unified error types for the custody core
//!
//! Every fallible operation returns a `CustodyError` so callers (CLI,
//! persistence glue, the backend handlers) get one consistent shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all custody operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl CustodyError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_mnemonic(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMnemonic, msg)
    }

    pub fn derivation_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::DerivationFailure, msg)
    }

    pub fn encryption_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::EncryptionFailure, msg)
    }

    pub fn decryption_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::DecryptionFailure, msg)
    }

    pub fn persistence_conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::PersistenceConflict, msg)
    }

    pub fn partial_provisioning(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::PartialProvisioning, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPath, msg)
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, msg)
    }

    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for CustodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for CustodyError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Provisioning pipeline
    InvalidMnemonic,
    DerivationFailure,
    EncryptionFailure,
    DecryptionFailure,
    PersistenceConflict,
    PartialProvisioning,

    // Input errors
    InvalidInput,
    InvalidPath,

    // Environment
    ConfigError,
    NotFound,
    AuthError,

    // Internal
    Internal,
}

/// Result type alias for custody operations
pub type CustodyResult<T> = Result<T, CustodyError>;

// Conversions from common error types

impl From<bip39::Error> for CustodyError {
    fn from(e: bip39::Error) -> Self {
        CustodyError::invalid_mnemonic(format!("BIP39 error: {}", e))
    }
}

impl From<bitcoin::secp256k1::Error> for CustodyError {
    fn from(e: bitcoin::secp256k1::Error) -> Self {
        CustodyError::derivation_failure(format!("Secp256k1 error: {}", e))
    }
}

impl From<hex::FromHexError> for CustodyError {
    fn from(e: hex::FromHexError) -> Self {
        CustodyError::invalid_input(format!("Invalid hex: {}", e))
    }
}

impl From<base64::DecodeError> for CustodyError {
    fn from(e: base64::DecodeError) -> Self {
        CustodyError::decryption_failure(format!("Invalid base64: {}", e))
    }
}

impl From<serde_json::Error> for CustodyError {
    fn from(e: serde_json::Error) -> Self {
        CustodyError::invalid_input(format!("JSON error: {}", e))
    }
}

impl From<std::io::Error> for CustodyError {
    fn from(e: std::io::Error) -> Self {
        CustodyError::internal(e.to_string())
    }
}
