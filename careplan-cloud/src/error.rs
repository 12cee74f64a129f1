//! Cloud layer error types.

use thiserror::Error;

/// Result type for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur in cloud operations.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The remote database call failed (network, quota, server).
    #[error("remote call failed: {0}")]
    Remote(String),

    /// A decrypted envelope does not match its clear index fields.
    /// Treated as data corruption or tampering, never auto-resolved.
    #[error("record inconsistency: {0}")]
    Inconsistency(String),

    /// An expected related record is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// An out-of-band administrative call failed.
    #[error("administrative call failed: {0}")]
    AdminCall(String),

    /// Vault encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] careplan_vault::CryptoError),

    /// Payload serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
