//! Error types for the vault layer.

use thiserror::Error;

/// Result type for vault operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in vault operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed, or the payload is not a text/byte value.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong vault, tampered data, or the payload is
    /// not a text/byte value).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The referenced vault does not exist or the caller has no access.
    #[error("unknown vault: {0}")]
    UnknownVault(String),

    /// An out-of-band administrative approval step failed.
    #[error("administrative call failed: {0}")]
    AdminCall(String),
}
