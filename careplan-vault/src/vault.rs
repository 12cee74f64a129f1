//! The vault traits.

use crate::CryptoResult;
use async_trait::async_trait;
use careplan_types::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultId(String);

impl VaultId {
    /// Creates a vault ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VaultId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Trait for encrypting and decrypting opaque payloads under a vault.
///
/// Text and byte payloads are distinct: encrypting text yields text
/// ciphertext that decrypts back to text, and likewise for bytes. The two
/// representations never mix.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Encrypts a text payload under the given vault.
    async fn encrypt_text(&self, plaintext: &str, vault_id: &VaultId) -> CryptoResult<String>;

    /// Decrypts a text ciphertext produced by [`encrypt_text`](Self::encrypt_text).
    async fn decrypt_text(&self, ciphertext: &str) -> CryptoResult<String>;

    /// Encrypts a byte payload under the given vault.
    async fn encrypt_bytes(&self, plaintext: &[u8], vault_id: &VaultId) -> CryptoResult<Vec<u8>>;

    /// Decrypts a byte ciphertext produced by [`encrypt_bytes`](Self::encrypt_bytes).
    async fn decrypt_bytes(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// Trait for vault membership administration.
///
/// Sharing and revoking typically involve an out-of-band approval step on
/// the vault service; a failed approval surfaces as
/// [`CryptoError::AdminCall`](crate::CryptoError::AdminCall).
#[async_trait]
pub trait VaultAdmin: Send + Sync {
    /// Grants `member` access to the vault.
    ///
    /// Sharing with an existing member is a no-op, not an error.
    async fn share_vault(&self, vault_id: &VaultId, member: &UserId) -> CryptoResult<()>;

    /// Revokes `member`'s access to the vault.
    ///
    /// Revoking a non-member is a no-op, not an error.
    async fn revoke_vault(&self, vault_id: &VaultId, member: &UserId) -> CryptoResult<()>;
}
