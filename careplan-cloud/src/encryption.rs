//! Field-level encryption on remote records.
//!
//! Encrypts or decrypts a selected subset of a record's named fields
//! through the vault, one field at a time in the order given. The receiver
//! is never mutated; both operations work on a copy and return it only if
//! every field succeeded. A field absent from the record is skipped.
//! Text values stay text, byte values stay bytes; any other value kind is
//! an error.

use crate::record::{FieldValue, RemoteRecord};
use careplan_vault::{CryptoError, CryptoResult, Vault, VaultId};

impl RemoteRecord {
    /// Returns a copy of this record with the named fields encrypted under
    /// `vault_id`.
    ///
    /// Fields are processed sequentially in `fields` order; the first
    /// failure aborts the whole operation and no partially encrypted
    /// record is ever returned.
    pub async fn encrypted(
        &self,
        vault: &dyn Vault,
        vault_id: &VaultId,
        fields: &[&str],
    ) -> CryptoResult<RemoteRecord> {
        let mut copy = self.clone();
        for name in fields {
            let plain = match copy.get(name) {
                Some(value) => value.clone(),
                None => continue,
            };
            let cipher = match plain {
                FieldValue::Text(text) => {
                    FieldValue::Text(vault.encrypt_text(&text, vault_id).await?)
                }
                FieldValue::Bytes(bytes) => {
                    FieldValue::Bytes(vault.encrypt_bytes(&bytes, vault_id).await?)
                }
                _ => {
                    return Err(CryptoError::Encryption(format!(
                        "field {name} is not a text or byte payload"
                    )))
                }
            };
            copy.set(*name, cipher);
        }
        Ok(copy)
    }

    /// Returns a copy of this record with the named fields decrypted.
    ///
    /// Same ordering, skip and fail-fast behavior as
    /// [`encrypted`](Self::encrypted).
    pub async fn decrypted(&self, vault: &dyn Vault, fields: &[&str]) -> CryptoResult<RemoteRecord> {
        let mut copy = self.clone();
        for name in fields {
            let cipher = match copy.get(name) {
                Some(value) => value.clone(),
                None => continue,
            };
            let plain = match cipher {
                FieldValue::Text(text) => FieldValue::Text(vault.decrypt_text(&text).await?),
                FieldValue::Bytes(bytes) => FieldValue::Bytes(vault.decrypt_bytes(&bytes).await?),
                _ => {
                    return Err(CryptoError::Decryption(format!(
                        "field {name} is not a text or byte payload"
                    )))
                }
            };
            copy.set(*name, plain);
        }
        Ok(copy)
    }
}
