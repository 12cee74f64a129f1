//! In-process vault implementation.
//!
//! Keys live in memory and never leave this module. Each ciphertext is a
//! self-describing envelope `[version | payload kind | id len | vault id |
//! nonce | ciphertext]`, so decryption needs no vault ID. Membership is
//! tracked but not enforced on decrypt; access control is the job of a real
//! vault service.

use crate::error::{CryptoError, CryptoResult};
use crate::vault::{Vault, VaultAdmin, VaultId};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use careplan_types::UserId;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a vault key in bytes.
const KEY_SIZE: usize = 32;

/// Size of nonce in bytes (96 bits for ChaCha20-Poly1305).
const NONCE_SIZE: usize = 12;

/// Envelope format version.
const FORMAT_VERSION: u8 = 1;

/// Payload kind markers; the representation must round-trip.
const PAYLOAD_BYTES: u8 = 0;
const PAYLOAD_TEXT: u8 = 1;

#[derive(Zeroize, ZeroizeOnDrop)]
struct VaultKey([u8; KEY_SIZE]);

/// An in-process [`Vault`] holding per-vault ChaCha20-Poly1305 keys.
#[derive(Default)]
pub struct LocalVault {
    keys: RwLock<HashMap<VaultId, VaultKey>>,
    members: RwLock<HashMap<VaultId, HashSet<UserId>>>,
}

impl LocalVault {
    /// Creates an empty vault store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vault with a fresh random key.
    pub fn create_vault(&self, id: impl Into<VaultId>) -> VaultId {
        let id = id.into();
        let mut key = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut key);
        self.keys
            .write()
            .expect("vault key lock poisoned")
            .insert(id.clone(), VaultKey(key));
        id
    }

    /// Whether `member` currently has access to `vault_id`.
    pub fn is_member(&self, vault_id: &VaultId, member: &UserId) -> bool {
        self.members
            .read()
            .expect("vault member lock poisoned")
            .get(vault_id)
            .is_some_and(|set| set.contains(member))
    }

    fn key_bytes(&self, vault_id: &VaultId) -> CryptoResult<[u8; KEY_SIZE]> {
        let keys = self.keys.read().expect("vault key lock poisoned");
        keys.get(vault_id)
            .map(|k| k.0)
            .ok_or_else(|| CryptoError::UnknownVault(vault_id.to_string()))
    }

    fn seal(&self, plaintext: &[u8], vault_id: &VaultId, kind: u8) -> CryptoResult<Vec<u8>> {
        let key = self.key_bytes(vault_id)?;
        let cipher = ChaCha20Poly1305::new((&key).into());

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let id = vault_id.as_str().as_bytes();
        let id_len = u16::try_from(id.len())
            .map_err(|_| CryptoError::Encryption("vault id too long".to_string()))?;

        let mut envelope = Vec::with_capacity(4 + id.len() + NONCE_SIZE + ciphertext.len());
        envelope.push(FORMAT_VERSION);
        envelope.push(kind);
        envelope.extend_from_slice(&id_len.to_be_bytes());
        envelope.extend_from_slice(id);
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    fn open(&self, envelope: &[u8], expected_kind: u8) -> CryptoResult<Vec<u8>> {
        if envelope.len() < 4 {
            return Err(CryptoError::Decryption("envelope too short".to_string()));
        }
        if envelope[0] != FORMAT_VERSION {
            return Err(CryptoError::Decryption(format!(
                "unsupported envelope version {}",
                envelope[0]
            )));
        }
        if envelope[1] != expected_kind {
            return Err(CryptoError::Decryption(
                "payload representation mismatch".to_string(),
            ));
        }

        let id_len = u16::from_be_bytes([envelope[2], envelope[3]]) as usize;
        let rest = &envelope[4..];
        if rest.len() < id_len + NONCE_SIZE {
            return Err(CryptoError::Decryption("envelope truncated".to_string()));
        }

        let vault_id = std::str::from_utf8(&rest[..id_len])
            .map_err(|_| CryptoError::Decryption("invalid vault id".to_string()))?;
        let vault_id = VaultId::new(vault_id);
        let key = self.key_bytes(&vault_id)?;

        let nonce = Nonce::from_slice(&rest[id_len..id_len + NONCE_SIZE]);
        let cipher = ChaCha20Poly1305::new((&key).into());
        cipher
            .decrypt(nonce, &rest[id_len + NONCE_SIZE..])
            .map_err(|_| {
                CryptoError::Decryption("wrong vault or tampered data".to_string())
            })
    }
}

#[async_trait]
impl Vault for LocalVault {
    async fn encrypt_text(&self, plaintext: &str, vault_id: &VaultId) -> CryptoResult<String> {
        let envelope = self.seal(plaintext.as_bytes(), vault_id, PAYLOAD_TEXT)?;
        Ok(STANDARD.encode(envelope))
    }

    async fn decrypt_text(&self, ciphertext: &str) -> CryptoResult<String> {
        let envelope = STANDARD
            .decode(ciphertext)
            .map_err(|e| CryptoError::Decryption(format!("invalid base64: {e}")))?;
        let plaintext = self.open(&envelope, PAYLOAD_TEXT)?;
        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {e}")))
    }

    async fn encrypt_bytes(&self, plaintext: &[u8], vault_id: &VaultId) -> CryptoResult<Vec<u8>> {
        self.seal(plaintext, vault_id, PAYLOAD_BYTES)
    }

    async fn decrypt_bytes(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.open(ciphertext, PAYLOAD_BYTES)
    }
}

#[async_trait]
impl VaultAdmin for LocalVault {
    async fn share_vault(&self, vault_id: &VaultId, member: &UserId) -> CryptoResult<()> {
        if !self
            .keys
            .read()
            .expect("vault key lock poisoned")
            .contains_key(vault_id)
        {
            return Err(CryptoError::UnknownVault(vault_id.to_string()));
        }
        self.members
            .write()
            .expect("vault member lock poisoned")
            .entry(vault_id.clone())
            .or_default()
            .insert(member.clone());
        Ok(())
    }

    async fn revoke_vault(&self, vault_id: &VaultId, member: &UserId) -> CryptoResult<()> {
        if let Some(set) = self
            .members
            .write()
            .expect("vault member lock poisoned")
            .get_mut(vault_id)
        {
            set.remove(member);
        }
        Ok(())
    }
}
