//! Vault encryption boundary for CarePlan.
//!
//! A *vault* is an opaque encryption context identified by a [`VaultId`].
//! Anything encrypted under a vault can be decrypted by any principal with
//! access to that vault; ciphertexts are self-describing, so decryption
//! does not take a vault ID.
//!
//! Consumers depend on `Arc<dyn Vault>` and never see key material. The
//! in-process [`LocalVault`] implementation backs tests and local
//! development; production deployments plug in a remote vault service
//! behind the same trait.

mod error;
mod local;
mod vault;

pub use error::{CryptoError, CryptoResult};
pub use local::LocalVault;
pub use vault::{Vault, VaultAdmin, VaultId};
