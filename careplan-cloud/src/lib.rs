//! Encrypted remote record store for CarePlan.
//!
//! Care plan data lives in an opaque remote record database. Records pair
//! clear index fields (owning user, activity kind, record name) with a
//! single payload field that is end-to-end encrypted under a per-kind
//! vault. This crate provides:
//!
//! - The record model and the [`RemoteDatabase`] seam ([`record`]), plus an
//!   in-memory implementation ([`MemoryRemoteDatabase`])
//! - Field-level encryption on records ([`encryption`])
//! - The entity ↔ envelope codec with integrity cross-checks ([`codec`])
//! - [`RemoteStore`], the typed fetch/save façade the sync engine uses
//! - The sharing-grant record and its vault-membership workflow ([`share`])
//!
//! Decode failures are never partial: a fetch either yields every entity
//! or fails as a whole, and an envelope failing its integrity cross-check
//! is reported as [`CloudError::Inconsistency`], not silently dropped.

pub mod codec;
pub mod encryption;
mod error;
mod memory;
pub mod record;
pub mod share;
mod store;

pub use codec::{CloudActivity, CloudEvent, RecordCodec, UserVaults};
pub use error::{CloudError, CloudResult};
pub use memory::MemoryRemoteDatabase;
pub use record::{FieldValue, RecordQuery, RemoteDatabase, RemoteRecord, SavePolicy};
pub use share::{DataShare, ShareManager};
pub use store::RemoteStore;
