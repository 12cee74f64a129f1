//! Two-way encrypted cloud sync engine for CarePlan.
//!
//! Reconciles the device-local care plan store with the user's encrypted
//! cloud records using last-writer-wins on per-record modification
//! timestamps.
//!
//! # Architecture
//!
//! - **LocalStore**: seam over the device-local store, with a change
//!   notification stream
//! - **State**: pure merge classification into push/pull buckets
//! - **Engine**: one reconciliation pass — fetch, diff, push, pull —
//!   activities first, then events
//! - **Scheduler**: single-pass coalescing, the pending timer, and the
//!   host-facing enable/disable/trigger API
//!
//! # Reconciliation pass
//!
//! 1. Fetch local entities and cloud envelopes (filtered by the sharing
//!    grant, if any)
//! 2. Match each cloud record to at most one local entity and compare
//!    modification timestamps
//! 3. Push local winners as one batched remote save
//! 4. Pull cloud winners into the local store, flagged as cloud-origin so
//!    the resulting notifications do not re-trigger a pass
//!
//! Passes are idempotent: rerunning after a completed pass with no new
//! mutations moves nothing in either direction.
//!
//! # Example
//!
//! ```
//! use careplan_sync::{MemoryLocalStore, SyncConfig, SyncEngine, SyncScheduler};
//! use careplan_cloud::{MemoryRemoteDatabase, RemoteStore, UserVaults};
//! use careplan_types::UserId;
//! use careplan_vault::LocalVault;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let vault = Arc::new(LocalVault::new());
//! let vaults = UserVaults::new(
//!     vault.create_vault("interventions"),
//!     vault.create_vault("assessments"),
//! );
//! let remote = Arc::new(RemoteStore::new(
//!     Arc::new(MemoryRemoteDatabase::new()),
//!     vault,
//!     vaults,
//!     UserId::new("patient@example.com"),
//! ));
//! let local = Arc::new(MemoryLocalStore::new());
//!
//! let engine = Arc::new(SyncEngine::new(local, remote));
//! let scheduler = SyncScheduler::new(engine, SyncConfig::default());
//! scheduler.enable_sync();
//! # scheduler.disable_sync();
//! # }
//! ```

mod engine;
mod error;
pub mod local;
mod scheduler;
pub mod state;

pub use engine::{PassOutcome, SyncEngine, SyncObserver};
pub use error::{SyncError, SyncResult};
pub use local::{
    LocalStore, LocalStoreError, MemoryLocalStore, StoreChange, StoreChangeKind, StoreResult,
};
pub use scheduler::{SyncConfig, SyncScheduler};
pub use state::{diff_activities, diff_events, ActivityDelta, EventDelta};
