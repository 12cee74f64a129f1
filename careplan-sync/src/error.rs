//! Error types for the sync layer.

use crate::local::LocalStoreError;
use careplan_cloud::CloudError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a reconciliation pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local store failed.
    #[error("local store error: {0}")]
    Local(#[from] LocalStoreError),

    /// The cloud layer failed (remote call, decode, integrity).
    #[error("cloud error: {0}")]
    Cloud(#[from] CloudError),

    /// A local event references an activity the local store does not hold.
    #[error("no local activity {0} for event push")]
    ActivityNotFound(careplan_types::ActivityId),

    /// One or more pulled event updates failed. Every update was
    /// attempted; these are the collected failures.
    #[error("{} event update(s) failed", errors.len())]
    EventUpdates {
        /// The per-item failures, in application order.
        errors: Vec<LocalStoreError>,
    },
}
