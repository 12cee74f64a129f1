//! The reconciliation engine.
//!
//! One call to [`SyncEngine::reconcile`] runs one complete pass: fetch
//! local and cloud state, classify, push the winners to the cloud, then
//! pull the losers into the local store — activities first, then events,
//! strictly sequenced. The engine keeps no state between passes; callers
//! wanting coalescing and periodic re-runs go through
//! [`SyncScheduler`](crate::SyncScheduler).

use crate::error::{SyncError, SyncResult};
use crate::local::LocalStore;
use crate::state::{diff_activities, diff_events};
use careplan_cloud::RemoteStore;
use careplan_types::{ActivityKind, KindFilter, SharingGrant};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Summary of one completed reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Activities pushed to the cloud.
    pub activities_pushed: usize,
    /// Activities inserted, updated or removed locally.
    pub activities_pulled: usize,
    /// Events pushed to the cloud.
    pub events_pushed: usize,
    /// Events applied locally.
    pub events_pulled: usize,
}

impl PassOutcome {
    /// Whether the pass found both sides already consistent.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Delegate notified when a pass finishes.
///
/// Hosts typically rebuild derived insight data in
/// [`sync_completed`](Self::sync_completed).
pub trait SyncObserver: Send + Sync {
    /// A pass completed; `outcome` summarizes what moved.
    fn sync_completed(&self, outcome: &PassOutcome);

    /// A pass failed. Failures are non-fatal; the scheduler retries.
    fn sync_failed(&self, _error: &SyncError) {}
}

/// Reconciles the local store with the encrypted cloud store.
pub struct SyncEngine {
    local: Arc<dyn LocalStore>,
    remote: Arc<RemoteStore>,
    grant: Mutex<Option<SharingGrant>>,
    observer: Mutex<Option<Arc<dyn SyncObserver>>>,
}

impl SyncEngine {
    /// Creates an engine over the two stores.
    pub fn new(local: Arc<dyn LocalStore>, remote: Arc<RemoteStore>) -> Self {
        Self {
            local,
            remote,
            grant: Mutex::new(None),
            observer: Mutex::new(None),
        }
    }

    /// The local store this engine reconciles.
    #[must_use]
    pub fn local_store(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    /// Sets the sharing grant constraining what a pass may fetch.
    ///
    /// `None` means the engine reconciles the user's own data,
    /// unfiltered.
    pub fn set_sharing_grant(&self, grant: Option<SharingGrant>) {
        *self.grant.lock().expect("grant lock poisoned") = grant;
    }

    /// Registers the pass-completion observer.
    pub fn set_observer(&self, observer: Arc<dyn SyncObserver>) {
        *self.observer.lock().expect("observer lock poisoned") = Some(observer);
    }

    fn kind_filter(&self) -> KindFilter {
        match *self.grant.lock().expect("grant lock poisoned") {
            Some(grant) => grant.kind_filter(),
            None => KindFilter::All,
        }
    }

    fn current_observer(&self) -> Option<Arc<dyn SyncObserver>> {
        self.observer.lock().expect("observer lock poisoned").clone()
    }

    /// Runs one reconciliation pass and reports it to the observer.
    pub async fn reconcile(&self) -> SyncResult<PassOutcome> {
        let result = self.run_pass().await;
        let observer = self.current_observer();
        match &result {
            Ok(outcome) => {
                info!(
                    activities_pushed = outcome.activities_pushed,
                    activities_pulled = outcome.activities_pulled,
                    events_pushed = outcome.events_pushed,
                    events_pulled = outcome.events_pulled,
                    "reconciliation pass completed"
                );
                if let Some(observer) = observer {
                    observer.sync_completed(outcome);
                }
            }
            Err(error) => {
                warn!(%error, "reconciliation pass failed");
                if let Some(observer) = observer {
                    observer.sync_failed(error);
                }
            }
        }
        result
    }

    async fn run_pass(&self) -> SyncResult<PassOutcome> {
        let Some(filter) = self.kind_filter().query_filter() else {
            debug!("nothing is shared; skipping reconciliation");
            return Ok(PassOutcome::default());
        };

        let (activities_pushed, activities_pulled) = self.sync_activities(filter).await?;
        let (events_pushed, events_pulled) = self.sync_events(filter).await?;

        Ok(PassOutcome {
            activities_pushed,
            activities_pulled,
            events_pushed,
            events_pulled,
        })
    }

    // ── Activities sub-pass ──────────────────────────────────────

    async fn sync_activities(&self, filter: Option<ActivityKind>) -> SyncResult<(usize, usize)> {
        let local = self.local.activities(filter).await?;
        let cloud = self.remote.fetch_activities(filter).await?;

        let delta = diff_activities(&local, cloud);
        debug!(
            push = delta.push.len(),
            add = delta.add.len(),
            update = delta.update.len(),
            remove = delta.remove.len(),
            "classified activities"
        );

        let pushed = delta.push.len();
        let pulled = delta.add.len() + delta.update.len() + delta.remove.len();

        // Push first; local changes apply only if the cloud accepted ours.
        self.remote.save_activities(&delta.push).await?;
        if delta.has_local_changes() {
            self.local
                .apply_activity_changes(delta.add, delta.update, delta.remove, true)
                .await?;
        }

        Ok((pushed, pulled))
    }

    // ── Events sub-pass ──────────────────────────────────────────

    async fn sync_events(&self, filter: Option<ActivityKind>) -> SyncResult<(usize, usize)> {
        let local = self.local.events(filter).await?;
        let cloud = self.remote.fetch_events(filter).await?;

        let kind_of: HashMap<_, _> = self
            .local
            .activities(filter)
            .await?
            .into_iter()
            .map(|activity| (activity.identifier, activity.kind))
            .collect();

        let delta = diff_events(&local, cloud, &kind_of)?;
        debug!(push = delta.push.len(), pull = delta.pull.len(), "classified events");

        let pushed = delta.push.len();
        let pulled = delta.pull.len();

        self.remote.save_events(&delta.push).await?;

        // Apply pulls one at a time; attempt all, collect the failures.
        let mut errors = Vec::new();
        for event in &delta.pull {
            if let Err(error) = self
                .local
                .apply_event_update(event, event.result.clone(), event.state, true)
                .await
            {
                warn!(key = %event.key, %error, "failed to apply pulled event");
                errors.push(error);
            }
        }
        if !errors.is_empty() {
            return Err(SyncError::EventUpdates { errors });
        }

        Ok((pushed, pulled))
    }
}
