//! Pass scheduling, coalescing and the host-facing sync API.
//!
//! At most one reconciliation pass runs at a time. Requests arriving while
//! a pass is in flight do not queue individually; they collapse into a
//! single "run again" flag consumed when the pass completes. The scheduler
//! also owns the single pending timer and the subscription to local-store
//! change notifications (cloud-origin notifications are ignored to break
//! the feedback loop).

use crate::engine::SyncEngine;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Configuration for the sync scheduler.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between a completed pass and the next scheduled one.
    pub sync_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(15),
        }
    }
}

#[derive(Default)]
struct PassFlags {
    /// A pass is currently in flight.
    is_syncing: bool,
    /// A trigger arrived while a pass was in flight.
    sync_again: bool,
}

#[derive(Default)]
struct Tasks {
    timer: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
    periodic: bool,
}

/// Owns the pending timer and the pass-coalescing flags.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    config: SyncConfig,
    flags: Mutex<PassFlags>,
    tasks: Mutex<Tasks>,
}

impl SyncScheduler {
    /// Creates a scheduler driving the given engine.
    pub fn new(engine: Arc<SyncEngine>, config: SyncConfig) -> Arc<Self> {
        Arc::new(Self {
            engine,
            config,
            flags: Mutex::new(PassFlags::default()),
            tasks: Mutex::new(Tasks::default()),
        })
    }

    /// The engine this scheduler drives.
    #[must_use]
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    // ── Host-facing API ──────────────────────────────────────────

    /// Enables sync: starts listening to local changes, enables periodic
    /// re-arming, and triggers an immediate pass.
    pub fn enable_sync(self: &Arc<Self>) {
        self.tasks.lock().expect("task lock poisoned").periodic = true;
        self.start_listener();
        self.schedule();
        self.request_sync_now();
    }

    /// Disables sync. An in-flight pass completes but will not re-arm,
    /// and local changes no longer trigger passes.
    pub fn disable_sync(&self) {
        self.unschedule();
        if let Some(listener) = self
            .tasks
            .lock()
            .expect("task lock poisoned")
            .listener
            .take()
        {
            listener.abort();
        }
    }

    /// Requests an immediate pass, subject to coalescing: if a pass is in
    /// flight, this collapses into a single re-run after it completes.
    pub fn request_sync_now(self: &Arc<Self>) {
        {
            let mut flags = self.flags.lock().expect("flag lock poisoned");
            if flags.is_syncing {
                flags.sync_again = true;
                debug!("pass in flight; coalescing trigger");
                return;
            }
            flags.is_syncing = true;
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_pass().await;
        });
    }

    // ── Timer ────────────────────────────────────────────────────

    /// Cancels any pending timer and arms a new one. Only one timer is
    /// ever pending.
    pub fn schedule(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().expect("task lock poisoned");
        if let Some(timer) = tasks.timer.take() {
            timer.abort();
        }

        let weak = Arc::downgrade(self);
        let interval = self.config.sync_interval;
        tasks.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(scheduler) = weak.upgrade() {
                scheduler.tasks.lock().expect("task lock poisoned").timer = None;
                scheduler.request_sync_now();
            }
        }));
    }

    /// Cancels the pending timer and disables periodic re-arming.
    pub fn unschedule(&self) {
        let mut tasks = self.tasks.lock().expect("task lock poisoned");
        tasks.periodic = false;
        if let Some(timer) = tasks.timer.take() {
            timer.abort();
        }
    }

    fn is_periodic(&self) -> bool {
        self.tasks.lock().expect("task lock poisoned").periodic
    }

    // ── Pass lifecycle ───────────────────────────────────────────

    async fn run_pass(self: Arc<Self>) {
        // Errors are logged and reported to the observer by the engine;
        // the scheduler only cares that the pass is over.
        let _ = self.engine.reconcile().await;

        let run_again = {
            let mut flags = self.flags.lock().expect("flag lock poisoned");
            flags.is_syncing = false;
            std::mem::take(&mut flags.sync_again)
        };

        if run_again || self.is_periodic() {
            self.schedule();
        }
    }

    // ── Change notifications ─────────────────────────────────────

    fn start_listener(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().expect("task lock poisoned");
        if tasks.listener.is_some() {
            return;
        }

        let mut changes = self.engine.local_store().subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);
        tasks.listener = Some(tokio::spawn(async move {
            loop {
                let trigger = match changes.recv().await {
                    // Cloud-origin writes must not re-trigger a pass.
                    Ok(change) => !change.from_cloud,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "change notifications lagged");
                        true
                    }
                    Err(RecvError::Closed) => break,
                };
                if trigger {
                    match weak.upgrade() {
                        Some(scheduler) => scheduler.request_sync_now(),
                        None => break,
                    }
                }
            }
        }));
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        let mut tasks = self.tasks.lock().expect("task lock poisoned");
        if let Some(timer) = tasks.timer.take() {
            timer.abort();
        }
        if let Some(listener) = tasks.listener.take() {
            listener.abort();
        }
    }
}
