//! Shared test harness: a full in-memory sync stack.
#![allow(dead_code)]

use careplan_cloud::{MemoryRemoteDatabase, RemoteStore, UserVaults};
use careplan_sync::{MemoryLocalStore, PassOutcome, SyncEngine, SyncError, SyncObserver};
use careplan_types::{Activity, ActivityKind, Event, EventKey, Schedule, UserId};
use careplan_vault::LocalVault;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct Harness {
    pub db: Arc<MemoryRemoteDatabase>,
    pub local: Arc<MemoryLocalStore>,
    pub remote: Arc<RemoteStore>,
    pub engine: Arc<SyncEngine>,
}

pub fn harness() -> Harness {
    let vault = Arc::new(LocalVault::new());
    let vaults = UserVaults::new(
        vault.create_vault("interventions"),
        vault.create_vault("assessments"),
    );
    let db = Arc::new(MemoryRemoteDatabase::new());
    let remote = Arc::new(RemoteStore::new(
        db.clone(),
        vault,
        vaults,
        UserId::new("patient@example.com"),
    ));
    let local = Arc::new(MemoryLocalStore::new());
    let engine = Arc::new(SyncEngine::new(local.clone(), remote.clone()));
    Harness {
        db,
        local,
        remote,
        engine,
    }
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn activity(id: &str, kind: ActivityKind, modified_secs: Option<i64>) -> Activity {
    let activity = Activity::new(
        id,
        kind,
        Schedule::daily(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 1),
        json!({"title": id}),
    );
    match modified_secs {
        Some(secs) => activity.with_modified_at(ts(secs)),
        None => activity,
    }
}

pub fn event(id: &str, day: u32, occurrence: u32, modified_secs: Option<i64>) -> Event {
    let mut event = Event::new(EventKey::new(id, day, occurrence));
    event.modified_at = modified_secs.map(ts);
    event
}

/// Observer counting completed and failed passes.
#[derive(Default)]
pub struct PassCounter {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl PassCounter {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

impl SyncObserver for PassCounter {
    fn sync_completed(&self, _outcome: &PassOutcome) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn sync_failed(&self, _error: &SyncError) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Lets every spawned task on the current-thread runtime make progress
/// without advancing the (paused) clock.
pub async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}
