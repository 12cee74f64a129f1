//! Core type definitions for the CarePlan sync engine.
//!
//! Contains the domain model shared by every other crate:
//!
//! - Identifier newtypes ([`UserId`], [`ActivityId`], [`RecordName`])
//! - The care plan model ([`Activity`], [`Schedule`], [`Event`])
//! - The sharing grant consumed by the sync engine as a read-only
//!   fetch filter ([`SharingGrant`], [`KindFilter`])
//!
//! Modification timestamps on activities live in the extensible
//! `user_info` metadata map rather than as a first-class field, mirroring
//! how the local store persists them.

mod activity;
mod event;
mod grant;
mod ids;

pub use activity::{Activity, ActivityKind, Schedule, MODIFIED_AT_KEY};
pub use event::{CompletionState, Event, EventKey, EventResult};
pub use grant::{KindFilter, SharingGrant};
pub use ids::{ActivityId, RecordName, UserId};
