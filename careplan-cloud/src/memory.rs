//! In-memory remote database.
//!
//! Backs tests and local development. Batched saves take the write lock
//! once, so a batch is atomic with respect to concurrent queries.

use crate::error::CloudResult;
use crate::record::{RecordQuery, RemoteDatabase, RemoteRecord, SavePolicy};
use async_trait::async_trait;
use careplan_types::RecordName;
use std::collections::BTreeMap;
use std::sync::RwLock;

type RecordKey = (String, String);

/// An in-memory [`RemoteDatabase`].
#[derive(Default)]
pub struct MemoryRemoteDatabase {
    records: RwLock<BTreeMap<RecordKey, RemoteRecord>>,
}

impl MemoryRemoteDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, across all types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().expect("record lock poisoned").len()
    }

    /// Whether the database holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches one record by type and name.
    #[must_use]
    pub fn record(&self, record_type: &str, name: &RecordName) -> Option<RemoteRecord> {
        self.records
            .read()
            .expect("record lock poisoned")
            .get(&(record_type.to_string(), name.as_str().to_string()))
            .cloned()
    }

    fn key(record: &RemoteRecord) -> RecordKey {
        (
            record.record_type().to_string(),
            record.record_name().as_str().to_string(),
        )
    }
}

#[async_trait]
impl RemoteDatabase for MemoryRemoteDatabase {
    async fn query(&self, query: &RecordQuery) -> CloudResult<Vec<RemoteRecord>> {
        let records = self.records.read().expect("record lock poisoned");
        Ok(records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    async fn save_records(
        &self,
        records: Vec<RemoteRecord>,
        policy: SavePolicy,
    ) -> CloudResult<()> {
        let mut stored = self.records.write().expect("record lock poisoned");
        for record in records {
            let key = Self::key(&record);
            match policy {
                SavePolicy::ReplaceAllFields => {
                    stored.insert(key, record);
                }
                SavePolicy::MergeChangedFields => {
                    match stored.get_mut(&key) {
                        Some(existing) => {
                            for (field, value) in record.fields() {
                                existing.set(field, value.clone());
                            }
                        }
                        None => {
                            stored.insert(key, record);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete_record(&self, record_type: &str, name: &RecordName) -> CloudResult<()> {
        self.records
            .write()
            .expect("record lock poisoned")
            .remove(&(record_type.to_string(), name.as_str().to_string()));
        Ok(())
    }
}
