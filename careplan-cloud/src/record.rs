//! The remote record model and database seam.
//!
//! A [`RemoteRecord`] is the wire-level unit the remote database stores: a
//! record type, a stable record name, and a map of named field values.
//! The database itself is opaque; the engine only needs equality-filtered
//! queries over a record type and atomic batched writes.

use crate::error::CloudResult;
use async_trait::async_trait;
use careplan_types::RecordName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field value on a remote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Signed integer.
    Integer(i64),
}

impl FieldValue {
    /// Returns the text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the byte content, if this is a byte value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// A record in the remote database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    record_type: String,
    record_name: RecordName,
    fields: BTreeMap<String, FieldValue>,
}

impl RemoteRecord {
    /// Creates an empty record of the given type and name.
    pub fn new(record_type: impl Into<String>, record_name: RecordName) -> Self {
        Self {
            record_type: record_type.into(),
            record_name,
            fields: BTreeMap::new(),
        }
    }

    /// The record's type.
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// The record's stable name.
    #[must_use]
    pub fn record_name(&self) -> &RecordName {
        &self.record_name
    }

    /// Returns a field value by name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Sets a field value, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }

    /// Iterates over all fields.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// How a batched save treats fields already present on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SavePolicy {
    /// Replace the stored record wholesale, dropping fields the incoming
    /// record does not carry.
    #[default]
    ReplaceAllFields,
    /// Merge the incoming fields into the stored record.
    MergeChangedFields,
}

/// An equality-filtered query over one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    record_type: String,
    filters: Vec<(String, FieldValue)>,
}

impl RecordQuery {
    /// Queries all records of a type.
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            filters: Vec::new(),
        }
    }

    /// Adds an equality filter on a field.
    #[must_use]
    pub fn filter_eq(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.filters.push((field.into(), value));
        self
    }

    /// The record type this query targets.
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Whether `record` satisfies every filter.
    #[must_use]
    pub fn matches(&self, record: &RemoteRecord) -> bool {
        record.record_type() == self.record_type
            && self
                .filters
                .iter()
                .all(|(field, value)| record.get(field) == Some(value))
    }
}

/// The opaque remote database seam.
///
/// Batched saves are atomic: either every record in the batch is written
/// or none is.
#[async_trait]
pub trait RemoteDatabase: Send + Sync {
    /// Runs an equality-filtered query.
    async fn query(&self, query: &RecordQuery) -> CloudResult<Vec<RemoteRecord>>;

    /// Writes a batch of records atomically under the given save policy.
    async fn save_records(&self, records: Vec<RemoteRecord>, policy: SavePolicy)
        -> CloudResult<()>;

    /// Deletes a record by type and name. Deleting a missing record is a
    /// no-op.
    async fn delete_record(&self, record_type: &str, name: &RecordName) -> CloudResult<()>;
}
