use std::collections::BTreeMap;

use crate::model::DocumentKey;
use crate::value::{FieldValue, MapValue};

/// Metadata about the provenance of a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotMetadata {
    from_cache: bool,
}

impl SnapshotMetadata {
    pub fn new(from_cache: bool) -> Self {
        Self { from_cache }
    }

    /// Indicates whether the snapshot was served by a local datastore
    /// rather than the remote service.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }
}

/// The state of a single document at read time.
///
/// An absent document is still a snapshot; [`DocumentSnapshot::exists`]
/// distinguishes the two, so "not found" never surfaces as an error on
/// reads.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: Option<MapValue>,
    metadata: SnapshotMetadata,
}

impl DocumentSnapshot {
    pub fn new(key: DocumentKey, data: Option<MapValue>, metadata: SnapshotMetadata) -> Self {
        Self {
            key,
            data,
            metadata,
        }
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// The document fields, if the document exists.
    pub fn data(&self) -> Option<&BTreeMap<String, FieldValue>> {
        self.data.as_ref().map(|map| map.fields())
    }

    pub(crate) fn map_value(&self) -> Option<&MapValue> {
        self.data.as_ref()
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }
}
