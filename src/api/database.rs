use std::sync::Arc;

use crate::error::StoreResult;
use crate::model::{DatabaseId, ResourcePath};

use super::query::Query;
use super::reference::{CollectionReference, DocumentReference};

/// A cheap, cloneable handle to one logical database.
///
/// Handles carry only addressing state; the transport lives in
/// [`StoreClient`](super::client::StoreClient) and is injected there at
/// construction, so independent handles and fake backends can coexist in
/// one process.
#[derive(Clone, Debug)]
pub struct Docstore {
    inner: Arc<DocstoreInner>,
}

#[derive(Debug)]
struct DocstoreInner {
    database_id: DatabaseId,
}

impl Docstore {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            inner: Arc::new(DocstoreInner { database_id }),
        }
    }

    /// The fully qualified database identifier (project + database name).
    pub fn database_id(&self) -> &DatabaseId {
        &self.inner.database_id
    }

    pub fn project_id(&self) -> &str {
        self.inner.database_id.project_id()
    }

    pub fn database(&self) -> &str {
        self.inner.database_id.database()
    }

    /// Creates a `CollectionReference` pointing at `path`.
    ///
    /// The path is interpreted relative to the database root using forward
    /// slashes to separate segments (e.g. `"orders/a17/items"`).
    pub fn collection(&self, path: &str) -> StoreResult<CollectionReference> {
        let resource = ResourcePath::from_string(path)?;
        CollectionReference::new(self.clone(), resource)
    }

    /// Creates a `DocumentReference` pointing at `path`.
    ///
    /// The path must contain an even number of segments (collection/doc
    /// pairs).
    pub fn doc(&self, path: &str) -> StoreResult<DocumentReference> {
        let resource = ResourcePath::from_string(path)?;
        DocumentReference::new(self.clone(), resource)
    }

    /// Creates a query targeting the collection at `path`.
    pub fn query(&self, path: &str) -> StoreResult<Query> {
        let resource = ResourcePath::from_string(path)?;
        Query::new(self.clone(), resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_exposes_addressing() {
        let store = Docstore::new(DatabaseId::new("demo", "analytics"));
        assert_eq!(store.project_id(), "demo");
        assert_eq!(store.database(), "analytics");
    }

    #[test]
    fn independent_handles_coexist() {
        let first = Docstore::new(DatabaseId::default("one"));
        let second = Docstore::new(DatabaseId::default("two"));
        assert_ne!(first.database_id(), second.database_id());
    }
}
