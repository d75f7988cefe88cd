use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::listen::{spawn_watcher, Subscription};
use crate::api::operations;
use crate::api::query::{Query, QuerySnapshot};
use crate::api::snapshot::DocumentSnapshot;
use crate::error::{internal_error, StoreResult};
use crate::remote::datastore::{
    Datastore, HttpDatastore, InMemoryDatastore, TokenProviderArc,
};
use crate::value::{FieldValue, MapValue};

use super::collection::TypedCollection;
use super::converter::DataConverter;
use super::database::Docstore;

/// Executes reads, writes, queries and subscriptions against a datastore.
///
/// The datastore backend is injected at construction; handles and clients
/// carry no process-global state.
#[derive(Clone)]
pub struct StoreClient {
    store: Docstore,
    datastore: Arc<dyn Datastore>,
}

impl StoreClient {
    /// Creates a client backed by the supplied datastore implementation.
    pub fn new(store: Docstore, datastore: Arc<dyn Datastore>) -> Self {
        Self { store, datastore }
    }

    /// Returns a client that stores documents in memory only.
    ///
    /// Useful for tests or demos where network access is not wanted.
    pub fn with_in_memory(store: Docstore) -> Self {
        Self::new(store, Arc::new(InMemoryDatastore::new()))
    }

    /// Builds a client that talks to the store's REST endpoints at `host`
    /// using anonymous credentials.
    pub fn with_http(store: Docstore, host: impl Into<String>) -> StoreResult<Self> {
        let datastore = HttpDatastore::builder(store.database_id().clone())
            .with_host(host)
            .build()?;
        Ok(Self::new(store, Arc::new(datastore)))
    }

    /// Builds an HTTP-backed client that attaches tokens from the provided
    /// provider to every request.
    pub fn with_http_authenticated(
        store: Docstore,
        host: impl Into<String>,
        auth_provider: TokenProviderArc,
    ) -> StoreResult<Self> {
        let datastore = HttpDatastore::builder(store.database_id().clone())
            .with_host(host)
            .with_auth_provider(auth_provider)
            .build()?;
        Ok(Self::new(store, Arc::new(datastore)))
    }

    /// Returns the store handle this client executes against.
    pub fn store(&self) -> &Docstore {
        &self.store
    }

    pub(crate) fn datastore(&self) -> Arc<dyn Datastore> {
        Arc::clone(&self.datastore)
    }

    /// Binds a typed accessor to the collection named `name`.
    pub fn typed_collection<C>(&self, name: &str, converter: C) -> StoreResult<TypedCollection<C>>
    where
        C: DataConverter,
    {
        let collection = self.store.collection(name)?;
        Ok(TypedCollection::new(self.clone(), collection, Arc::new(converter)))
    }

    /// Fetches the document located at `path`.
    ///
    /// Returns a snapshot that may or may not contain data depending on
    /// whether the document exists.
    pub async fn get_doc(&self, path: &str) -> StoreResult<DocumentSnapshot> {
        let key = operations::validate_document_path(path)?;
        self.datastore.get_document(&key).await
    }

    /// Writes the provided map of fields into the document at `path`,
    /// creating it or replacing its previous contents.
    pub async fn set_doc(
        &self,
        path: &str,
        data: BTreeMap<String, FieldValue>,
    ) -> StoreResult<()> {
        let key = operations::validate_document_path(path)?;
        self.datastore.set_document(&key, MapValue::new(data)).await
    }

    /// Applies a partial update to the document located at `path`, only
    /// touching the provided fields.
    ///
    /// # Errors
    /// Returns `docstore/invalid-argument` if `data` is empty and
    /// `docstore/not-found` if the document does not exist.
    pub async fn update_doc(
        &self,
        path: &str,
        data: BTreeMap<String, FieldValue>,
    ) -> StoreResult<()> {
        let key = operations::validate_document_path(path)?;
        let encoded = operations::encode_update_data(data)?;
        self.datastore
            .update_document(&key, encoded.map, encoded.field_paths)
            .await
    }

    /// Deletes the document located at `path`.
    ///
    /// Succeeds even if the document does not exist.
    pub async fn delete_doc(&self, path: &str) -> StoreResult<()> {
        let key = operations::validate_document_path(path)?;
        self.datastore.delete_document(&key).await
    }

    /// Adds a new document with an auto-generated identifier to the
    /// collection at `collection_path` and returns the resulting snapshot.
    pub async fn add_doc(
        &self,
        collection_path: &str,
        data: BTreeMap<String, FieldValue>,
    ) -> StoreResult<DocumentSnapshot> {
        let collection = self.store.collection(collection_path)?;
        let doc_ref = collection.doc(None)?;
        let path = doc_ref.path().canonical_string();
        self.set_doc(&path, data).await?;
        self.get_doc(&path).await
    }

    /// Executes the provided query and returns its results.
    pub async fn get_docs(&self, query: &Query) -> StoreResult<QuerySnapshot> {
        self.ensure_same_database(query.store())?;
        let documents = self.datastore.run_query(query.definition()).await?;
        Ok(QuerySnapshot::new(query.clone(), documents))
    }

    /// Subscribes to the document at `path`.
    ///
    /// Emits the current snapshot immediately, then a fresh snapshot after
    /// every change to the document, until the subscription is dropped.
    pub async fn watch_doc(&self, path: &str) -> StoreResult<Subscription<DocumentSnapshot>> {
        let key = operations::validate_document_path(path)?;
        let changes = self.datastore.changes()?;
        let datastore = Arc::clone(&self.datastore);
        let refresh_key = key.clone();
        spawn_watcher(
            changes,
            move |event| event.key == key,
            move || {
                let datastore = Arc::clone(&datastore);
                let key = refresh_key.clone();
                async move { datastore.get_document(&key).await }
            },
        )
        .await
    }

    /// Subscribes to the provided query.
    ///
    /// Re-executes the query and emits the full snapshot whenever a
    /// document in the targeted collection changes.
    pub async fn watch_docs(&self, query: &Query) -> StoreResult<Subscription<QuerySnapshot>> {
        self.ensure_same_database(query.store())?;
        let changes = self.datastore.changes()?;
        let datastore = Arc::clone(&self.datastore);
        let definition = query.definition().clone();
        let refresh_definition = definition.clone();
        let refresh_query = query.clone();
        spawn_watcher(
            changes,
            move |event| definition.matches_collection(&event.key),
            move || {
                let datastore = Arc::clone(&datastore);
                let definition = refresh_definition.clone();
                let query = refresh_query.clone();
                async move {
                    let documents = datastore.run_query(&definition).await?;
                    Ok(QuerySnapshot::new(query, documents))
                }
            },
        )
        .await
    }

    fn ensure_same_database(&self, store: &Docstore) -> StoreResult<()> {
        if self.store.database_id() != store.database_id() {
            return Err(internal_error(
                "Query targets a different database than this client",
            ));
        }
        Ok(())
    }
}
