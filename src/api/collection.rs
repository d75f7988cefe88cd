use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::listen::{spawn_watcher, Subscription};
use crate::api::query::{Cursor, FieldFilter, OrderBy, OrderDirection, Query};
use crate::api::snapshot::DocumentSnapshot;
use crate::error::StoreResult;
use crate::model::{IntoFieldPath, Timestamp};
use crate::value::FieldValue;

use super::client::StoreClient;
use super::converter::DataConverter;
use super::reference::CollectionReference;

/// A typed accessor bound to one collection.
///
/// All reads decode through the accessor's converter and all full-document
/// writes encode through it; only partial patches take raw field maps.
/// The accessor holds no per-call state and is meant to be constructed
/// once per collection and reused.
pub struct TypedCollection<C>
where
    C: DataConverter,
{
    client: StoreClient,
    collection: CollectionReference,
    converter: Arc<C>,
}

impl<C> Clone for TypedCollection<C>
where
    C: DataConverter,
{
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            collection: self.collection.clone(),
            converter: Arc::clone(&self.converter),
        }
    }
}

impl<C> TypedCollection<C>
where
    C: DataConverter,
{
    pub(crate) fn new(
        client: StoreClient,
        collection: CollectionReference,
        converter: Arc<C>,
    ) -> Self {
        Self {
            client,
            collection,
            converter,
        }
    }

    /// The collection identifier this accessor is bound to.
    pub fn id(&self) -> &str {
        self.collection.id()
    }

    fn document_path(&self, id: &str) -> StoreResult<String> {
        let doc_ref = self.collection.doc(Some(id))?;
        Ok(doc_ref.path().canonical_string())
    }

    fn decode_snapshot(&self, snapshot: &DocumentSnapshot) -> StoreResult<Option<C::Model>> {
        match snapshot.map_value() {
            Some(fields) => Ok(Some(self.converter.decode(snapshot.id(), fields)?)),
            None => Ok(None),
        }
    }

    fn decode_documents(&self, documents: &[DocumentSnapshot]) -> StoreResult<Vec<C::Model>> {
        documents
            .iter()
            .filter_map(|snapshot| {
                snapshot
                    .map_value()
                    .map(|fields| self.converter.decode(snapshot.id(), fields))
            })
            .collect()
    }

    fn build_query(
        &self,
        filters: Vec<FieldFilter>,
        orderings: Vec<OrderBy>,
        limit: Option<u32>,
        cursor: Option<Cursor>,
    ) -> StoreResult<Query> {
        let mut query = self.collection.query();
        for filter in filters {
            query = query.filter(filter);
        }
        for order in orderings {
            query = query.order_by(order.field(), order.direction())?;
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        if let Some(cursor) = cursor {
            query = query.with_cursor(cursor);
        }
        Ok(query)
    }

    async fn subscribe_decoded(
        &self,
        query: Query,
    ) -> StoreResult<Subscription<Vec<C::Model>>> {
        let datastore = self.client.datastore();
        let changes = datastore.changes()?;
        let definition = query.definition().clone();
        let refresh_definition = definition.clone();
        let converter = Arc::clone(&self.converter);
        spawn_watcher(
            changes,
            move |event| definition.matches_collection(&event.key),
            move || {
                let datastore = Arc::clone(&datastore);
                let definition = refresh_definition.clone();
                let converter = Arc::clone(&converter);
                async move {
                    let documents = datastore.run_query(&definition).await?;
                    documents
                        .iter()
                        .filter_map(|snapshot| {
                            snapshot
                                .map_value()
                                .map(|fields| converter.decode(snapshot.id(), fields))
                        })
                        .collect()
                }
            },
        )
        .await
    }

    /// Fetches one record by identifier.
    ///
    /// An absent document is `Ok(None)`, never an error.
    pub async fn get_single(&self, id: &str) -> StoreResult<Option<C::Model>> {
        let path = self.document_path(id)?;
        let snapshot = self.client.get_doc(&path).await?;
        self.decode_snapshot(&snapshot)
    }

    /// Subscribes to one record by identifier.
    ///
    /// Emits the current record-or-absent state immediately, then again
    /// after every change to the document, until the subscription is
    /// dropped.
    pub async fn subscribe_single(
        &self,
        id: &str,
    ) -> StoreResult<Subscription<Option<C::Model>>> {
        let path = self.document_path(id)?;
        let key = crate::api::operations::validate_document_path(&path)?;
        let datastore = self.client.datastore();
        let changes = datastore.changes()?;
        let converter = Arc::clone(&self.converter);
        let refresh_key = key.clone();
        spawn_watcher(
            changes,
            move |event| event.key == key,
            move || {
                let datastore = Arc::clone(&datastore);
                let converter = Arc::clone(&converter);
                let key = refresh_key.clone();
                async move {
                    let snapshot = datastore.get_document(&key).await?;
                    match snapshot.map_value() {
                        Some(fields) => Ok(Some(converter.decode(snapshot.id(), fields)?)),
                        None => Ok(None),
                    }
                }
            },
        )
        .await
    }

    /// Returns every record in the collection in the store's default
    /// (identifier) order.
    pub async fn list_all(&self) -> StoreResult<Vec<C::Model>> {
        self.query(Vec::new(), Vec::new(), None, None).await
    }

    /// Subscribes to the whole collection, emitting the full snapshot each
    /// time any document in it changes.
    pub async fn subscribe_all(&self) -> StoreResult<Subscription<Vec<C::Model>>> {
        self.subscribe_query(Vec::new(), Vec::new(), None, None).await
    }

    /// Runs a one-shot query.
    ///
    /// Filters apply conjunctively, orderings in the given sequence, then
    /// the optional result cap. The cursor is honored only when at least
    /// one ordering is present; without an ordering it is dropped with a
    /// logged diagnostic and the query runs as if no cursor was given.
    pub async fn query(
        &self,
        filters: Vec<FieldFilter>,
        orderings: Vec<OrderBy>,
        limit: Option<u32>,
        cursor: Option<Cursor>,
    ) -> StoreResult<Vec<C::Model>> {
        let query = self.build_query(filters, orderings, limit, cursor)?;
        let snapshot = self.client.get_docs(&query).await?;
        self.decode_documents(snapshot.documents())
    }

    /// Live form of [`TypedCollection::query`]: the same construction, but
    /// the result is re-evaluated and re-emitted on every change in the
    /// collection.
    pub async fn subscribe_query(
        &self,
        filters: Vec<FieldFilter>,
        orderings: Vec<OrderBy>,
        limit: Option<u32>,
        cursor: Option<Cursor>,
    ) -> StoreResult<Subscription<Vec<C::Model>>> {
        let query = self.build_query(filters, orderings, limit, cursor)?;
        self.subscribe_decoded(query).await
    }

    /// Convenience query over a time window: ascending on `order_field`,
    /// starting at `from` and ending at `to` (both inclusive), with
    /// `extra_filters` applied conjunctively.
    pub async fn list_by_date_range(
        &self,
        order_field: impl IntoFieldPath,
        from: Timestamp,
        to: Timestamp,
        extra_filters: Vec<FieldFilter>,
    ) -> StoreResult<Vec<C::Model>> {
        let mut query = self.collection.query();
        for filter in extra_filters {
            query = query.filter(filter);
        }
        let query = query
            .order_by(order_field, OrderDirection::Ascending)?
            .start_at(vec![FieldValue::from_timestamp(from)])
            .end_at(vec![FieldValue::from_timestamp(to)]);
        let snapshot = self.client.get_docs(&query).await?;
        self.decode_documents(snapshot.documents())
    }

    /// Live time-window query, newest first.
    ///
    /// Orders descending on `field`; because the traversal is descending,
    /// the upper value `to` is the start bound and the lower value `from`
    /// the end bound. The window itself matches the ascending variant.
    pub async fn subscribe_by_date_range(
        &self,
        field: impl IntoFieldPath,
        from: Timestamp,
        to: Timestamp,
        extra_filters: Vec<FieldFilter>,
    ) -> StoreResult<Subscription<Vec<C::Model>>> {
        let mut query = self.collection.query();
        for filter in extra_filters {
            query = query.filter(filter);
        }
        let query = query
            .order_by(field, OrderDirection::Descending)?
            .start_at(vec![FieldValue::from_timestamp(to)])
            .end_at(vec![FieldValue::from_timestamp(from)]);
        self.subscribe_decoded(query).await
    }

    /// Encodes `value` through the converter and writes it.
    ///
    /// With an explicit `id` the document is created or overwritten at
    /// that identifier; otherwise the store assigns one. Returns the
    /// identifier the record ended up under.
    pub async fn create(&self, value: &C::Model, id: Option<&str>) -> StoreResult<String> {
        let doc_ref = self.collection.doc(id)?;
        let fields = self.converter.encode(value)?;
        let path = doc_ref.path().canonical_string();
        self.client.set_doc(&path, fields).await?;
        Ok(doc_ref.id().to_string())
    }

    /// Partial-merge update of the fields in `patch`.
    ///
    /// Fails with `docstore/not-found` if the document does not exist.
    pub async fn update(
        &self,
        id: &str,
        patch: BTreeMap<String, FieldValue>,
    ) -> StoreResult<()> {
        let path = self.document_path(id)?;
        self.client.update_doc(&path, patch).await
    }

    /// Removes the record at `id`; succeeds even when already absent.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let path = self.document_path(id)?;
        self.client.delete_doc(&path).await
    }
}
