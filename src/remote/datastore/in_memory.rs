use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::operations::{set_value_at_field_path, value_for_field_path};
use crate::api::query::{Bound, FieldFilter, OrderBy, OrderDirection, QueryDefinition};
use crate::api::{DocumentSnapshot, SnapshotMetadata};
use crate::error::{internal_error, not_found, StoreResult};
use crate::model::{DocumentKey, FieldPath};
use crate::value::{ArrayValue, FieldValue, MapValue, ValueKind};

use super::{ChangeEvent, Datastore};

/// A datastore keeping every document in process memory.
///
/// Evaluates filters, ordering, cursor bounds and limits locally and
/// feeds registered change receivers after every successful write, so
/// subscriptions behave as they do against the real service. Used by
/// tests and demos.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    documents: Arc<Mutex<BTreeMap<String, MapValue>>>,
    watchers: Arc<Mutex<Vec<async_channel::Sender<ChangeEvent>>>>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_set(&self, key: &DocumentKey, data: MapValue) {
        let mut store = self.documents.lock().unwrap();
        store.insert(key.path().canonical_string(), data);
    }

    fn apply_update(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: &[FieldPath],
    ) -> StoreResult<()> {
        let mut store = self.documents.lock().unwrap();
        let canonical = key.path().canonical_string();
        let current = store
            .get(&canonical)
            .cloned()
            .ok_or_else(|| not_found(format!("Document {canonical} does not exist")))?;

        let mut fields = current.into_fields();
        for path in field_paths {
            let value = value_for_field_path(&data, path).ok_or_else(|| {
                internal_error(format!(
                    "Failed to resolve value for update path {}",
                    path.canonical_string()
                ))
            })?;
            set_value_at_field_path(&mut fields, path, value);
        }

        store.insert(canonical, MapValue::new(fields));
        Ok(())
    }

    fn apply_delete(&self, key: &DocumentKey) {
        let mut store = self.documents.lock().unwrap();
        store.remove(&key.path().canonical_string());
    }

    fn notify(&self, key: &DocumentKey) {
        let mut watchers = self.watchers.lock().unwrap();
        watchers.retain(|sender| {
            sender
                .try_send(ChangeEvent { key: key.clone() })
                .is_ok()
        });
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn get_document(&self, key: &DocumentKey) -> StoreResult<DocumentSnapshot> {
        let store = self.documents.lock().unwrap();
        let data = store.get(&key.path().canonical_string()).cloned();
        Ok(DocumentSnapshot::new(
            key.clone(),
            data,
            SnapshotMetadata::new(true),
        ))
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> StoreResult<()> {
        self.apply_set(key, data);
        self.notify(key);
        Ok(())
    }

    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> StoreResult<()> {
        self.apply_update(key, data, &field_paths)?;
        self.notify(key);
        Ok(())
    }

    async fn delete_document(&self, key: &DocumentKey) -> StoreResult<()> {
        self.apply_delete(key);
        self.notify(key);
        Ok(())
    }

    async fn run_query(&self, query: &QueryDefinition) -> StoreResult<Vec<DocumentSnapshot>> {
        let store = self.documents.lock().unwrap();
        let mut documents = Vec::new();

        for (path, data) in store.iter() {
            let key = DocumentKey::from_string(path)?;
            if !query.matches_collection(&key) {
                continue;
            }

            let snapshot =
                DocumentSnapshot::new(key, Some(data.clone()), SnapshotMetadata::new(true));

            if document_satisfies_filters(&snapshot, query.filters()) {
                documents.push(snapshot);
            }
        }

        documents.sort_by(|left, right| compare_snapshots(left, right, query.order_by()));

        if let Some(bound) = query.start_at() {
            documents.retain(|snapshot| !is_before_start_bound(snapshot, bound, query.order_by()));
        }

        if let Some(bound) = query.end_at() {
            documents.retain(|snapshot| !is_after_end_bound(snapshot, bound, query.order_by()));
        }

        if let Some(limit) = query.limit() {
            documents.truncate(limit as usize);
        }

        Ok(documents)
    }

    fn changes(&self) -> StoreResult<async_channel::Receiver<ChangeEvent>> {
        let (sender, receiver) = async_channel::unbounded();
        self.watchers.lock().unwrap().push(sender);
        Ok(receiver)
    }
}

fn document_satisfies_filters(snapshot: &DocumentSnapshot, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|filter| {
        match get_field_value(snapshot, filter.field()) {
            Some(value) => evaluate_filter(filter, &value),
            // A missing field matches nothing, not even is-null.
            None => false,
        }
    })
}

fn evaluate_filter(filter: &FieldFilter, value: &FieldValue) -> bool {
    match filter {
        FieldFilter::Equal { value: operand, .. } => value == operand,
        FieldFilter::LessThan { value: operand, .. } => {
            compare_values(value, operand) == Some(Ordering::Less)
        }
        FieldFilter::LessThanOrEqual { value: operand, .. } => matches!(
            compare_values(value, operand),
            Some(Ordering::Less) | Some(Ordering::Equal)
        ),
        FieldFilter::GreaterThan { value: operand, .. } => {
            compare_values(value, operand) == Some(Ordering::Greater)
        }
        FieldFilter::GreaterThanOrEqual { value: operand, .. } => matches!(
            compare_values(value, operand),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
        FieldFilter::ArrayContains { value: operand, .. } => match value.kind() {
            ValueKind::Array(array) => array_contains(array, operand),
            _ => false,
        },
        FieldFilter::ArrayContainsAny { values, .. } => match value.kind() {
            ValueKind::Array(array) => values.iter().any(|needle| array_contains(array, needle)),
            _ => false,
        },
        FieldFilter::InSet { values, .. } => values.iter().any(|needle| needle == value),
        FieldFilter::IsNull { .. } => matches!(value.kind(), ValueKind::Null),
    }
}

fn get_field_value(snapshot: &DocumentSnapshot, field: &FieldPath) -> Option<FieldValue> {
    let map = snapshot.map_value()?;
    value_for_field_path(map, field)
}

fn compare_snapshots(
    left: &DocumentSnapshot,
    right: &DocumentSnapshot,
    order_by: &[OrderBy],
) -> Ordering {
    for order in order_by {
        let left_value = get_field_value(left, order.field()).unwrap_or_else(FieldValue::null);
        let right_value = get_field_value(right, order.field()).unwrap_or_else(FieldValue::null);

        let mut ordering = compare_values(&left_value, &right_value).unwrap_or(Ordering::Equal);
        if order.direction() == OrderDirection::Descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(left: &FieldValue, right: &FieldValue) -> Option<Ordering> {
    match (left.kind(), right.kind()) {
        (ValueKind::Null, ValueKind::Null) => Some(Ordering::Equal),
        (ValueKind::Boolean(a), ValueKind::Boolean(b)) => Some(a.cmp(b)),
        (ValueKind::Integer(a), ValueKind::Integer(b)) => Some(a.cmp(b)),
        (ValueKind::Double(a), ValueKind::Double(b)) => a.partial_cmp(b),
        (ValueKind::Integer(a), ValueKind::Double(b)) => (*a as f64).partial_cmp(b),
        (ValueKind::Double(a), ValueKind::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (ValueKind::Timestamp(a), ValueKind::Timestamp(b)) => Some(a.cmp(b)),
        (ValueKind::String(a), ValueKind::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn array_contains(array: &ArrayValue, needle: &FieldValue) -> bool {
    array.values().iter().any(|candidate| candidate == needle)
}

fn is_before_start_bound(snapshot: &DocumentSnapshot, bound: &Bound, order_by: &[OrderBy]) -> bool {
    let ordering = compare_snapshot_to_bound(snapshot, bound, order_by);
    if bound.inclusive() {
        ordering == Ordering::Less
    } else {
        ordering != Ordering::Greater
    }
}

fn is_after_end_bound(snapshot: &DocumentSnapshot, bound: &Bound, order_by: &[OrderBy]) -> bool {
    let ordering = compare_snapshot_to_bound(snapshot, bound, order_by);
    if bound.inclusive() {
        ordering == Ordering::Greater
    } else {
        ordering != Ordering::Less
    }
}

fn compare_snapshot_to_bound(
    snapshot: &DocumentSnapshot,
    bound: &Bound,
    order_by: &[OrderBy],
) -> Ordering {
    for (index, order) in order_by.iter().enumerate() {
        if index >= bound.values().len() {
            break;
        }

        let bound_value = &bound.values()[index];
        let snapshot_value =
            get_field_value(snapshot, order.field()).unwrap_or_else(FieldValue::null);

        let mut ordering =
            compare_values(&snapshot_value, bound_value).unwrap_or(Ordering::Equal);
        if order.direction() == OrderDirection::Descending {
            ordering = ordering.reverse();
        }

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    fn doc_with_field(key: &str, field: &str, value: FieldValue) -> (DocumentKey, MapValue) {
        let mut map = BTreeMap::new();
        map.insert(field.to_string(), value);
        (DocumentKey::from_string(key).unwrap(), MapValue::new(map))
    }

    async fn seed(datastore: &InMemoryDatastore, docs: Vec<(DocumentKey, MapValue)>) {
        for (key, data) in docs {
            datastore.set_document(&key, data).await.unwrap();
        }
    }

    fn definition(query: crate::api::Query) -> QueryDefinition {
        query.definition().clone()
    }

    fn store() -> crate::api::Docstore {
        crate::api::Docstore::new(crate::model::DatabaseId::default("in-memory-tests"))
    }

    #[tokio::test]
    async fn in_memory_get_set() {
        let datastore = InMemoryDatastore::new();
        let (key, data) = doc_with_field("orders/a", "name", FieldValue::from_string("A"));
        datastore.set_document(&key, data).await.unwrap();
        let snapshot = datastore.get_document(&key).await.unwrap();
        assert!(snapshot.exists());
        assert_eq!(
            snapshot.data().unwrap().get("name"),
            Some(&FieldValue::from_string("A"))
        );
    }

    #[tokio::test]
    async fn range_filters_and_ordering() {
        let datastore = InMemoryDatastore::new();
        seed(
            &datastore,
            vec![
                doc_with_field("orders/a", "total", FieldValue::from_integer(10)),
                doc_with_field("orders/b", "total", FieldValue::from_integer(30)),
                doc_with_field("orders/c", "total", FieldValue::from_integer(20)),
            ],
        )
        .await;

        let query = store()
            .collection("orders")
            .unwrap()
            .query()
            .filter(
                FieldFilter::greater_than_or_equal("total", FieldValue::from_integer(20)).unwrap(),
            )
            .order_by("total", OrderDirection::Descending)
            .unwrap();

        let documents = datastore.run_query(&definition(query)).await.unwrap();
        let ids: Vec<_> = documents.iter().map(|doc| doc.id()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn cursor_bounds_trim_ordered_results() {
        let datastore = InMemoryDatastore::new();
        seed(
            &datastore,
            vec![
                doc_with_field("orders/a", "total", FieldValue::from_integer(10)),
                doc_with_field("orders/b", "total", FieldValue::from_integer(20)),
                doc_with_field("orders/c", "total", FieldValue::from_integer(30)),
                doc_with_field("orders/d", "total", FieldValue::from_integer(40)),
            ],
        )
        .await;

        let query = store()
            .collection("orders")
            .unwrap()
            .query()
            .order_by("total", OrderDirection::Ascending)
            .unwrap()
            .start_after(vec![FieldValue::from_integer(10)])
            .end_at(vec![FieldValue::from_integer(30)]);

        let documents = datastore.run_query(&definition(query)).await.unwrap();
        let ids: Vec<_> = documents.iter().map(|doc| doc.id()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn is_null_matches_explicit_null_only() {
        let datastore = InMemoryDatastore::new();
        seed(
            &datastore,
            vec![
                doc_with_field("orders/a", "closed_at", FieldValue::null()),
                doc_with_field("orders/b", "closed_at", FieldValue::from_integer(1)),
                doc_with_field("orders/c", "other", FieldValue::from_integer(1)),
            ],
        )
        .await;

        let query = store()
            .collection("orders")
            .unwrap()
            .query()
            .filter(FieldFilter::is_null("closed_at").unwrap());

        let documents = datastore.run_query(&definition(query)).await.unwrap();
        let ids: Vec<_> = documents.iter().map(|doc| doc.id()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn array_contains_any_matches_intersection() {
        let datastore = InMemoryDatastore::new();
        seed(
            &datastore,
            vec![
                doc_with_field(
                    "orders/a",
                    "tags",
                    FieldValue::from_array(vec![
                        FieldValue::from_string("rush"),
                        FieldValue::from_string("gift"),
                    ]),
                ),
                doc_with_field(
                    "orders/b",
                    "tags",
                    FieldValue::from_array(vec![FieldValue::from_string("bulk")]),
                ),
            ],
        )
        .await;

        let query = store().collection("orders").unwrap().query().filter(
            FieldFilter::array_contains_any(
                "tags",
                vec![
                    FieldValue::from_string("gift"),
                    FieldValue::from_string("sale"),
                ],
            )
            .unwrap(),
        );

        let documents = datastore.run_query(&definition(query)).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id(), "a");
    }

    #[tokio::test]
    async fn change_feed_reports_every_write() {
        let datastore = InMemoryDatastore::new();
        let changes = datastore.changes().unwrap();

        let (key, data) = doc_with_field("orders/a", "total", FieldValue::from_integer(1));
        datastore.set_document(&key, data).await.unwrap();
        datastore.delete_document(&key).await.unwrap();

        assert_eq!(changes.recv().await.unwrap().key, key);
        assert_eq!(changes.recv().await.unwrap().key, key);
        assert!(changes.is_empty());
    }
}
