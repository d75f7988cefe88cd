use crate::api::snapshot::DocumentSnapshot;
use crate::error::{invalid_argument, StoreResult};
use crate::model::{DocumentKey, FieldPath, IntoFieldPath, ResourcePath};
use crate::value::FieldValue;

use super::database::Docstore;

/// A single conjunctive predicate on a document field.
///
/// One case per operator, each carrying exactly the operand shape that
/// operator needs; a filter can never be in an ambiguous state.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldFilter {
    Equal { field: FieldPath, value: FieldValue },
    LessThan { field: FieldPath, value: FieldValue },
    LessThanOrEqual { field: FieldPath, value: FieldValue },
    GreaterThan { field: FieldPath, value: FieldValue },
    GreaterThanOrEqual { field: FieldPath, value: FieldValue },
    /// Matches documents whose array field contains `value`.
    ArrayContains { field: FieldPath, value: FieldValue },
    /// Matches documents whose array field contains any of `values`.
    ArrayContainsAny { field: FieldPath, values: Vec<FieldValue> },
    /// Matches documents whose field equals one of `values`.
    InSet { field: FieldPath, values: Vec<FieldValue> },
    /// Matches documents whose field is explicitly null.
    IsNull { field: FieldPath },
}

impl FieldFilter {
    pub fn equal(field: impl IntoFieldPath, value: FieldValue) -> StoreResult<Self> {
        Ok(Self::Equal {
            field: field.into_field_path()?,
            value,
        })
    }

    pub fn less_than(field: impl IntoFieldPath, value: FieldValue) -> StoreResult<Self> {
        Ok(Self::LessThan {
            field: field.into_field_path()?,
            value,
        })
    }

    pub fn less_than_or_equal(field: impl IntoFieldPath, value: FieldValue) -> StoreResult<Self> {
        Ok(Self::LessThanOrEqual {
            field: field.into_field_path()?,
            value,
        })
    }

    pub fn greater_than(field: impl IntoFieldPath, value: FieldValue) -> StoreResult<Self> {
        Ok(Self::GreaterThan {
            field: field.into_field_path()?,
            value,
        })
    }

    pub fn greater_than_or_equal(
        field: impl IntoFieldPath,
        value: FieldValue,
    ) -> StoreResult<Self> {
        Ok(Self::GreaterThanOrEqual {
            field: field.into_field_path()?,
            value,
        })
    }

    pub fn array_contains(field: impl IntoFieldPath, value: FieldValue) -> StoreResult<Self> {
        Ok(Self::ArrayContains {
            field: field.into_field_path()?,
            value,
        })
    }

    pub fn array_contains_any(
        field: impl IntoFieldPath,
        values: Vec<FieldValue>,
    ) -> StoreResult<Self> {
        Ok(Self::ArrayContainsAny {
            field: field.into_field_path()?,
            values,
        })
    }

    pub fn in_set(field: impl IntoFieldPath, values: Vec<FieldValue>) -> StoreResult<Self> {
        Ok(Self::InSet {
            field: field.into_field_path()?,
            values,
        })
    }

    pub fn is_null(field: impl IntoFieldPath) -> StoreResult<Self> {
        Ok(Self::IsNull {
            field: field.into_field_path()?,
        })
    }

    /// The document field this filter applies to.
    pub fn field(&self) -> &FieldPath {
        match self {
            Self::Equal { field, .. }
            | Self::LessThan { field, .. }
            | Self::LessThanOrEqual { field, .. }
            | Self::GreaterThan { field, .. }
            | Self::GreaterThanOrEqual { field, .. }
            | Self::ArrayContains { field, .. }
            | Self::ArrayContainsAny { field, .. }
            | Self::InSet { field, .. }
            | Self::IsNull { field } => field,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

impl OrderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Ascending => "ASCENDING",
            OrderDirection::Descending => "DESCENDING",
        }
    }
}

/// Orders query results by one field.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    field: FieldPath,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn new(field: impl IntoFieldPath, direction: OrderDirection) -> StoreResult<Self> {
        Ok(Self {
            field: field.into_field_path()?,
            direction,
        })
    }

    pub fn ascending(field: impl IntoFieldPath) -> StoreResult<Self> {
        Self::new(field, OrderDirection::Ascending)
    }

    pub fn descending(field: impl IntoFieldPath) -> StoreResult<Self> {
        Self::new(field, OrderDirection::Descending)
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

/// A pagination boundary relative to the query's ordering.
///
/// Boundary values pair positionally with the orderings; a leading subset
/// is allowed.
#[derive(Clone, Debug, PartialEq)]
pub enum Cursor {
    /// Resume at the boundary, inclusive.
    StartAt(Vec<FieldValue>),
    /// Resume after the boundary, exclusive.
    StartAfter(Vec<FieldValue>),
    /// Stop at the boundary, inclusive.
    EndAt(Vec<FieldValue>),
    /// Stop before the boundary, exclusive.
    EndBefore(Vec<FieldValue>),
}

/// A resolved cursor bound as the datastores consume it.
#[derive(Clone, Debug, PartialEq)]
pub struct Bound {
    values: Vec<FieldValue>,
    inclusive: bool,
}

impl Bound {
    pub fn new(values: Vec<FieldValue>, inclusive: bool) -> Self {
        Self { values, inclusive }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn inclusive(&self) -> bool {
        self.inclusive
    }
}

/// A query scoped to a single collection.
///
/// Built fluently: filters are conjunctive, orderings apply in the given
/// sequence, and cursor bounds attach relative to the orderings.
#[derive(Clone, Debug)]
pub struct Query {
    store: Docstore,
    definition: QueryDefinition,
}

impl Query {
    pub(crate) fn new(store: Docstore, collection_path: ResourcePath) -> StoreResult<Self> {
        if collection_path.len() % 2 == 0 {
            return Err(invalid_argument(
                "Queries must reference a collection (odd number of path segments)",
            ));
        }
        Ok(Self {
            store,
            definition: QueryDefinition::new(collection_path),
        })
    }

    /// Returns the store handle that created this query.
    pub fn store(&self) -> &Docstore {
        &self.store
    }

    pub fn collection_path(&self) -> &ResourcePath {
        &self.definition.collection_path
    }

    /// The identifier (last segment) of the targeted collection.
    pub fn collection_id(&self) -> &str {
        self.definition
            .collection_path
            .last_segment()
            .expect("Collection path always ends with an identifier")
    }

    /// Adds a conjunctive filter.
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.definition.filters.push(filter);
        self
    }

    /// Appends an ordering after any already present.
    pub fn order_by(
        mut self,
        field: impl IntoFieldPath,
        direction: OrderDirection,
    ) -> StoreResult<Self> {
        self.definition
            .order_by
            .push(OrderBy::new(field, direction)?);
        Ok(self)
    }

    /// Caps the number of returned documents.
    pub fn limit(mut self, limit: u32) -> Self {
        self.definition.limit = Some(limit);
        self
    }

    /// Attaches a pagination cursor.
    ///
    /// Cursors are positional against the query's orderings. A cursor on a
    /// query with no ordering has nothing to bind to and is dropped with a
    /// logged diagnostic; the query behaves as if no cursor was given.
    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        if self.definition.order_by.is_empty() {
            log::warn!(
                "pagination cursor ignored: query on '{}' has no ordering",
                self.collection_id()
            );
            return self;
        }
        match cursor {
            Cursor::StartAt(values) => {
                self.definition.start_at = Some(Bound::new(values, true));
            }
            Cursor::StartAfter(values) => {
                self.definition.start_at = Some(Bound::new(values, false));
            }
            Cursor::EndAt(values) => {
                self.definition.end_at = Some(Bound::new(values, true));
            }
            Cursor::EndBefore(values) => {
                self.definition.end_at = Some(Bound::new(values, false));
            }
        }
        self
    }

    pub fn start_at(self, values: Vec<FieldValue>) -> Self {
        self.with_cursor(Cursor::StartAt(values))
    }

    pub fn start_after(self, values: Vec<FieldValue>) -> Self {
        self.with_cursor(Cursor::StartAfter(values))
    }

    pub fn end_at(self, values: Vec<FieldValue>) -> Self {
        self.with_cursor(Cursor::EndAt(values))
    }

    pub fn end_before(self, values: Vec<FieldValue>) -> Self {
        self.with_cursor(Cursor::EndBefore(values))
    }

    pub(crate) fn definition(&self) -> &QueryDefinition {
        &self.definition
    }
}

/// The datastore-facing description of a query.
#[derive(Clone, Debug)]
pub struct QueryDefinition {
    collection_path: ResourcePath,
    filters: Vec<FieldFilter>,
    order_by: Vec<OrderBy>,
    limit: Option<u32>,
    start_at: Option<Bound>,
    end_at: Option<Bound>,
}

impl QueryDefinition {
    fn new(collection_path: ResourcePath) -> Self {
        Self {
            collection_path,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            start_at: None,
            end_at: None,
        }
    }

    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub fn collection_id(&self) -> &str {
        self.collection_path
            .last_segment()
            .expect("Collection path always ends with an identifier")
    }

    /// The document that logically contains the collection, if nested.
    pub fn parent_path(&self) -> ResourcePath {
        self.collection_path.without_last()
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn start_at(&self) -> Option<&Bound> {
        self.start_at.as_ref()
    }

    pub fn end_at(&self) -> Option<&Bound> {
        self.end_at.as_ref()
    }

    /// Whether `key` addresses a document directly inside the queried
    /// collection.
    pub fn matches_collection(&self, key: &DocumentKey) -> bool {
        key.collection_path() == self.collection_path
    }
}

/// The results of executing a query.
#[derive(Clone, Debug)]
pub struct QuerySnapshot {
    query: Query,
    documents: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn new(query: Query, documents: Vec<DocumentSnapshot>) -> Self {
        Self { query, documents }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn into_documents(self) -> Vec<DocumentSnapshot> {
        self.documents
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}
