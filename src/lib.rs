//! Typed async client for managed document databases.
//!
//! The crate maps typed domain objects to documents in a named collection
//! and exposes CRUD plus a constrained query surface (conjunctive
//! equality/range/array/null filters, multi-field ordering, limits and
//! cursor pagination) in one-shot and live-subscription forms. The heavy
//! lifting — query planning, indexing, consistency, real-time delivery —
//! belongs to the external service; every operation here is a parameter
//! translation onto a pluggable [`remote::datastore::Datastore`] backend.
//!
//! ```no_run
//! use docstore::{DatabaseId, Docstore, PassthroughConverter, StoreClient};
//!
//! # async fn run() -> docstore::StoreResult<()> {
//! let store = Docstore::new(DatabaseId::default("demo-project"));
//! let client = StoreClient::with_in_memory(store);
//! let tasks = client.typed_collection("tasks", PassthroughConverter)?;
//! let fetched = tasks.get_single("t1").await?;
//! assert!(fetched.is_none());
//! # Ok(()) }
//! ```

pub mod api;
mod constants;
pub mod error;
pub mod model;
pub mod remote;
pub mod value;

#[cfg(test)]
pub mod test_support;

pub use api::{
    CollectionReference, Cursor, DataConverter, Docstore, DocumentReference, DocumentSnapshot,
    FieldFilter, OrderBy, OrderDirection, PassthroughConverter, Query, QuerySnapshot,
    SnapshotMetadata, StoreClient, Subscription, TypedCollection,
};
pub use error::{StoreError, StoreErrorCode, StoreResult};
pub use model::{DatabaseId, DocumentKey, FieldPath, ResourcePath, Timestamp};
pub use value::{ArrayValue, FieldValue, MapValue, ValueKind};
