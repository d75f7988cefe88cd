mod client;
mod collection;
mod converter;
mod database;
mod listen;
pub(crate) mod operations;
pub(crate) mod query;
mod reference;
mod snapshot;

pub use client::StoreClient;
pub use collection::TypedCollection;
pub use converter::{DataConverter, PassthroughConverter};
pub use database::Docstore;
pub use listen::Subscription;
pub use query::{
    Bound, Cursor, FieldFilter, OrderBy, OrderDirection, Query, QueryDefinition, QuerySnapshot,
};
pub use reference::{CollectionReference, DocumentReference};
pub use snapshot::{DocumentSnapshot, SnapshotMetadata};
