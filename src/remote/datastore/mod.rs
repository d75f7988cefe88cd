use std::sync::Arc;

use async_trait::async_trait;

use crate::api::query::QueryDefinition;
use crate::api::DocumentSnapshot;
use crate::error::StoreResult;
use crate::model::{DocumentKey, FieldPath};
use crate::value::MapValue;

pub mod http;
pub mod in_memory;

/// A notification that the document at `key` was written or deleted.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub key: DocumentKey,
}

/// The external store as the client consumes it: one-shot document and
/// query operations plus access to the store's change-notification feed.
///
/// Every method is a single external request; failures surface unmodified
/// to the caller, and no implementation retries.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    /// Fetches one document; absence is an existing-but-empty snapshot,
    /// not an error.
    async fn get_document(&self, key: &DocumentKey) -> StoreResult<DocumentSnapshot>;

    /// Creates or overwrites the document at `key`.
    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> StoreResult<()>;

    /// Merges the given field paths into an existing document; fails with
    /// not-found when the document is absent.
    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> StoreResult<()>;

    /// Removes the document at `key`; succeeds when already absent.
    async fn delete_document(&self, key: &DocumentKey) -> StoreResult<()>;

    /// Executes a query and returns the matching documents in order.
    async fn run_query(&self, query: &QueryDefinition) -> StoreResult<Vec<DocumentSnapshot>>;

    /// Subscribes to the store's change feed.
    ///
    /// Implementations without a change channel report `unavailable`.
    fn changes(&self) -> StoreResult<async_channel::Receiver<ChangeEvent>>;
}

/// Supplies the bearer token attached to outgoing requests.
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    async fn get_token(&self) -> StoreResult<Option<String>>;
}

/// Provider for anonymous access.
#[derive(Default, Clone)]
pub struct NoopTokenProvider;

#[async_trait]
impl TokenProvider for NoopTokenProvider {
    async fn get_token(&self) -> StoreResult<Option<String>> {
        Ok(None)
    }
}

pub type TokenProviderArc = Arc<dyn TokenProvider>;

pub use http::HttpDatastore;
pub use in_memory::InMemoryDatastore;
