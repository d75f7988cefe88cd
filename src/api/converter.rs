use std::collections::BTreeMap;

use crate::error::StoreResult;
use crate::value::{FieldValue, MapValue};

/// Converts between a caller's domain model and the store's field maps.
///
/// Writes go through `encode`, reads through `decode`. The document
/// identifier is passed to `decode` so models may embed their own id;
/// encode/decode are expected to be pure, and symmetric only by the
/// caller's convention.
pub trait DataConverter: Send + Sync + 'static {
    /// The strongly typed model associated with this converter.
    type Model: Clone + Send + 'static;

    /// Encodes the model into a field map for writes.
    fn encode(&self, value: &Self::Model) -> StoreResult<BTreeMap<String, FieldValue>>;

    /// Decodes a field map (plus the document identifier) into the model.
    fn decode(&self, id: &str, fields: &MapValue) -> StoreResult<Self::Model>;
}

/// Converter that surfaces raw field maps unchanged.
#[derive(Clone, Default)]
pub struct PassthroughConverter;

impl DataConverter for PassthroughConverter {
    type Model = BTreeMap<String, FieldValue>;

    fn encode(&self, value: &Self::Model) -> StoreResult<BTreeMap<String, FieldValue>> {
        Ok(value.clone())
    }

    fn decode(&self, _id: &str, fields: &MapValue) -> StoreResult<Self::Model> {
        Ok(fields.fields().clone())
    }
}
