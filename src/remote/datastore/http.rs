use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value as JsonValue};

use crate::api::query::{Bound, FieldFilter, QueryDefinition};
use crate::api::{DocumentSnapshot, SnapshotMetadata};
use crate::error::{internal_error, invalid_argument, unavailable, StoreResult};
use crate::model::{DatabaseId, DocumentKey, FieldPath};
use crate::remote::connection::{Connection, ConnectionBuilder, RequestContext};
use crate::remote::serializer::JsonSerializer;
use crate::value::{FieldValue, MapValue};

use super::{ChangeEvent, Datastore, NoopTokenProvider, TokenProviderArc};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// A datastore speaking the store's one-shot JSON REST dialect.
///
/// Each operation is exactly one request; failures surface unmodified to
/// the caller. Listening is not available on this transport — the REST
/// dialect has no change feed.
#[derive(Clone)]
pub struct HttpDatastore {
    connection: Connection,
    serializer: JsonSerializer,
    auth_provider: TokenProviderArc,
    request_timeout: Duration,
}

#[derive(Clone)]
pub struct HttpDatastoreBuilder {
    database_id: DatabaseId,
    connection_builder: ConnectionBuilder,
    auth_provider: TokenProviderArc,
    request_timeout: Duration,
}

impl HttpDatastore {
    pub fn builder(database_id: DatabaseId) -> HttpDatastoreBuilder {
        HttpDatastoreBuilder::new(database_id)
    }

    async fn request_context(&self) -> StoreResult<RequestContext> {
        let auth_token = self.auth_provider.get_token().await?;
        Ok(RequestContext {
            auth_token,
            request_timeout: Some(self.request_timeout),
        })
    }

    async fn commit(&self, writes: Vec<JsonValue>) -> StoreResult<()> {
        let body = json!({ "writes": writes });
        let context = self.request_context().await?;
        self.connection
            .invoke_json(Method::POST, "documents:commit", Some(body), &context)
            .await
            .map(|_| ())
    }

    fn parse_document_name(&self, name: &str) -> StoreResult<DocumentKey> {
        let prefix = format!("{}/documents/", self.serializer.database_name());
        let relative = name.strip_prefix(&prefix).ok_or_else(|| {
            internal_error(format!("Unexpected document name '{name}' returned by the store"))
        })?;
        DocumentKey::from_string(relative)
    }

    fn build_structured_query(&self, definition: &QueryDefinition) -> JsonValue {
        let mut structured = serde_json::Map::new();

        structured.insert(
            "from".to_string(),
            json!([{ "collectionId": definition.collection_id() }]),
        );

        if !definition.filters().is_empty() {
            structured.insert("where".to_string(), self.encode_filters(definition.filters()));
        }

        if !definition.order_by().is_empty() {
            let orders: Vec<_> = definition
                .order_by()
                .iter()
                .map(|order| {
                    json!({
                        "field": { "fieldPath": order.field().canonical_string() },
                        "direction": order.direction().as_str(),
                    })
                })
                .collect();
            structured.insert("orderBy".to_string(), JsonValue::Array(orders));
        }

        if let Some(limit) = definition.limit() {
            structured.insert("limit".to_string(), json!(limit as i64));
        }

        if let Some(start) = definition.start_at() {
            structured.insert("startAt".to_string(), self.encode_start_cursor(start));
        }

        if let Some(end) = definition.end_at() {
            structured.insert("endAt".to_string(), self.encode_end_cursor(end));
        }

        JsonValue::Object(structured)
    }

    fn encode_filters(&self, filters: &[FieldFilter]) -> JsonValue {
        if filters.len() == 1 {
            return self.encode_filter(&filters[0]);
        }

        let nested: Vec<_> = filters.iter().map(|filter| self.encode_filter(filter)).collect();
        json!({
            "compositeFilter": {
                "op": "AND",
                "filters": nested
            }
        })
    }

    fn encode_filter(&self, filter: &FieldFilter) -> JsonValue {
        let field = json!({ "fieldPath": filter.field().canonical_string() });
        match filter {
            FieldFilter::Equal { value, .. } => self.field_filter(field, "EQUAL", value),
            FieldFilter::LessThan { value, .. } => self.field_filter(field, "LESS_THAN", value),
            FieldFilter::LessThanOrEqual { value, .. } => {
                self.field_filter(field, "LESS_THAN_OR_EQUAL", value)
            }
            FieldFilter::GreaterThan { value, .. } => {
                self.field_filter(field, "GREATER_THAN", value)
            }
            FieldFilter::GreaterThanOrEqual { value, .. } => {
                self.field_filter(field, "GREATER_THAN_OR_EQUAL", value)
            }
            FieldFilter::ArrayContains { value, .. } => {
                self.field_filter(field, "ARRAY_CONTAINS", value)
            }
            FieldFilter::ArrayContainsAny { values, .. } => {
                self.array_operand_filter(field, "ARRAY_CONTAINS_ANY", values)
            }
            FieldFilter::InSet { values, .. } => self.array_operand_filter(field, "IN", values),
            FieldFilter::IsNull { .. } => json!({
                "unaryFilter": {
                    "field": field,
                    "op": "IS_NULL"
                }
            }),
        }
    }

    fn field_filter(&self, field: JsonValue, op: &str, value: &FieldValue) -> JsonValue {
        json!({
            "fieldFilter": {
                "field": field,
                "op": op,
                "value": self.serializer.encode_value(value)
            }
        })
    }

    fn array_operand_filter(&self, field: JsonValue, op: &str, values: &[FieldValue]) -> JsonValue {
        let encoded: Vec<_> = values
            .iter()
            .map(|value| self.serializer.encode_value(value))
            .collect();
        json!({
            "fieldFilter": {
                "field": field,
                "op": op,
                "value": { "arrayValue": { "values": encoded } }
            }
        })
    }

    fn encode_start_cursor(&self, bound: &Bound) -> JsonValue {
        json!({
            "values": bound
                .values()
                .iter()
                .map(|value| self.serializer.encode_value(value))
                .collect::<Vec<_>>(),
            "before": bound.inclusive(),
        })
    }

    fn encode_end_cursor(&self, bound: &Bound) -> JsonValue {
        json!({
            "values": bound
                .values()
                .iter()
                .map(|value| self.serializer.encode_value(value))
                .collect::<Vec<_>>(),
            "before": !bound.inclusive(),
        })
    }
}

#[async_trait]
impl Datastore for HttpDatastore {
    async fn get_document(&self, key: &DocumentKey) -> StoreResult<DocumentSnapshot> {
        let doc_path = format!("documents/{}", key.path().canonical_string());
        let context = self.request_context().await?;
        let response = self
            .connection
            .invoke_json_optional(Method::GET, &doc_path, None, &context)
            .await?;

        match response {
            Some(json) => {
                let fields = self.serializer.decode_document_fields(&json)?;
                Ok(DocumentSnapshot::new(
                    key.clone(),
                    Some(fields),
                    SnapshotMetadata::new(false),
                ))
            }
            None => Ok(DocumentSnapshot::new(
                key.clone(),
                None,
                SnapshotMetadata::new(false),
            )),
        }
    }

    async fn set_document(&self, key: &DocumentKey, data: MapValue) -> StoreResult<()> {
        self.commit(vec![self.serializer.encode_set_write(key, &data)])
            .await
    }

    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> StoreResult<()> {
        if field_paths.is_empty() {
            return Err(invalid_argument(
                "update_document requires at least one field path",
            ));
        }
        self.commit(vec![self
            .serializer
            .encode_update_write(key, &data, &field_paths)])
            .await
    }

    async fn delete_document(&self, key: &DocumentKey) -> StoreResult<()> {
        self.commit(vec![self.serializer.encode_delete_write(key)])
            .await
    }

    async fn run_query(&self, query: &QueryDefinition) -> StoreResult<Vec<DocumentSnapshot>> {
        let parent = query.parent_path();
        let request_path = if parent.is_empty() {
            "documents:runQuery".to_string()
        } else {
            format!("documents/{}:runQuery", parent.canonical_string())
        };

        let body = json!({ "structuredQuery": self.build_structured_query(query) });
        let context = self.request_context().await?;
        let response = self
            .connection
            .invoke_json(Method::POST, &request_path, Some(body), &context)
            .await?;

        let results = response
            .as_array()
            .ok_or_else(|| internal_error("runQuery response must be an array"))?;

        let mut snapshots = Vec::new();
        for entry in results {
            // Progress-only entries carry a readTime but no document.
            let document = match entry.get("document") {
                Some(value) => value,
                None => continue,
            };

            let name = document
                .get("name")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| internal_error("runQuery document missing 'name' field"))?;
            let key = self.parse_document_name(name)?;
            let fields = self.serializer.decode_document_fields(document)?;

            snapshots.push(DocumentSnapshot::new(
                key,
                Some(fields),
                SnapshotMetadata::new(false),
            ));
        }

        Ok(snapshots)
    }

    fn changes(&self) -> StoreResult<async_channel::Receiver<ChangeEvent>> {
        Err(unavailable(
            "The one-shot HTTP transport exposes no change feed; subscriptions need a datastore with one",
        ))
    }
}

impl HttpDatastoreBuilder {
    fn new(database_id: DatabaseId) -> Self {
        let connection_builder = Connection::builder(database_id.clone());
        Self {
            database_id,
            connection_builder,
            auth_provider: std::sync::Arc::new(NoopTokenProvider),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.connection_builder = self.connection_builder.with_host(host);
        self
    }

    pub fn with_auth_provider(mut self, provider: TokenProviderArc) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connection_builder(mut self, builder: ConnectionBuilder) -> Self {
        self.connection_builder = builder;
        self
    }

    pub fn build(self) -> StoreResult<HttpDatastore> {
        let connection = self.connection_builder.build()?;
        let serializer = JsonSerializer::new(self.database_id);
        Ok(HttpDatastore {
            connection,
            serializer,
            auth_provider: self.auth_provider,
            request_timeout: self.request_timeout,
        })
    }
}
