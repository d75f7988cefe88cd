use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value as JsonValue;

use crate::error::{internal_error, invalid_argument, StoreResult};
use crate::model::DatabaseId;

use super::rpc_error::map_http_error;

const API_VERSION: &str = "v1";
const EMULATOR_HOST_ENV: &str = "DOCSTORE_EMULATOR_HOST";

/// A thin HTTP wrapper around the store's REST endpoints.
///
/// The base URL is derived from the configured host plus the database
/// address; requests carry JSON bodies and an optional bearer token.
#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base_url: String,
}

#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    database_id: DatabaseId,
    client: Option<Client>,
    host: Option<String>,
}

#[derive(Default, Clone, Debug)]
pub struct RequestContext {
    pub auth_token: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl ConnectionBuilder {
    pub fn new(database_id: DatabaseId) -> Self {
        let host = std::env::var(EMULATOR_HOST_ENV)
            .ok()
            .map(|host| format!("http://{host}"));
        Self {
            database_id,
            client: None,
            host,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Points the connection at `host`, a full origin such as
    /// `https://docs.example.com` or `http://localhost:8080`.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn build(self) -> StoreResult<Connection> {
        let host = self.host.ok_or_else(|| {
            invalid_argument(format!(
                "No API host configured; pass one to the builder or set {EMULATOR_HOST_ENV}"
            ))
        })?;
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|err| internal_error(err.to_string()))?,
        };
        let base_url = format!(
            "{}/{API_VERSION}/projects/{}/databases/{}",
            host.trim_end_matches('/'),
            self.database_id.project_id(),
            self.database_id.database(),
        );
        Ok(Connection { client, base_url })
    }
}

impl Connection {
    pub fn builder(database_id: DatabaseId) -> ConnectionBuilder {
        ConnectionBuilder::new(database_id)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and parses the JSON response, mapping HTTP failures
    /// into typed store errors.
    pub async fn invoke_json(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
        context: &RequestContext,
    ) -> StoreResult<JsonValue> {
        let mut request = self.build_request(method, path, context);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| internal_error(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| internal_error(err.to_string()))?;
        if status.is_success() {
            if text.is_empty() {
                Ok(JsonValue::Null)
            } else {
                serde_json::from_str(&text).map_err(|err| internal_error(err.to_string()))
            }
        } else {
            Err(map_http_error(status, &text))
        }
    }

    /// Like [`Connection::invoke_json`], but a 404 response yields
    /// `Ok(None)` so absent documents read as absent rather than faulting.
    pub async fn invoke_json_optional(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
        context: &RequestContext,
    ) -> StoreResult<Option<JsonValue>> {
        let mut request = self.build_request(method, path, context);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| internal_error(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| internal_error(err.to_string()))?;
        if status.is_success() {
            if text.is_empty() {
                Ok(Some(JsonValue::Null))
            } else {
                serde_json::from_str(&text)
                    .map(Some)
                    .map_err(|err| internal_error(err.to_string()))
            }
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(map_http_error(status, &text))
        }
    }

    fn build_request(
        &self,
        method: Method,
        path: &str,
        context: &RequestContext,
    ) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut builder = self.client.request(method, url);
        if let Some(timeout) = context.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = context.auth_token.as_deref() {
            builder = builder.bearer_auth(token);
        }
        builder.header("Content-Type", "application/json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_includes_database_address() {
        let connection = Connection::builder(DatabaseId::new("demo", "analytics"))
            .with_host("http://localhost:8080")
            .build()
            .unwrap();
        assert_eq!(
            connection.base_url(),
            "http://localhost:8080/v1/projects/demo/databases/analytics"
        );
    }

    #[test]
    fn missing_host_is_rejected() {
        if std::env::var(EMULATOR_HOST_ENV).is_ok() {
            return;
        }
        let err = Connection::builder(DatabaseId::default("demo"))
            .build()
            .unwrap_err();
        assert_eq!(err.code_str(), "docstore/invalid-argument");
    }
}
