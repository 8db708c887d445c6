use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use shared::{
    domain::{RecordId, ResourceKind},
    error::ApiError,
    protocol::PageQuery,
};
use tracing::debug;
use url::Url;

use crate::error::{ApiFailure, ClientSetupError};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// CRUD + list operations of one remote collection.
///
/// Payloads and responses stay untyped here; shaping them is the caller's job.
#[async_trait]
pub trait CollectionApi: Send + Sync {
    async fn list(&self, query: PageQuery) -> Result<Value, ApiFailure>;
    async fn create(&self, payload: Value) -> Result<Value, ApiFailure>;
    async fn update(&self, id: RecordId, payload: Value) -> Result<Value, ApiFailure>;
    async fn delete(&self, id: RecordId) -> Result<Value, ApiFailure>;
}

/// Shared HTTP plumbing for every endpoint under one API base url.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientSetupError> {
        let base_url = Url::parse(base_url.trim())?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ClientSetupError::UnsupportedBaseUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiFailure> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiFailure::transport(format!("base url '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.authorize(self.http.get(url))
    }

    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        self.authorize(self.http.post(url))
    }

    pub(crate) fn put(&self, url: Url) -> RequestBuilder {
        self.authorize(self.http.put(url))
    }

    pub(crate) fn delete(&self, url: Url) -> RequestBuilder {
        self.authorize(self.http.delete(url))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request and returns the JSON body. Empty or non-JSON success
    /// bodies come back as `Value::Null`.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Value, ApiFailure> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ApiFailure::status(status.as_u16(), error_message(status, &body)));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }
        match serde_json::from_slice(&body) {
            Ok(value) => Ok(value),
            Err(error) => {
                debug!(%error, %status, "response body is not JSON");
                Ok(Value::Null)
            }
        }
    }
}

fn error_message(status: StatusCode, body: &[u8]) -> Option<String> {
    let envelope: ApiError = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) => {
            debug!(%status, "error response carried no JSON envelope");
            return None;
        }
    };
    envelope.message().map(str::to_string)
}

pub struct HttpCollectionApi {
    client: ApiClient,
    kind: ResourceKind,
}

impl HttpCollectionApi {
    pub fn new(client: ApiClient, kind: ResourceKind) -> Self {
        Self { client, kind }
    }

    fn collection_url(&self) -> Result<Url, ApiFailure> {
        self.client.endpoint(&[self.kind.path()])
    }

    fn record_url(&self, id: RecordId) -> Result<Url, ApiFailure> {
        let id = id.0.to_string();
        self.client.endpoint(&[self.kind.path(), id.as_str()])
    }
}

#[async_trait]
impl CollectionApi for HttpCollectionApi {
    async fn list(&self, query: PageQuery) -> Result<Value, ApiFailure> {
        let url = self.collection_url()?;
        self.client.send(self.client.get(url).query(&query)).await
    }

    async fn create(&self, payload: Value) -> Result<Value, ApiFailure> {
        let url = self.collection_url()?;
        self.client.send(self.client.post(url).json(&payload)).await
    }

    async fn update(&self, id: RecordId, payload: Value) -> Result<Value, ApiFailure> {
        let url = self.record_url(id)?;
        self.client.send(self.client.put(url).json(&payload)).await
    }

    async fn delete(&self, id: RecordId) -> Result<Value, ApiFailure> {
        let url = self.record_url(id)?;
        self.client.send(self.client.delete(url)).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
