//! GraphQL HTTP client implementation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::cache::ResponseCache;
use crate::error::{GraphqlClientError, GraphqlError};
use crate::operation::{CachePolicy, GraphqlRequest, GraphqlResponse};
use crate::transport::{CredentialSource, GraphqlTransport, TransportRequest, UploadRequest};

/// GraphQL client metrics.
#[derive(Debug, Default)]
#[allow(clippy::struct_field_names)]
pub struct GraphqlClientMetrics {
    requests_total: AtomicU64,
    requests_success: AtomicU64,
    requests_error: AtomicU64,
    cache_hits: AtomicU64,
}

impl GraphqlClientMetrics {
    /// Snapshot current metrics.
    #[must_use]
    pub fn snapshot(&self) -> GraphqlClientMetricsSnapshot {
        GraphqlClientMetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_error: self.requests_error.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_field_names)]
pub struct GraphqlClientMetricsSnapshot {
    /// Requests sent over the network.
    pub requests_total: u64,
    /// Requests answered without GraphQL errors.
    pub requests_success: u64,
    /// Requests that failed or carried GraphQL errors.
    pub requests_error: u64,
    /// Reads served from the response cache.
    pub cache_hits: u64,
}

/// GraphQL client configuration.
#[derive(Debug, Clone)]
pub struct GraphqlClientConfig {
    /// Service name used in logs.
    pub service_name: String,
    /// Default headers applied to every request.
    pub headers: HeaderMap,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for GraphqlClientConfig {
    fn default() -> Self {
        Self {
            service_name: "graphql".to_string(),
            headers: HeaderMap::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// GraphQL client builder.
#[derive(Clone)]
pub struct GraphqlClientBuilder {
    endpoint: String,
    config: GraphqlClientConfig,
    credentials: Option<Arc<dyn CredentialSource>>,
}

impl fmt::Debug for GraphqlClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphqlClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .field("credentials", &self.credentials.is_some())
            .finish()
    }
}

impl GraphqlClientBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            config: GraphqlClientConfig::default(),
            credentials: None,
        }
    }

    /// Set the service name used in logs.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.config.service_name = service_name.into();
        self
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.config.headers.insert(name, value);
        self
    }

    /// Add a fixed bearer token header.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl AsRef<str>) -> Self {
        if let Some(header) = bearer_header(token.as_ref()) {
            self.config.headers.insert(AUTHORIZATION, header);
        }
        self
    }

    /// Read the bearer token from `source` on every request.
    #[must_use]
    pub fn with_credentials(mut self, source: Arc<dyn CredentialSource>) -> Self {
        self.credentials = Some(source);
        self
    }

    /// Set timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<GraphqlClient, GraphqlClientError> {
        let http = reqwest::Client::builder()
            .default_headers(self.config.headers.clone())
            .timeout(self.config.timeout)
            .build()?;
        Ok(GraphqlClient {
            endpoint: self.endpoint,
            http,
            config: self.config,
            credentials: self.credentials,
            cache: Arc::new(ResponseCache::new()),
            metrics: Arc::new(GraphqlClientMetrics::default()),
        })
    }
}

/// GraphQL client.
#[derive(Clone)]
pub struct GraphqlClient {
    endpoint: String,
    http: reqwest::Client,
    config: GraphqlClientConfig,
    credentials: Option<Arc<dyn CredentialSource>>,
    cache: Arc<ResponseCache>,
    metrics: Arc<GraphqlClientMetrics>,
}

impl fmt::Debug for GraphqlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphqlClient")
            .field("endpoint", &self.endpoint)
            .field("service_name", &self.config.service_name)
            .field("cached_entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl GraphqlClient {
    /// Create a builder for `endpoint`.
    #[must_use]
    pub fn builder(endpoint: impl Into<String>) -> GraphqlClientBuilder {
        GraphqlClientBuilder::new(endpoint)
    }

    /// Endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Return client metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> GraphqlClientMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Response cache shared by all clones of this client.
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    async fn execute_read(
        &self,
        request: TransportRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        let source = request.document.source();
        if request.cache_policy.reads_cache() {
            if let Some(data) = self.cache.get(source, &request.variables) {
                self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!(service = %self.config.service_name, "serving GraphQL read from cache");
                return Ok(GraphqlResponse::from_data(data));
            }
        }

        let response = self.execute_document(&request).await?;

        if request.cache_policy.writes_cache() && response.is_ok() {
            if let Some(data) = &response.data {
                self.cache.insert(source, &request.variables, data.clone());
            }
        }
        Ok(response)
    }

    async fn execute_document(
        &self,
        request: &TransportRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        let mut body = GraphqlRequest::new(request.document.source(), &request.variables);
        if let Some(name) = request.document.operation_name() {
            body = body.with_operation_name(name);
        }
        let body_bytes = serde_json::to_vec(&body)?;

        let builder = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body_bytes);
        let bytes = self.send(builder).await?;
        self.decode(&bytes)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Vec<u8>, GraphqlClientError> {
        self.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

        let builder = match self.current_bearer() {
            Some(header) => builder.header(AUTHORIZATION, header),
            None => builder,
        };
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                self.metrics.requests_error.fetch_add(1, Ordering::Relaxed);
                return Err(err.into());
            }
        };

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            self.metrics.requests_error.fetch_add(1, Ordering::Relaxed);
            return Err(GraphqlClientError::HttpStatus {
                status,
                body: truncate_body(&bytes),
                errors: body_errors(&bytes),
            });
        }

        Ok(bytes.to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        let response: GraphqlResponse<Value> = serde_json::from_slice(bytes)?;
        if response.errors.is_empty() {
            self.metrics
                .requests_success
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.requests_error.fetch_add(1, Ordering::Relaxed);
        }
        Ok(response)
    }

    fn current_bearer(&self) -> Option<HeaderValue> {
        let token = self.credentials.as_ref()?.bearer_token()?;
        bearer_header(&token)
    }
}

#[async_trait]
impl GraphqlTransport for GraphqlClient {
    #[instrument(skip_all, fields(operation = request.document.operation_name(), policy = ?request.cache_policy))]
    async fn query(
        &self,
        request: TransportRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        self.execute_read(request).await
    }

    // Mutations never read from or write to the response cache.
    #[instrument(skip_all, fields(operation = request.document.operation_name()))]
    async fn mutate(
        &self,
        request: TransportRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        let request = request.with_cache_policy(CachePolicy::NoCache);
        self.execute_document(&request).await
    }

    #[instrument(skip_all, fields(operation = request.document.operation_name(), file = %request.file.name))]
    async fn upload(
        &self,
        request: UploadRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        let operations = serde_json::json!({
            "query": request.document.source(),
            "variables": request.variables,
        });
        let map = serde_json::json!({ "0": [request.file_path] });

        let part = Part::bytes(request.file.bytes.to_vec())
            .file_name(request.file.name.clone())
            .mime_str(&request.file.mime_type)?;
        let form = Form::new()
            .text("operations", operations.to_string())
            .text("map", map.to_string())
            .part("0", part);

        debug!(size = request.file.size(), "submitting multipart upload");
        let bytes = self
            .send(self.http.post(&self.endpoint).multipart(form))
            .await?;
        self.decode(&bytes)
    }
}

fn bearer_header(token: &str) -> Option<HeaderValue> {
    if token.is_empty() {
        return None;
    }
    HeaderValue::from_str(&format!("Bearer {token}")).ok()
}

fn body_errors(bytes: &[u8]) -> Vec<GraphqlError> {
    serde_json::from_slice::<GraphqlResponse<Value>>(bytes)
        .map(|response| response.errors)
        .unwrap_or_default()
}

fn truncate_body(bytes: &[u8]) -> String {
    const MAX_LEN: usize = 4096;
    let mut body = String::from_utf8_lossy(bytes).to_string();
    if body.len() > MAX_LEN {
        let mut cut = MAX_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_errors_reads_graphql_envelopes_only() {
        let errors = body_errors(br#"{"errors":[{"message":"bad","extensions":{"code":"X"}}]}"#);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].extension_code(), Some("X"));

        assert!(body_errors(b"<html>gateway</html>").is_empty());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(3000);
        let truncated = truncate_body(long.as_bytes());
        assert!(truncated.ends_with('…'));
        assert!(truncated.len() <= 4096 + '…'.len_utf8());
    }

    #[test]
    fn empty_token_yields_no_header() {
        assert!(bearer_header("").is_none());
        assert_eq!(
            bearer_header("abc").expect("header").to_str().expect("ascii"),
            "Bearer abc"
        );
    }
}
