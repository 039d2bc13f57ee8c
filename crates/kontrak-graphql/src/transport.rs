//! Transport abstraction consumed by the executors.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::document::GraphqlDocument;
use crate::error::GraphqlClientError;
use crate::operation::{CachePolicy, GraphqlResponse};

/// A read or write request handed to a transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Compiled document.
    pub document: GraphqlDocument,
    /// Variables object.
    pub variables: Value,
    /// Cache interaction.
    pub cache_policy: CachePolicy,
}

impl TransportRequest {
    /// Create a request with the default cache policy.
    #[must_use]
    pub fn new(document: GraphqlDocument, variables: Value) -> Self {
        Self {
            document,
            variables,
            cache_policy: CachePolicy::default(),
        }
    }

    /// Set the cache policy.
    #[must_use]
    pub const fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }
}

/// A file to submit through a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name sent with the part.
    pub name: String,
    /// MIME type, e.g. `application/pdf`.
    pub mime_type: String,
    /// File contents.
    pub bytes: Bytes,
}

impl UploadFile {
    /// Create a file from its parts.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// A multipart upload request (GraphQL multipart request convention).
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Compiled mutation document.
    pub document: GraphqlDocument,
    /// Variables object; the file slot is sent as `null`.
    pub variables: Value,
    /// The file.
    pub file: UploadFile,
    /// Object path of the file slot, e.g. `variables.data.file`.
    pub file_path: String,
}

/// Source of the bearer credential attached to outgoing requests.
pub trait CredentialSource: Send + Sync {
    /// Current bearer token, if any.
    fn bearer_token(&self) -> Option<String>;
}

/// Network boundary for GraphQL operations.
///
/// Implementations return `Ok` for any well-formed GraphQL envelope, including
/// one carrying `errors`; transport failures and non-success statuses are `Err`.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Execute a read.
    async fn query(
        &self,
        request: TransportRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError>;

    /// Execute a write.
    async fn mutate(
        &self,
        request: TransportRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError>;

    /// Submit a file through a multipart mutation.
    async fn upload(
        &self,
        request: UploadRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError>;
}
