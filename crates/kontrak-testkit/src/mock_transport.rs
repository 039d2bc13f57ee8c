//! Scripted in-process transport.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use kontrak_graphql::{
    CachePolicy, GraphqlClientError, GraphqlError, GraphqlResponse, GraphqlTransport, StatusCode,
    TransportRequest, UploadRequest,
};
use parking_lot::Mutex;
use serde_json::Value;

/// Which transport entry point was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `GraphqlTransport::query`.
    Query,
    /// `GraphqlTransport::mutate`.
    Mutation,
    /// `GraphqlTransport::upload`.
    Upload,
}

/// A call observed by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Entry point.
    pub kind: CallKind,
    /// Document source.
    pub source: String,
    /// Variables sent.
    pub variables: Value,
    /// Cache policy for reads and writes.
    pub cache_policy: Option<CachePolicy>,
    /// Uploaded file name.
    pub file_name: Option<String>,
}

/// A scripted outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this envelope.
    Response(GraphqlResponse<Value>),
    /// Fail with this error.
    Error(GraphqlClientError),
}

impl MockReply {
    /// Envelope with `data`.
    #[must_use]
    pub const fn data(data: Value) -> Self {
        Self::Response(GraphqlResponse::from_data(data))
    }

    /// Envelope with GraphQL errors and no data.
    #[must_use]
    pub fn graphql_errors(messages: &[&str]) -> Self {
        Self::Response(GraphqlResponse::from_errors(
            messages.iter().map(|m| GraphqlError::new(*m)).collect(),
        ))
    }

    /// Non-success HTTP status carrying GraphQL errors in its body.
    #[must_use]
    pub fn http_status(status: u16, errors: Vec<GraphqlError>) -> Self {
        Self::Error(GraphqlClientError::HttpStatus {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: String::new(),
            errors,
        })
    }
}

#[derive(Debug)]
struct Scripted {
    reply: MockReply,
    delay: Option<Duration>,
}

/// Transport answering from a queue of scripted replies.
///
/// Replies are consumed in call order regardless of entry point. When the
/// queue is empty the fallback reply is used, or a protocol error when none is
/// set.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Option<MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    /// Create a transport with no scripted replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn push(&self, reply: MockReply) {
        self.replies.lock().push_back(Scripted { reply, delay: None });
    }

    /// Queue a reply delivered after `delay`.
    pub fn push_delayed(&self, reply: MockReply, delay: Duration) {
        self.replies.lock().push_back(Scripted {
            reply,
            delay: Some(delay),
        });
    }

    /// Queue an envelope with `data`.
    pub fn push_data(&self, data: Value) {
        self.push(MockReply::data(data));
    }

    /// Queue a transport error.
    pub fn push_error(&self, error: GraphqlClientError) {
        self.push(MockReply::Error(error));
    }

    /// Reply used once the queue is drained.
    pub fn set_fallback(&self, reply: MockReply) {
        *self.fallback.lock() = Some(reply);
    }

    /// Calls observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls observed so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn answer(&self, call: RecordedCall) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        self.calls.lock().push(call);
        let scripted = self.replies.lock().pop_front();
        let (reply, delay) = match scripted {
            Some(Scripted { reply, delay }) => (Some(reply), delay),
            None => (self.fallback.lock().clone(), None),
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Error(error)) => Err(error),
            None => Err(GraphqlClientError::Protocol {
                message: "no scripted reply".to_string(),
            }),
        }
    }
}

#[async_trait]
impl GraphqlTransport for MockTransport {
    async fn query(
        &self,
        request: TransportRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        self.answer(RecordedCall {
            kind: CallKind::Query,
            source: request.document.source().to_string(),
            variables: request.variables,
            cache_policy: Some(request.cache_policy),
            file_name: None,
        })
        .await
    }

    async fn mutate(
        &self,
        request: TransportRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        self.answer(RecordedCall {
            kind: CallKind::Mutation,
            source: request.document.source().to_string(),
            variables: request.variables,
            cache_policy: Some(request.cache_policy),
            file_name: None,
        })
        .await
    }

    async fn upload(
        &self,
        request: UploadRequest,
    ) -> Result<GraphqlResponse<Value>, GraphqlClientError> {
        self.answer(RecordedCall {
            kind: CallKind::Upload,
            source: request.document.source().to_string(),
            variables: request.variables,
            cache_policy: None,
            file_name: Some(request.file.name),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontrak_graphql::GraphqlDocument;
    use serde_json::json;

    fn request() -> TransportRequest {
        TransportRequest::new(
            GraphqlDocument::parse("query A { a }").expect("document"),
            json!({"id": 1}),
        )
    }

    #[tokio::test]
    async fn replies_in_order_then_fallback() {
        let transport = MockTransport::new();
        transport.push_data(json!({"a": 1}));
        transport.push(MockReply::graphql_errors(&["boom"]));
        transport.set_fallback(MockReply::data(json!({"a": 0})));

        let first = transport.query(request()).await.expect("first");
        assert_eq!(first.data, Some(json!({"a": 1})));

        let second = transport.query(request()).await.expect("second");
        assert_eq!(second.errors[0].message, "boom");

        let third = transport.mutate(request()).await.expect("fallback");
        assert_eq!(third.data, Some(json!({"a": 0})));

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].kind, CallKind::Mutation);
        assert_eq!(calls[0].variables, json!({"id": 1}));
    }

    #[tokio::test]
    async fn empty_queue_without_fallback_is_protocol_error() {
        let transport = MockTransport::new();
        let err = transport.query(request()).await.expect_err("no reply");
        assert!(matches!(err, GraphqlClientError::Protocol { .. }));
    }
}
