//! Mock GraphQL endpoint for testing the HTTP transport.
//!
//! Wraps wiremock with the response shapes a GraphQL server produces.

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock endpoint is served from.
pub const GRAPHQL_PATH: &str = "/graphql";

/// A mock GraphQL server.
pub struct MockGraphqlServer {
    server: MockServer,
}

impl MockGraphqlServer {
    /// Start a new mock server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Full endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{GRAPHQL_PATH}", self.server.uri())
    }

    /// Underlying wiremock server for advanced configuration.
    #[must_use]
    pub const fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Answer every POST with `{"data": data}`.
    pub async fn expect_data(&self, data: Value) {
        self.mount(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
            .await;
    }

    /// Answer POSTs whose body contains `partial` with `{"data": data}`.
    pub async fn expect_data_for(&self, partial: Value, data: Value) {
        Mock::given(method("POST"))
            .and(path(GRAPHQL_PATH))
            .and(body_partial_json(partial))
            .respond_with(json_response(200, json!({ "data": data })))
            .mount(&self.server)
            .await;
    }

    /// Answer every POST with a 200 envelope carrying `errors`.
    pub async fn expect_errors(&self, errors: Value) {
        self.mount(json_response(200, json!({ "data": null, "errors": errors })))
            .await;
    }

    /// Answer every POST with `status` and `body`.
    pub async fn expect_status(&self, status: u16, body: Value) {
        self.mount(json_response(status, body)).await;
    }

    /// Answer POSTs carrying `Authorization: Bearer <token>` with `{"data": data}`.
    pub async fn expect_with_bearer(&self, token: &str, data: Value) {
        Mock::given(method("POST"))
            .and(path(GRAPHQL_PATH))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(json_response(200, json!({ "data": data })))
            .mount(&self.server)
            .await;
    }

    /// Answer every POST with `{"data": data}` after `delay`.
    pub async fn expect_delayed(&self, delay: Duration, data: Value) {
        self.mount(json_response(200, json!({ "data": data })).set_delay(delay))
            .await;
    }

    /// Number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.received_requests().await.len()
    }

    /// All received requests for manual inspection.
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Body of the last request parsed as JSON.
    pub async fn last_json_body(&self) -> Option<Value> {
        self.received_requests()
            .await
            .last()
            .and_then(|request| serde_json::from_slice(&request.body).ok())
    }

    async fn mount(&self, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(GRAPHQL_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }
}

fn json_response(status: u16, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_json(body)
        .insert_header("content-type", "application/json")
}
