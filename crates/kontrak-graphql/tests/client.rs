use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use kontrak_testkit::{LogCapture, MockGraphqlServer, init_test_tracing};
use serde_json::json;

use kontrak_graphql::{
    CachePolicy, CredentialSource, GraphqlClient, GraphqlClientError, GraphqlDocument,
    GraphqlTransport, TransportRequest, UploadFile, UploadRequest,
};

const TERMIN_QUERY: &str = "query Termin($id: Int) { termin(id: $id) { data { id } total } }";

struct StaticToken(&'static str);

impl CredentialSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

struct TestContext {
    test_name: String,
    module: String,
    capture: LogCapture,
    start_time: Instant,
    assertions_passed: u32,
}

impl TestContext {
    fn new(test_name: &str) -> Self {
        init_test_tracing();
        Self {
            test_name: test_name.to_string(),
            module: "kontrak-graphql::client".to_string(),
            capture: LogCapture::new(),
            start_time: Instant::now(),
            assertions_passed: 0,
        }
    }

    fn assert_true(&mut self, condition: bool, msg: &str) {
        assert!(condition, "{msg}");
        self.assertions_passed += 1;
    }

    fn assert_eq<T: std::fmt::Debug + PartialEq>(&mut self, actual: T, expected: T, msg: &str) {
        assert_eq!(actual, expected, "{msg}");
        self.assertions_passed += 1;
    }

    fn finalize(&self, details: Option<serde_json::Value>) {
        let duration_ms = u64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": "info",
            "test_name": self.test_name,
            "module": self.module,
            "phase": "verify",
            "result": "pass",
            "duration_ms": duration_ms,
            "assertions": { "passed": self.assertions_passed, "failed": 0 }
        });
        if let Some(extra) = details {
            entry["details"] = extra;
        }
        self.capture
            .push_value(&entry)
            .expect("structured test log entry");
        self.capture.assert_valid();
    }
}

fn termin_request(policy: CachePolicy) -> TransportRequest {
    TransportRequest::new(
        GraphqlDocument::parse(TERMIN_QUERY).expect("document"),
        json!({ "id": 7 }),
    )
    .with_cache_policy(policy)
}

fn client_for(server: &MockGraphqlServer) -> GraphqlClient {
    GraphqlClient::builder(server.endpoint())
        .with_service_name("test")
        .build()
        .expect("client")
}

#[tokio::test]
async fn query_returns_data_envelope() {
    let mut ctx = TestContext::new("query_returns_data_envelope");
    let server = MockGraphqlServer::start().await;
    server
        .expect_data(json!({ "termin": { "data": [{ "id": 1 }], "total": 1 } }))
        .await;

    let response = client_for(&server)
        .query(termin_request(CachePolicy::NoCache))
        .await
        .expect("query should succeed");

    ctx.assert_true(response.is_ok(), "expected no GraphQL errors");
    ctx.assert_eq(
        response.data.expect("data")["termin"]["total"].clone(),
        json!(1),
        "total mismatch",
    );
    ctx.finalize(None);
}

#[tokio::test]
async fn query_sends_variables_and_operation_name() {
    let mut ctx = TestContext::new("query_sends_variables_and_operation_name");
    let server = MockGraphqlServer::start().await;
    server
        .expect_data_for(
            json!({ "operationName": "Termin", "variables": { "id": 7 } }),
            json!({ "termin": { "data": [], "total": 0 } }),
        )
        .await;

    let response = client_for(&server)
        .query(termin_request(CachePolicy::NoCache))
        .await
        .expect("matching body should be answered");

    ctx.assert_true(response.is_ok(), "expected data");
    let body = server.last_json_body().await.expect("json body");
    ctx.assert_eq(body["query"].as_str(), Some(TERMIN_QUERY), "query text sent verbatim");
    ctx.finalize(None);
}

#[tokio::test]
async fn graphql_errors_are_returned_in_envelope() {
    let mut ctx = TestContext::new("graphql_errors_are_returned_in_envelope");
    let server = MockGraphqlServer::start().await;
    server
        .expect_errors(json!([{ "message": "tahun_input tidak valid", "extensions": { "code": "BAD_USER_INPUT" } }]))
        .await;

    let client = client_for(&server);
    let response = client
        .query(termin_request(CachePolicy::NoCache))
        .await
        .expect("errors envelope is not a transport failure");

    ctx.assert_eq(response.errors.len(), 1, "one error expected");
    ctx.assert_eq(
        response.errors[0].extension_code(),
        Some("BAD_USER_INPUT"),
        "extension code",
    );
    ctx.assert_eq(client.metrics().requests_error, 1, "error counted");
    ctx.finalize(None);
}

#[tokio::test]
async fn unauthorized_status_carries_body_errors() {
    let mut ctx = TestContext::new("unauthorized_status_carries_body_errors");
    let server = MockGraphqlServer::start().await;
    server
        .expect_status(
            401,
            json!({ "errors": [{ "message": "jwt expired", "extensions": { "code": "UNAUTHENTICATED" } }] }),
        )
        .await;

    let err = client_for(&server)
        .query(termin_request(CachePolicy::NoCache))
        .await
        .expect_err("401 must fail");

    ctx.assert_eq(err.status_code(), Some(401), "status code");
    ctx.assert_true(err.is_network(), "non-success status is a network error");
    ctx.assert_eq(err.network_errors().len(), 1, "body errors parsed");
    ctx.assert_eq(
        err.network_errors()[0].extension_code(),
        Some("UNAUTHENTICATED"),
        "body error code",
    );
    ctx.finalize(Some(json!({ "message": err.message() })));
}

#[tokio::test]
async fn html_error_page_yields_no_body_errors() {
    let mut ctx = TestContext::new("html_error_page_yields_no_body_errors");
    let server = MockGraphqlServer::start().await;
    server.expect_status(502, json!("bad gateway")).await;

    let err = client_for(&server)
        .query(termin_request(CachePolicy::NoCache))
        .await
        .expect_err("502 must fail");

    ctx.assert_true(
        matches!(err, GraphqlClientError::HttpStatus { .. }),
        "status error variant",
    );
    ctx.assert_true(err.network_errors().is_empty(), "no GraphQL errors in body");
    ctx.finalize(None);
}

#[tokio::test]
async fn bearer_token_comes_from_credential_source() {
    let mut ctx = TestContext::new("bearer_token_comes_from_credential_source");
    let server = MockGraphqlServer::start().await;
    server
        .expect_with_bearer("secret-token", json!({ "termin": { "data": [], "total": 0 } }))
        .await;

    let client = GraphqlClient::builder(server.endpoint())
        .with_credentials(Arc::new(StaticToken("secret-token")))
        .build()
        .expect("client");
    let response = client
        .query(termin_request(CachePolicy::NoCache))
        .await
        .expect("authorized request is answered");

    ctx.assert_true(response.is_ok(), "authorized response");
    ctx.finalize(None);
}

#[tokio::test]
async fn cache_first_serves_repeat_reads_from_cache() {
    let mut ctx = TestContext::new("cache_first_serves_repeat_reads_from_cache");
    let server = MockGraphqlServer::start().await;
    server
        .expect_data(json!({ "termin": { "data": [{ "id": 1 }], "total": 1 } }))
        .await;
    let client = client_for(&server);

    let first = client
        .query(termin_request(CachePolicy::CacheFirst))
        .await
        .expect("first read");
    let second = client
        .query(termin_request(CachePolicy::CacheFirst))
        .await
        .expect("second read");

    ctx.assert_eq(first.data, second.data, "cached data matches");
    ctx.assert_eq(server.request_count().await, 1, "one network request");
    ctx.assert_eq(client.metrics().cache_hits, 1, "one cache hit");
    ctx.finalize(None);
}

#[tokio::test]
async fn no_cache_always_hits_network() {
    let mut ctx = TestContext::new("no_cache_always_hits_network");
    let server = MockGraphqlServer::start().await;
    server
        .expect_data(json!({ "termin": { "data": [], "total": 0 } }))
        .await;
    let client = client_for(&server);

    for _ in 0..2 {
        client
            .query(termin_request(CachePolicy::NoCache))
            .await
            .expect("read");
    }

    ctx.assert_eq(server.request_count().await, 2, "two network requests");
    ctx.assert_true(client.cache().is_empty(), "no-cache leaves cache untouched");
    ctx.finalize(None);
}

#[tokio::test]
async fn mutations_bypass_cache() {
    let mut ctx = TestContext::new("mutations_bypass_cache");
    let server = MockGraphqlServer::start().await;
    server
        .expect_data(json!({ "termin": { "id": 3 } }))
        .await;
    let client = client_for(&server);
    let request = TransportRequest::new(
        GraphqlDocument::parse("mutation { termin(id: 3) { id } }").expect("document"),
        json!({}),
    )
    .with_cache_policy(CachePolicy::CacheFirst);

    client.mutate(request.clone()).await.expect("first write");
    client.mutate(request).await.expect("second write");

    ctx.assert_eq(server.request_count().await, 2, "writes always hit network");
    ctx.assert_true(client.cache().is_empty(), "writes are never cached");
    ctx.finalize(None);
}

#[tokio::test]
async fn upload_sends_multipart_operations_and_map() {
    let mut ctx = TestContext::new("upload_sends_multipart_operations_and_map");
    let server = MockGraphqlServer::start().await;
    server
        .expect_data(json!({ "dokumen": { "id": "doc-1" } }))
        .await;

    let request = UploadRequest {
        document: GraphqlDocument::parse(
            "mutation Upload($data: DokumenInput!) { dokumen(data: $data) { id } }",
        )
        .expect("document"),
        variables: json!({ "data": { "file": null, "terminId": "t-1" } }),
        file: UploadFile::new("kontrak.pdf", "application/pdf", b"%PDF-1.4".to_vec()),
        file_path: "variables.data.file".to_string(),
    };

    let response = client_for(&server)
        .upload(request)
        .await
        .expect("upload succeeds");
    ctx.assert_true(response.is_ok(), "upload response ok");

    let received = server.received_requests().await;
    let content_type = received[0]
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    ctx.assert_true(
        content_type.starts_with("multipart/form-data"),
        "multipart content type",
    );
    let body = String::from_utf8_lossy(&received[0].body).to_string();
    ctx.assert_true(body.contains("name=\"operations\""), "operations part");
    ctx.assert_true(body.contains("name=\"map\""), "map part");
    ctx.assert_true(body.contains("variables.data.file"), "file path mapped");
    ctx.assert_true(body.contains("filename=\"kontrak.pdf\""), "file part");
    ctx.assert_true(body.contains("%PDF-1.4"), "file bytes");
    ctx.finalize(None);
}
