use std::sync::Arc;

use kontrak_client::{
    ActiveUser, AppContext, ClientConfig, ErrorCode, FileSessionStorage, LOGOUT_PATH,
    OperationMode, OperationTarget, QueryOptions, SESSION_EXPIRED_MESSAGE, SessionStore,
};
use kontrak_testkit::{MockGraphqlServer, init_test_tracing};
use serde_json::json;

fn config_for(server: &MockGraphqlServer) -> ClientConfig {
    ClientConfig {
        endpoint: server.endpoint(),
        ..ClientConfig::default()
    }
}

fn signed_in(token: &str) -> SessionStore {
    let session = SessionStore::in_memory();
    session.set_token(token).expect("save");
    session
        .set_active_user(ActiveUser {
            email: Some("ppk@example.go.id".to_string()),
            role: Some("ppk".to_string()),
            ..ActiveUser::default()
        })
        .expect("save");
    session
}

#[tokio::test]
async fn bearer_token_comes_from_the_session() {
    init_test_tracing();
    let server = MockGraphqlServer::start().await;
    server
        .expect_with_bearer("abc", json!({"getAllTermin": [{"id": 1}]}))
        .await;

    let ctx = AppContext::builder(config_for(&server))
        .with_session(signed_in("abc"))
        .build()
        .expect("context");
    let query = ctx.query(
        OperationTarget::registry("termin", OperationMode::Get),
        json!({}),
        QueryOptions::default(),
    );
    query.settled().await;

    assert!(query.error().is_none(), "{:?}", query.error());
    assert_eq!(query.data(), Some(json!([{"id": 1}])));
    let body = server.last_json_body().await.expect("json body");
    assert!(body["query"].as_str().unwrap_or_default().contains("getAllTermin"));
}

#[tokio::test]
async fn unauthorized_response_ends_the_session() {
    init_test_tracing();
    let server = MockGraphqlServer::start().await;
    server
        .expect_status(
            401,
            json!({
                "errors": [{
                    "message": "Sesi berakhir",
                    "extensions": {"code": "UNAUTHENTICATED"}
                }]
            }),
        )
        .await;

    let ctx = AppContext::builder(config_for(&server))
        .with_session(signed_in("expired"))
        .build()
        .expect("context");
    let mut notifications = ctx.notifier().subscribe();

    let query = ctx.query(
        OperationTarget::registry("kontrak", OperationMode::Get),
        json!({"limit": 10}),
        QueryOptions::default(),
    );
    query.settled().await;

    let error = query.error().expect("error state");
    assert_eq!(error.message, "Sesi berakhir");
    assert_eq!(error.code, Some(ErrorCode::Text("UNAUTHENTICATED".to_string())));

    assert!(!ctx.session().is_authenticated());
    assert!(ctx.session().active_user().email.is_none());
    assert_eq!(ctx.navigator().current().as_deref(), Some(LOGOUT_PATH));

    let shown = notifications.try_recv().expect("notification");
    assert_eq!(shown.message, SESSION_EXPIRED_MESSAGE);
    assert!(notifications.try_recv().is_err(), "no generic error notification");
}

#[tokio::test]
async fn cache_first_query_hits_network_once() {
    init_test_tracing();
    let server = MockGraphqlServer::start().await;
    server
        .expect_data(json!({"getTermin": {"id": 7}}))
        .await;

    let ctx = AppContext::from_config(config_for(&server)).expect("context");
    let options = QueryOptions::default()
        .lazy()
        .with_cache_policy(kontrak_client::CachePolicy::CacheFirst);
    let query = ctx.query(
        OperationTarget::registry("termin", OperationMode::First),
        json!({"getTerminId": 7}),
        options,
    );

    let first = query.refetch(None).await.expect("network");
    let second = query.refetch(None).await.expect("cache");
    assert_eq!(first, second);
    assert_eq!(server.request_count().await, 1);
}

#[tokio::test]
async fn session_file_survives_reopen_and_logout_removes_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state").join("session.json");

    let session = SessionStore::restore(Arc::new(FileSessionStorage::new(&path))).expect("restore");
    session.set_token("persisted").expect("save");
    session
        .set_active_user(ActiveUser {
            role: Some("admin".to_string()),
            tahun_aktif: Some("2025".to_string()),
            ..ActiveUser::default()
        })
        .expect("save");
    assert!(path.exists());

    let reopened =
        SessionStore::restore(Arc::new(FileSessionStorage::new(&path))).expect("restore");
    assert_eq!(reopened.token().as_deref(), Some("persisted"));
    assert!(reopened.is_role_assigned());
    assert_eq!(reopened.active_user().tahun_aktif.as_deref(), Some("2025"));

    reopened.logout();
    assert!(!path.exists());
    reopened.logout();

    let empty = SessionStore::restore(Arc::new(FileSessionStorage::new(&path))).expect("restore");
    assert!(!empty.is_authenticated());
}
