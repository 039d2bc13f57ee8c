mod common;

use common::Harness;
use kontrak_client::{
    ActiveUser, DOCUMENT_NUMBER_MESSAGE, DocumentNumberError, DocumentNumberGenerator,
    DocumentNumberRequest, SessionStore,
};
use kontrak_testkit::MockReply;
use serde_json::json;

fn session_with_unit(unit: i64) -> SessionStore {
    let session = SessionStore::in_memory();
    session
        .set_active_user(ActiveUser {
            role: Some("ppk".to_string()),
            scoped_model: Some(json!({"unit": {"id": unit}})),
            ..ActiveUser::default()
        })
        .expect("save");
    session
}

#[tokio::test]
async fn unit_falls_back_to_session_scope() {
    let mut h = Harness::with_session(session_with_unit(4));
    h.transport.push_data(json!({
        "generateAndCreateNomorDokumen": {"id": 1, "nomorLengkap": "001/BU/2025"}
    }));

    let generator = DocumentNumberGenerator::new(&h.ctx);
    let record = generator
        .generate(&DocumentNumberRequest::new(3).with_tanggal("2025-01-31"))
        .await
        .expect("generated");

    assert_eq!(record, Some(json!({"id": 1, "nomorLengkap": "001/BU/2025"})));
    assert_eq!(generator.data(), record);
    assert_eq!(
        h.transport.calls()[0].variables,
        json!({"jenisNomorId": 3, "unitId": 4, "tanggal": "2025-01-31"})
    );
    assert_eq!(h.drain_messages(), vec![DOCUMENT_NUMBER_MESSAGE]);
}

#[tokio::test]
async fn explicit_unit_wins() {
    let h = Harness::with_session(session_with_unit(4));
    h.transport.push_data(json!({"generateAndCreateNomorDokumen": {"id": 2}}));

    DocumentNumberGenerator::new(&h.ctx)
        .generate(&DocumentNumberRequest::new(3).with_unit(8))
        .await
        .expect("generated");
    assert_eq!(
        h.transport.calls()[0].variables,
        json!({"jenisNomorId": 3, "unitId": 8})
    );
}

#[tokio::test]
async fn missing_inputs_are_rejected_without_network() {
    let h = Harness::new();
    let generator = DocumentNumberGenerator::new(&h.ctx);

    assert_eq!(
        generator.generate(&DocumentNumberRequest::new(0).with_unit(1)).await,
        Err(DocumentNumberError::MissingJenisNomor)
    );
    assert_eq!(
        generator.generate(&DocumentNumberRequest::new(3)).await,
        Err(DocumentNumberError::MissingUnit)
    );
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn server_failure_is_classified() {
    let h = Harness::with_session(session_with_unit(4));
    h.transport.push(MockReply::graphql_errors(&["jenis nomor tidak aktif"]));

    let generator = DocumentNumberGenerator::new(&h.ctx);
    let err = generator
        .generate(&DocumentNumberRequest::new(3))
        .await
        .expect_err("fails");
    match err {
        DocumentNumberError::Failed(classified) => {
            assert_eq!(classified.message, "jenis nomor tidak aktif");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(generator.error().is_some());
}
