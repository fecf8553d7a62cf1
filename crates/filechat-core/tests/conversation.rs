//! End-to-end conversation against a mock upload endpoint.

use std::sync::Arc;

use filechat_core::{Attachment, SubmissionController, SubmitError, Turn, UploadClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn controller_for(server: &MockServer) -> SubmissionController {
    let client = UploadClient::new(&server.uri()).unwrap();
    SubmissionController::new(Arc::new(client))
}

#[tokio::test]
async fn hello_gets_hi_there() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi there" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = controller_for(&server).await;
    controller.set_text("Hello");
    controller.submit().await.unwrap();

    assert_eq!(
        controller.transcript().turns(),
        &[Turn::user("Hello"), Turn::assistant("Hi there")]
    );
}

#[tokio::test]
async fn second_turn_sends_first_exchange_as_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(body_string_contains(r#"[{"role":"user","content":"Hello"},{"role":"assistant","content":"Hi there"}]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Second answer" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi there" })))
        .mount(&server)
        .await;

    let mut controller = controller_for(&server).await;
    controller.set_text("Hello");
    controller.submit().await.unwrap();
    controller.set_text("And the data?");
    controller.set_file(Some(Attachment::new("report.csv", b"a,b\n1,2\n".to_vec())));
    controller.submit().await.unwrap();

    let turns = controller.transcript().turns();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[3], Turn::assistant("Second answer"));
}

#[tokio::test]
async fn server_error_leaves_only_user_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut controller = controller_for(&server).await;
    controller.set_text("Hello");
    let err = controller.submit().await.unwrap_err();

    assert!(matches!(err, SubmitError::Communication(_)));
    assert_eq!(controller.transcript().turns(), &[Turn::user("Hello")]);
    assert!(!controller.in_flight());
}
