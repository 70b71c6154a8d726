use serde_json::json;
use std::time::Duration;
use studio_core::{AgentInvoker, InvocationError, Stage, StageRequest, Submission};
use studio_providers::http::build_client;
use studio_providers::StructuredInvoker;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(stage: Stage) -> StageRequest {
    let context = Submission::new("Invoice bot")
        .with_target_user("SMB owners")
        .into_appeal("We have pilots")
        .context();
    StageRequest::new(stage, "Invoice bot", context).with_appeal_token_limit(220)
}

fn invoker(server: &MockServer) -> StructuredInvoker {
    StructuredInvoker::new(build_client().unwrap(), "test-model", "sk-test", Duration::from_secs(5))
        .with_base_url(format!("{}/v1/", server.uri()))
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }],
    })
}

#[tokio::test]
async fn test_sends_schema_and_validates_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": "economic_judge", "strict": true },
            },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"decision":"GO","score":88,"strengths":["a"],"risks":[],"assumptions":[]}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let output = invoker(&server)
        .invoke(&request(Stage::EconomicJudge))
        .await
        .unwrap();
    assert_eq!(output["score"], 88);

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = received[0].body_json().unwrap();
    let user = body["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("Appeal mode: true"));
    assert!(user.contains("Appeal argument: We have pilots"));
    assert!(user.contains("Appeal token limit: 220"));
    assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn test_missing_lists_default_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"{"decision":"GO","canBuildInWeeks":4}"#)),
        )
        .mount(&server)
        .await;

    let output = invoker(&server)
        .invoke(&request(Stage::EngineeringManager))
        .await
        .unwrap();
    assert_eq!(output["stack"], json!([]));
}

#[tokio::test]
async fn test_out_of_range_output_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"decision":"GO","mvpName":"m","timelineWeeks":30}"#,
        )))
        .mount(&server)
        .await;

    let err = invoker(&server)
        .invoke(&request(Stage::ProductService))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InvocationError::SchemaViolation {
            stage: Stage::ProductService,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unparseable_content_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("I cannot help")))
        .mount(&server)
        .await;

    let err = invoker(&server)
        .invoke(&request(Stage::MarketCompetitor))
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::Unparseable(_)));
}

#[tokio::test]
async fn test_upstream_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = invoker(&server)
        .invoke(&request(Stage::PocBuilder))
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::Status { status: 401, .. }));
}
