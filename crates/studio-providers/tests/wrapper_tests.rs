use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};
use studio_core::{AgentInvoker, InvocationError, RunContext, Stage, StageRequest, Submission};
use studio_providers::http::build_client;
use studio_providers::WrapperInvoker;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(stage: Stage) -> StageRequest {
    let context = Submission::new("Invoice bot")
        .with_founder("Ada")
        .with_target_user("SMB owners")
        .context();
    StageRequest::new(stage, "Invoice bot", context)
}

fn invoker(server: &MockServer, timeout: Duration) -> WrapperInvoker {
    WrapperInvoker::new(build_client().unwrap(), format!("{}/run", server.uri()), timeout)
}

#[tokio::test]
async fn test_posts_stage_prompt_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(bearer_token("wrapper-key"))
        .and(body_partial_json(json!({
            "agent": "economic_judge",
            "schemaHint": { "score": "number 0-100" },
            "input": { "idea": "Invoice bot", "context": { "targetUser": "SMB owners" } },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "json": { "decision": "GO", "score": 81 },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = invoker(&server, Duration::from_secs(5))
        .with_api_key("wrapper-key")
        .invoke(&request(Stage::EconomicJudge))
        .await
        .unwrap();
    assert_eq!(output["score"], 81);
}

#[tokio::test]
async fn test_poc_request_carries_prior_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(body_partial_json(json!({
            "agent": "poc_builder",
            "userPrompt": studio_core::invoker::POC_WRAPPER_PROMPT,
            "input": { "context": { "agentResults": [] } },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": "{\"title\":\"t\",\"summary\":\"s\",\"html\":\"<html></html>\"}",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = invoker(&server, Duration::from_secs(5))
        .invoke(&request(Stage::PocBuilder))
        .await
        .unwrap();
    assert_eq!(output["html"], "<html></html>");
}

#[tokio::test]
async fn test_text_field_is_tolerantly_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": "no json here",
            "text": "```json\n{\"decision\": \"NO_GO\"}\n```",
        })))
        .mount(&server)
        .await;

    let output = invoker(&server, Duration::from_secs(5))
        .invoke(&request(Stage::MarketCompetitor))
        .await
        .unwrap();
    assert_eq!(output["decision"], "NO_GO");
}

#[tokio::test]
async fn test_non_success_status_is_an_invocation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = invoker(&server, Duration::from_secs(5))
        .invoke(&request(Stage::ProductService))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Wrapper returned 502: bad gateway");
}

#[tokio::test]
async fn test_non_mapping_body_is_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "a", "mapping"])))
        .mount(&server)
        .await;

    let err = invoker(&server, Duration::from_secs(5))
        .invoke(&request(Stage::ProductService))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Wrapper response did not include a parseable JSON object"
    );
}

#[tokio::test]
async fn test_slow_wrapper_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "decision": "GO" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = invoker(&server, Duration::from_millis(50))
        .invoke(&request(Stage::EngineeringManager))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(
        err,
        InvocationError::Timeout {
            stage: Stage::EngineeringManager,
            timeout_ms: 50
        }
    ));
}

#[tokio::test]
async fn test_unreachable_wrapper_is_a_transport_error() {
    let invoker = WrapperInvoker::new(
        build_client().unwrap(),
        "http://127.0.0.1:9/run",
        Duration::from_secs(5),
    );
    let err = invoker
        .invoke(&StageRequest::new(Stage::EconomicJudge, "idea", RunContext::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, InvocationError::Transport(_)));
}

#[tokio::test]
async fn test_unbalanced_text_reply_resolves_quickly() {
    let server = MockServer::start().await;
    let text = "{".repeat(200_000);
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": text })))
        .mount(&server)
        .await;

    let started = Instant::now();
    let output = invoker(&server, Duration::from_secs(5))
        .invoke(&request(Stage::EconomicJudge))
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
    // no object inside the text, so the whole reply is the mapping
    assert_eq!(output["output"].as_str().map(str::len), Some(200_000));
}
