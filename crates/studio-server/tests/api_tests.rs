use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use studio_core::{Studio, StudioConfig};
use studio_providers::ProviderSettings;
use studio_server::{routes, AppState, MAX_BODY_BYTES};
use studio_test_utils::{heuristic_studio, ScriptedInvoker, B2B_IDEA};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use warp::http::StatusCode;

fn state(studio: Studio) -> AppState {
    AppState::new(studio, &ProviderSettings::default())
}

fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

async fn post(state: AppState, path: &str, payload: &Value) -> warp::http::Response<warp::hyper::body::Bytes> {
    warp::test::request()
        .method("POST")
        .path(path)
        .json(payload)
        .reply(&routes(state))
        .await
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let response = warp::test::request()
        .method("GET")
        .path("/api/health")
        .reply(&routes(state(heuristic_studio())))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body(&response),
        json!({
            "ok": true,
            "service": "ai-pro-bono-studio",
            "modelWrapperConfigured": false,
            "structuredOutputEnabled": false,
            "langfuseEnabled": false,
            "invocationStrategy": "heuristic",
            "appealTokenLimit": 220,
        })
    );
}

#[tokio::test]
async fn test_submit_returns_run_and_limit() {
    let response = post(
        state(heuristic_studio()),
        "/api/idea-to-poc",
        &json!({ "idea": B2B_IDEA, "founderName": "Ada", "targetUser": "Finance teams" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let run = body(&response);
    assert_eq!(run["decision"], "APPROVED");
    assert_eq!(run["appealTokenLimit"], 220);
    assert_eq!(run["agents"].as_array().unwrap().len(), 4);
    assert_eq!(run["agents"][0]["agent"], "economic_judge");
    assert_eq!(run["nextActions"], json!([]));
    assert!(run["poc"]["html"].as_str().unwrap().contains("<html"));
}

#[tokio::test]
async fn test_missing_idea_never_runs_pipeline() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let studio = Studio::new(StudioConfig::default(), invoker.clone());

    let response = post(state(studio), "/api/idea-to-poc", &json!({ "idea": "   " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response), json!({ "error": "idea is required" }));
    assert!(invoker.invoked().is_empty());
}

#[tokio::test]
async fn test_non_string_idea_is_treated_as_missing() {
    let response = post(state(heuristic_studio()), "/api/idea-to-poc", &json!({ "idea": 12 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response)["error"], "idea is required");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let response = warp::test::request()
        .method("POST")
        .path("/api/idea-to-poc")
        .header("content-type", "application/json")
        .body("{\"idea\": ")
        .reply(&routes(state(heuristic_studio())))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response), json!({ "error": "Invalid JSON body" }));
}

#[tokio::test]
async fn test_appeal_within_budget_is_accepted() {
    let response = post(
        state(heuristic_studio()),
        "/api/appeal",
        &json!({
            "idea": B2B_IDEA,
            "founderName": "Ada",
            "targetUser": "Finance teams",
            "appeal": "Three paying pilots already signed.",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let outcome = body(&response);
    assert_eq!(outcome["appealAccepted"], true);
    assert_eq!(outcome["appealTokensUsed"], 9);
    assert_eq!(outcome["appealTokenLimit"], 220);
    assert_eq!(outcome["decision"], "APPROVED");
}

#[tokio::test]
async fn test_over_budget_appeal_reports_usage() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let studio = Studio::new(StudioConfig::new().with_appeal_token_limit(4), invoker.clone());

    let response = post(
        state(studio),
        "/api/appeal",
        &json!({ "idea": B2B_IDEA, "appeal": "a".repeat(40) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body(&response),
        json!({
            "error": "Appeal is over token limit (10/4)",
            "appealTokensUsed": 10,
            "appealTokenLimit": 4,
        })
    );
    assert!(invoker.invoked().is_empty());
}

#[tokio::test]
async fn test_appeal_without_argument_is_rejected() {
    let response = post(state(heuristic_studio()), "/api/appeal", &json!({ "idea": B2B_IDEA })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response), json!({ "error": "idea and appeal are required" }));
}

#[tokio::test]
async fn test_paid_override_is_recorded() {
    let studio = heuristic_studio();
    let response = post(
        state(studio.clone()),
        "/api/paid-override",
        &json!({
            "idea": B2B_IDEA,
            "founderName": "Ada",
            "email": "ada@example.com",
            "notes": "Happy to pay for a review",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let receipt = body(&response);
    assert_eq!(receipt["accepted"], true);
    assert_eq!(receipt["record"]["status"], "PENDING_CONTACT");
    assert_eq!(receipt["record"]["email"], "ada@example.com");
    assert!(receipt["record"]["id"].as_str().unwrap().starts_with("po_"));
    assert_eq!(studio.override_records().len(), 1);
}

#[tokio::test]
async fn test_paid_override_requires_email() {
    let studio = heuristic_studio();
    let response = post(
        state(studio.clone()),
        "/api/paid-override",
        &json!({ "idea": B2B_IDEA, "email": "" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response), json!({ "error": "idea and email are required" }));
    assert!(studio.override_records().is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let response = warp::test::request()
        .method("GET")
        .path("/api/nope")
        .reply(&routes(state(heuristic_studio())))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&response), json!({ "error": "Not found" }));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let payload = vec![b' '; usize::try_from(MAX_BODY_BYTES).unwrap() + 1];
    let response = warp::test::request()
        .method("POST")
        .path("/api/idea-to-poc")
        .body(payload)
        .reply(&routes(state(heuristic_studio())))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body(&response)["error"], "Request body too large");
}

#[tokio::test]
async fn test_chunked_body_without_length_is_accepted() {
    let (addr, server) =
        warp::serve(routes(state(heuristic_studio()))).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let payload = json!({ "idea": B2B_IDEA }).to_string();
    let request = format!(
        "POST /api/idea-to-poc HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\n\
         transfer-encoding: chunked\r\nconnection: close\r\n\r\n{:x}\r\n{}\r\n0\r\n\r\n",
        payload.len(),
        payload
    );
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).await.unwrap();

    assert!(reply.starts_with("HTTP/1.1 200"), "{}", reply);
    assert!(reply.contains("\"decision\":\"APPROVED\""), "{}", reply);
}
