use std::sync::Arc;

use pretty_assertions::assert_eq;
use rlm_sandbox::HttpSandboxTransport;
use rstest::rstest;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::tests::test_helpers::{
    context_with_transport, create_test_context, AGGREGATED_ANSWER, GENERATED_CODE,
    SANDBOX_RESULT,
};
use crate::tools::{tools_call, tools_list, CallToolRequest, CallToolResult};

fn call(name: &str, arguments: Value) -> Option<CallToolRequest> {
    Some(CallToolRequest {
        name: name.to_string(),
        arguments: Some(arguments),
    })
}

fn payload(result: &CallToolResult) -> Value {
    assert_eq!(result.content.len(), 1);
    assert_eq!(result.content[0].content_type, "text");
    serde_json::from_str(&result.content[0].text).unwrap()
}

#[tokio::test]
async fn test_tools_list() {
    let response = tools_list(None).await.unwrap();

    let tool_names: Vec<&str> = response.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tool_names, vec!["rlm_execute", "rlm_explore", "sandbox_health"]);
    assert!(response.next_cursor.is_none());
}

#[rstest]
#[case("rlm_execute", vec!["query"])]
#[case("rlm_explore", vec!["query", "file_paths"])]
#[case("sandbox_health", vec![])]
#[tokio::test]
async fn test_tool_required_arguments(#[case] name: &str, #[case] required: Vec<&str>) {
    let response = tools_list(None).await.unwrap();
    let tool = response.tools.iter().find(|t| t.name == name).unwrap();

    assert_eq!(tool.input_schema.type_name, "object");
    assert_eq!(tool.input_schema.required, required);
    for field in &tool.input_schema.required {
        assert!(tool.input_schema.properties.contains_key(field));
    }
}

#[tokio::test]
async fn test_rlm_execute_returns_answer_and_trace() {
    let context = create_test_context();

    let result = tools_call(
        call(
            "rlm_execute",
            json!({
                "query": "What is the answer?",
                "context": {"notes.txt": "the answer is 42"},
                "max_depth": 2
            }),
        ),
        &context,
    )
    .await
    .unwrap();

    assert_eq!(result.is_error, Some(false));
    let body = payload(&result);
    assert_eq!(body["answer"], json!(SANDBOX_RESULT));
    assert_eq!(body["trace"][0]["code"], json!(GENERATED_CODE));
    assert_eq!(body["trace"][0]["depth"], json!(0));
    assert!(body["error"].is_null());

    // The session is released once the tool call returns
    assert!(context.orchestrator().sessions().is_empty());
}

#[tokio::test]
async fn test_rlm_execute_reports_validation_failure() {
    let context = create_test_context();

    let result = tools_call(
        call("rlm_execute", json!({"query": "q", "max_depth": 11})),
        &context,
    )
    .await
    .unwrap();

    assert_eq!(result.is_error, Some(true));
    let body = payload(&result);
    assert_eq!(body["answer"], json!(""));
    assert_eq!(body["error_kind"], json!("validation"));
}

#[tokio::test]
async fn test_rlm_execute_requires_query() {
    let context = create_test_context();

    let result = tools_call(
        call("rlm_execute", json!({"context": {"a": "b"}})),
        &context,
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_rlm_explore_over_files() {
    let dir = TempDir::new().unwrap();
    let relevant = dir.path().join("notes.txt");
    let noise = dir.path().join("noise.txt");
    std::fs::write(&relevant, "line one\nthe needle is here\nline three\n").unwrap();
    std::fs::write(&noise, "nothing\nto\nsee\n").unwrap();

    let context = create_test_context();
    let result = tools_call(
        call(
            "rlm_explore",
            json!({
                "query": "Where is it hidden?",
                "file_paths": [relevant, noise, dir.path().join("missing.txt")],
                "window_size": 10,
                "overlap": 2,
                "max_concurrent": 2
            }),
        ),
        &context,
    )
    .await
    .unwrap();

    assert_eq!(result.is_error, Some(false));
    let body = payload(&result);
    assert_eq!(body["answer"], json!(AGGREGATED_ANSWER));
    assert_eq!(body["chunks_processed"], json!(2));
    assert_eq!(body["chunks_relevant"], json!(1));
    assert_eq!(body["relevant_chunks"][0]["summary"], json!("Mentions the needle"));
}

#[tokio::test]
async fn test_rlm_explore_rejects_bad_window() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, "needle\n").unwrap();

    let context = create_test_context();
    let result = tools_call(
        call(
            "rlm_explore",
            json!({
                "query": "q",
                "file_paths": [file],
                "window_size": 5,
                "overlap": 5
            }),
        ),
        &context,
    )
    .await
    .unwrap();

    assert_eq!(result.is_error, Some(true));
    assert!(payload(&result)["error"].is_string());
}

#[tokio::test]
async fn test_sandbox_health_stub() {
    let context = create_test_context();

    let result = tools_call(call("sandbox_health", json!({})), &context)
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(false));
    assert_eq!(payload(&result)["status"], json!("healthy"));
}

#[tokio::test]
async fn test_sandbox_health_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "healthy", "service": "rlm-sandbox"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpSandboxTransport::new(server.uri(), 5).unwrap();
    let context = context_with_transport(Arc::new(transport));

    let result = tools_call(
        Some(CallToolRequest {
            name: "sandbox_health".to_string(),
            arguments: None,
        }),
        &context,
    )
    .await
    .unwrap();

    assert_eq!(result.is_error, Some(false));
    assert_eq!(payload(&result)["service"], json!("rlm-sandbox"));
}

#[tokio::test]
async fn test_sandbox_health_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = HttpSandboxTransport::new(server.uri(), 5).unwrap();
    let context = context_with_transport(Arc::new(transport));

    let result = tools_call(call("sandbox_health", json!({})), &context)
        .await
        .unwrap();

    assert_eq!(result.is_error, Some(true));
    let body = payload(&result);
    assert_eq!(body["status"], json!("unreachable"));
    assert!(body["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn test_unknown_tool() {
    let context = create_test_context();

    let result = tools_call(call("delete_everything", json!({})), &context).await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Unknown tool"));
}

#[tokio::test]
async fn test_missing_call_parameters() {
    let context = create_test_context();
    assert!(tools_call(None, &context).await.is_err());
}
