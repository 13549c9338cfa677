use crate::mcp::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

#[tokio::test]
async fn test_initialize_request() {
    let request = InitializeRequest {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ClientCapabilities {
            roots: Some(RootsCapability {
                list_changed: Some(true),
            }),
            sampling: None,
        },
        client_info: ClientInfo {
            name: "test-client".to_string(),
            version: "1.0.0".to_string(),
        },
    };

    let response = initialize(Some(request)).await.unwrap();
    assert_eq!(response.protocol_version, PROTOCOL_VERSION);
    assert_eq!(response.server_info.name, "rlm");
    assert!(response.capabilities.tools.is_some());
    assert!(response.capabilities.prompts.is_some());
    assert!(response.capabilities.resources.is_some());
}

#[tokio::test]
async fn test_initialize_without_request() {
    let response = initialize(None).await.unwrap();
    assert_eq!(response.protocol_version, PROTOCOL_VERSION);
    assert_eq!(response.server_info.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_initialize_result_uses_camel_case() {
    let response = initialize(None).await.unwrap();
    let value = serde_json::to_value(response).unwrap();

    assert!(value.get("protocolVersion").is_some());
    assert!(value.get("serverInfo").is_some());
    assert_eq!(value["capabilities"]["tools"]["listChanged"], json!(false));
}

#[rstest]
#[case(None)]
#[case(Some(json!({"test": "value"})))]
#[tokio::test]
async fn test_ping(#[case] params: Option<serde_json::Value>) {
    let response = ping(params).await.unwrap();
    assert_eq!(response, json!({}));
}

#[rstest]
#[case("debug")]
#[case("info")]
#[case("error")]
#[tokio::test]
async fn test_logging_set_level(#[case] level: &str) {
    let request = LoggingLevel {
        level: level.to_string(),
    };
    let response = logging_set_level(Some(request)).await.unwrap();
    assert_eq!(response, json!({}));
}

#[tokio::test]
async fn test_resources_and_prompts_are_empty() {
    let resources = resources_list(None).await.unwrap();
    assert_eq!(resources["resources"], json!([]));

    let prompts = prompts_list(None).await.unwrap();
    assert_eq!(prompts["prompts"], json!([]));
}
