mod common;

use kontakt_common::KontaktError;
use kontakt_llm::ollama::OllamaClient;
use kontakt_llm::openai::OpenAiClient;
use kontakt_llm::traits::LlmClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn openai_chat_requests_json_object_and_returns_content() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "response_format": { "type": "json_object" },
            "temperature": 0.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{ "message": { "role": "assistant", "content": "{\"email\":\"#mail\"}" } }],
            "usage": { "total_tokens": 321 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::with_endpoint(
        "sk-test".into(),
        "gpt-4o-mini".into(),
        &format!("{}/v1", server.uri()),
    )
    .unwrap();

    let reply = client
        .generate("HTML: <form/>", Some("map fields"), None, Some(0.0))
        .await
        .unwrap();

    assert_eq!(reply.text, "{\"email\":\"#mail\"}");
    assert_eq!(reply.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    assert_eq!(reply.tokens_used, Some(321));
}

#[tokio::test]
async fn openai_api_errors_map_to_oracle_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "context too long"}})),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::with_endpoint(
        "sk-test".into(),
        "gpt-4o-mini".into(),
        &format!("{}/v1/", server.uri()),
    )
    .unwrap();

    let err = client.generate("x", None, None, None).await.unwrap_err();
    match err {
        KontaktError::OracleUnavailable(msg) => assert!(msg.contains("context too long")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn ollama_probes_and_generates_in_json_format() {
    common::init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"models": [{"name": "llama3.2:3b"}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3.2:3b",
            "format": "json",
            "stream": false,
            "system": "map fields"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "{\"phone\":\"#tel\"}",
            "eval_count": 12
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), "llama3.2:3b".into())
        .await
        .unwrap();
    assert!(client.health_check().await.unwrap());

    let reply = client
        .generate("HTML", Some("map fields"), Some(256), Some(0.0))
        .await
        .unwrap();
    assert_eq!(reply.text, "{\"phone\":\"#tel\"}");
    assert_eq!(reply.tokens_used, Some(12));
}

#[tokio::test]
async fn ollama_unreachable_server_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = OllamaClient::new(server.uri(), "llama3.2:3b".into()).await;
    assert!(matches!(result, Err(KontaktError::OracleUnavailable(_))));
}

#[cfg(feature = "e2e")]
#[tokio::test]
#[ignore]
async fn openai_generate_smoketest() {
    common::init_test_tracing();
    let Ok(key) = std::env::var("OPENAI_API_KEY") else {
        tracing::debug!("Skipping: OPENAI_API_KEY not set");
        return;
    };
    let client = OpenAiClient::new(key, kontakt_llm::DEFAULT_OPENAI_MODEL.into()).unwrap();
    let reply = client
        .generate("Return {\"ok\":true}", None, Some(16), Some(0.0))
        .await
        .unwrap();
    assert!(reply.text.contains("ok"));
}
