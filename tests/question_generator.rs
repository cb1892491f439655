//! Question generator behavior against a mocked chat-completions endpoint.
//!
//! Covers the wire format of the outbound request and every fallback path:
//! non-OK status, malformed success body, unreachable service and timeout.

use fingram_bot::config::QUESTION_PROMPT;
use fingram_bot::llm::{QuestionGenerator, FALLBACK_NOT_GENERATED, FALLBACK_UNAVAILABLE};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generator_for(server_uri: &str) -> QuestionGenerator {
    QuestionGenerator::with_api_base(Some("sk-test-key".to_string()), server_uri)
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "deepseek-chat",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn generate_returns_content_verbatim_on_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-test-key"))
        .and(body_json(json!({
            "model": "deepseek-chat",
            "messages": [{"role": "user", "content": QUESTION_PROMPT}],
            "temperature": 0.7,
            "max_tokens": 500
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("Как вы планируете бюджет на месяц?")),
        )
        .mount(&server)
        .await;

    let generator = generator_for(&server.uri());
    assert_eq!(generator.generate().await, "Как вы планируете бюджет на месяц?");
}

#[tokio::test]
async fn generate_falls_back_on_non_ok_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let generator = generator_for(&server.uri());
    assert_eq!(generator.generate().await, FALLBACK_NOT_GENERATED);
}

#[tokio::test]
async fn generate_falls_back_on_malformed_success_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let generator = generator_for(&server.uri());
    assert_eq!(generator.generate().await, FALLBACK_NOT_GENERATED);
}

#[tokio::test]
async fn generate_falls_back_when_service_unreachable() {
    // Reserve a port, then close the listener so nothing answers on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let generator = generator_for(&format!("http://127.0.0.1:{port}"));
    assert_eq!(generator.generate().await, FALLBACK_UNAVAILABLE);
}

#[tokio::test]
async fn generate_falls_back_on_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("слишком поздно"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let generator = generator_for(&server.uri()).with_timeout(Duration::from_millis(200));
    assert_eq!(generator.generate().await, FALLBACK_UNAVAILABLE);
}
