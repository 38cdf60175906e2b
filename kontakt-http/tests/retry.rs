use kontakt_http::{HttpClient, HttpError, RequestOpts};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/", server.uri())).unwrap();
    let got: Value = client
        .get_json("status", RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(got["ok"], true);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("x-request-id", "req-42")
                .set_body_json(json!({"error": {"message": "bad key"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/", server.uri())).unwrap();
    let err = client
        .post_json::<_, Value>("chat", Some("sk-test"), &json!({"q": 1}))
        .await
        .unwrap_err();

    match err {
        HttpError::Api {
            status,
            message,
            request_id,
        } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "bad key");
            assert_eq!(request_id, "req-42");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn bearer_token_is_sent_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("authorization", "Bearer sk-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/", server.uri())).unwrap();
    let got: Value = client
        .post_json("chat", Some(" 'sk-abc' "), &json!({}))
        .await
        .unwrap();
    assert_eq!(got["ok"], 1);
}

#[tokio::test]
async fn get_text_sends_browser_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/kontakt"))
        .and(header("user-agent", kontakt_http::BROWSER_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::detached()
        .unwrap()
        .with_timeout(Duration::from_secs(2));
    let body = client
        .get_text(&format!("{}/kontakt", server.uri()), RequestOpts::default())
        .await
        .unwrap();
    assert_eq!(body, "<form></form>");
}

#[tokio::test]
async fn exhausted_retries_surface_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&server)
        .await;

    let client = HttpClient::new(&format!("{}/", server.uri()))
        .unwrap()
        .with_retries(1);
    let err = client
        .get_text("flaky", RequestOpts::default())
        .await
        .unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
}
