//! GeminiClient against a local HTTP server.

use core_explain::{
    Explainer, GenerateError, GeminiClient, MAPPING_FAILED, QUESTION_EMPTY, TextGenerator,
};
use core_step::{Step, map};
use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

struct Captured {
    url: String,
    api_key: Option<String>,
    body: String,
}

/// Serve exactly one request with `status` and `body`, reporting what was received.
fn serve_once(status: u16, body: &'static str) -> (String, mpsc::Receiver<Captured>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("Failed to start test server");
    let port = server.server_addr().to_ip().unwrap().port();
    let endpoint = format!("http://127.0.0.1:{}/v1beta", port);
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        if let Ok(Some(mut request)) = server.recv_timeout(Duration::from_secs(5)) {
            let mut received = String::new();
            let _ = request.as_reader().read_to_string(&mut received);
            let api_key = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("x-goog-api-key"))
                .map(|h| h.value.as_str().to_string());
            let _ = tx.send(Captured {
                url: request.url().to_string(),
                api_key,
                body: received,
            });
            let response = tiny_http::Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .unwrap(),
                );
            let _ = request.respond(response);
        }
    });

    (endpoint, rx)
}

#[test]
fn posts_prompt_and_reads_first_candidate() {
    let (endpoint, rx) = serve_once(
        200,
        r#"{"candidates":[{"content":{"parts":[{"text":"It shifted right."}]}}]}"#,
    );
    let client = GeminiClient::new(endpoint, "secret-key", Duration::from_secs(5));
    let text = client.generate("gemini-2.5-flash", "why?").unwrap();
    assert_eq!(text, "It shifted right.");

    let captured = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(captured.url, "/v1beta/models/gemini-2.5-flash:generateContent");
    assert_eq!(captured.api_key.as_deref(), Some("secret-key"));
    let json: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(json["contents"][0]["parts"][0]["text"], "why?");
}

#[test]
fn non_success_status_is_an_error() {
    let (endpoint, _rx) = serve_once(403, r#"{"error":{"message":"denied"}}"#);
    let client = GeminiClient::new(endpoint, "bad", Duration::from_secs(5));
    match client.generate("m", "p") {
        Err(GenerateError::Status { code, body }) => {
            assert_eq!(code, 403);
            assert!(body.contains("denied"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn malformed_body_is_a_decode_error() {
    let (endpoint, _rx) = serve_once(200, "not json");
    let client = GeminiClient::new(endpoint, "k", Duration::from_secs(5));
    assert!(matches!(
        client.generate("m", "p"),
        Err(GenerateError::Decode(_))
    ));
}

#[test]
fn explainer_maps_http_outcomes_to_fixed_strings() {
    let (endpoint, _rx) = serve_once(500, "{}");
    let client = GeminiClient::new(endpoint, "k", Duration::from_secs(5));
    let explainer = Explainer::new(Some(Box::new(client)), "m");
    let step = Step::insert(2, "XYZ");
    assert_eq!(
        explainer.explain_mapping("HELLO", &step, 2, &map(2, &step)),
        MAPPING_FAILED
    );

    let (endpoint, _rx) = serve_once(200, r#"{"candidates":[]}"#);
    let client = GeminiClient::new(endpoint, "k", Duration::from_secs(5));
    let explainer = Explainer::new(Some(Box::new(client)), "m");
    assert_eq!(explainer.ask_question("anything"), QUESTION_EMPTY);
}
