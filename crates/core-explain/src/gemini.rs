//! `generateContent` REST client.

use crate::generator::{GenerateError, TextGenerator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize, Default)]
struct ReplyPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: ReplyContent,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate (empty when there is none).
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

pub struct GeminiClient {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

impl TextGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerateError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let response = self
            .agent
            .post(&self.url(model))
            .set("x-goog-api-key", &self.api_key)
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => GenerateError::Status {
                    code,
                    body: resp.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(t) => GenerateError::Transport(t.to_string()),
            })?;
        let parsed: GenerateResponse = response
            .into_json()
            .map_err(|e| GenerateError::Decode(e.to_string()))?;
        Ok(parsed.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hi" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"contents": [{"parts": [{"text": "hi"}]}]}));
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}},{"content":{"parts":[{"text":"ignored"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text(), "ab");
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), "");
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[test]
    fn url_trims_trailing_slash() {
        let c = GeminiClient::new("http://localhost:1/v1beta/", "k", Duration::from_secs(1));
        assert_eq!(
            c.url("gemini-2.5-flash"),
            "http://localhost:1/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
