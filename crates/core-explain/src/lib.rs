//! Natural-language explanations from a generative text model.
//!
//! `Explainer` builds a prompt, hands it to an injected `TextGenerator` and
//! always returns a displayable string: the model's reply, or one of the fixed
//! fallback messages below. Failures are logged (target `explain`) and never
//! surface as errors to the caller. There are no retries, no caching and no
//! streaming.
//!
//! Logs carry lengths and status codes only, never the prompt or document.

use core_config::ExplainConfig;
use core_step::{MappingResult, Position, Step};
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod gemini;
pub mod generator;

pub use gemini::GeminiClient;
pub use generator::{GenerateError, TextGenerator};

pub const MAPPING_NOT_CONFIGURED: &str = "API Key not configured. Please check your environment variables to enable AI explanations.";
pub const MAPPING_EMPTY: &str = "Could not generate explanation.";
pub const MAPPING_FAILED: &str = "Error connecting to AI tutor. Please try again later.";
pub const QUESTION_NOT_CONFIGURED: &str = "API Key not configured.";
pub const QUESTION_EMPTY: &str = "No response generated.";
pub const QUESTION_FAILED: &str = "Error answering question.";

/// Secondary variable consulted when the configured one is unset.
pub const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

pub struct Explainer {
    generator: Option<Box<dyn TextGenerator>>,
    model: String,
}

impl Explainer {
    pub fn new(generator: Option<Box<dyn TextGenerator>>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
        }
    }

    /// Build an explainer backed by `GeminiClient` when a credential is present
    /// in the environment, or an unconfigured one otherwise.
    pub fn from_config(cfg: &ExplainConfig) -> Self {
        Self::from_config_with(cfg, |name| std::env::var(name).ok())
    }

    /// Like `from_config` with an explicit variable lookup.
    pub fn from_config_with<F>(cfg: &ExplainConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = resolve_api_key(cfg, lookup);
        let generator: Option<Box<dyn TextGenerator>> = match key {
            Some(key) => {
                info!(target: "explain", model = cfg.model.as_str(), "explainer_configured");
                Some(Box::new(GeminiClient::new(
                    cfg.endpoint.clone(),
                    key,
                    Duration::from_secs(cfg.timeout_secs),
                )))
            }
            None => {
                info!(
                    target: "explain",
                    env = cfg.api_key_env.as_str(),
                    "explainer_unconfigured_missing_credential"
                );
                None
            }
        };
        Self::new(generator, cfg.model.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn explain_mapping(
        &self,
        doc_before: &str,
        step: &Step,
        tracked_pos: Position,
        result: &MappingResult,
    ) -> String {
        let Some(generator) = self.generator.as_ref() else {
            return MAPPING_NOT_CONFIGURED.to_string();
        };
        let prompt = mapping_prompt(doc_before, step, tracked_pos, result);
        self.run(generator.as_ref(), "mapping", &prompt, MAPPING_EMPTY, MAPPING_FAILED)
    }

    pub fn ask_question(&self, question: &str) -> String {
        let Some(generator) = self.generator.as_ref() else {
            return QUESTION_NOT_CONFIGURED.to_string();
        };
        let prompt = question_prompt(question);
        self.run(generator.as_ref(), "question", &prompt, QUESTION_EMPTY, QUESTION_FAILED)
    }

    fn run(
        &self,
        generator: &dyn TextGenerator,
        kind: &'static str,
        prompt: &str,
        empty: &str,
        failed: &str,
    ) -> String {
        debug!(
            target: "explain",
            kind,
            generator = generator.name(),
            model = self.model.as_str(),
            prompt_len = prompt.len(),
            "request"
        );
        match generator.generate(&self.model, prompt) {
            Ok(text) if text.is_empty() => {
                debug!(target: "explain", kind, "empty_reply");
                empty.to_string()
            }
            Ok(text) => {
                debug!(target: "explain", kind, reply_len = text.len(), "reply");
                text
            }
            Err(e) => {
                warn!(target: "explain", kind, error = %e, "request_failed");
                failed.to_string()
            }
        }
    }
}

/// First non-empty value among the configured variable and `GEMINI_API_KEY`.
pub fn resolve_api_key<F>(cfg: &ExplainConfig, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    [cfg.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
        .into_iter()
        .filter_map(|name| lookup(name))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

pub fn mapping_prompt(
    doc_before: &str,
    step: &Step,
    tracked_pos: Position,
    result: &MappingResult,
) -> String {
    let action = match step {
        Step::Insert { from, text } => format!("Insert \"{text}\" at index {from}"),
        Step::Delete { from, to } => format!("Delete from index {from} to {to}"),
    };
    let mut prompt = String::with_capacity(512);
    prompt.push_str("You are an expert ProseMirror engineer teaching a student.\n\n");
    prompt.push_str("Context:\n");
    prompt.push_str(&format!("- Original Document: \"{doc_before}\"\n"));
    prompt.push_str(&format!("- Action: {action}\n"));
    prompt.push_str(&format!("- Tracked Position (Before): {tracked_pos}\n"));
    prompt.push_str(&format!("- Mapped Position (After): {}\n", result.new_pos));
    if result.deleted {
        prompt.push_str("- NOTE: The position was inside a deleted range.\n");
    }
    prompt.push_str(&format!(
        "\nExplain WHY the position moved from {tracked_pos} to {} (or why it stayed the same) \
         in 1-2 short, conversational sentences suitable for a beginner. Use the term \"StepMap\" \
         if relevant but keep it simple.\n",
        result.new_pos
    ));
    prompt
}

pub fn question_prompt(question: &str) -> String {
    format!("You are a ProseMirror expert. Answer this question briefly and clearly: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_step::map;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    enum Reply {
        Text(&'static str),
        Fail,
    }

    #[derive(Clone)]
    struct FakeGenerator {
        reply: Reply,
        prompts: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeGenerator {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl TextGenerator for FakeGenerator {
        fn name(&self) -> &'static str {
            "fake"
        }
        fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerateError> {
            self.prompts
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            match self.reply {
                Reply::Text(t) => Ok(t.to_string()),
                Reply::Fail => Err(GenerateError::Transport("connection refused".into())),
            }
        }
    }

    fn explainer(reply: Reply) -> (Explainer, Arc<Mutex<Vec<(String, String)>>>) {
        let fake = FakeGenerator::new(reply);
        let prompts = fake.prompts.clone();
        (Explainer::new(Some(Box::new(fake)), "test-model"), prompts)
    }

    #[test]
    fn unconfigured_returns_placeholders() {
        let e = Explainer::new(None, "m");
        assert!(!e.is_configured());
        let step = Step::insert(2, "XYZ");
        let r = map(2, &step);
        assert_eq!(e.explain_mapping("HELLO", &step, 2, &r), MAPPING_NOT_CONFIGURED);
        assert_eq!(e.ask_question("why?"), QUESTION_NOT_CONFIGURED);
    }

    #[test]
    fn reply_is_passed_through_with_model_id() {
        let (e, prompts) = explainer(Reply::Text("Because it moved."));
        let step = Step::insert(2, "XYZ");
        let r = map(2, &step);
        assert_eq!(e.explain_mapping("HELLO", &step, 2, &r), "Because it moved.");
        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, "test-model");
        assert!(prompts[0].1.contains("Insert \"XYZ\" at index 2"));
    }

    #[test]
    fn empty_reply_uses_fixed_strings() {
        let (e, _) = explainer(Reply::Text(""));
        let step = Step::delete(1, 3);
        let r = map(1, &step);
        assert_eq!(e.explain_mapping("HELLO", &step, 1, &r), MAPPING_EMPTY);
        assert_eq!(e.ask_question("q"), QUESTION_EMPTY);
    }

    #[test]
    fn whitespace_reply_is_passed_through() {
        let (e, _) = explainer(Reply::Text("  "));
        assert_eq!(e.ask_question("q"), "  ");
    }

    #[test]
    fn failure_uses_fixed_strings() {
        let (e, _) = explainer(Reply::Fail);
        let step = Step::delete(1, 3);
        let r = map(4, &step);
        assert_eq!(e.explain_mapping("HELLO", &step, 4, &r), MAPPING_FAILED);
        assert_eq!(e.ask_question("q"), QUESTION_FAILED);
    }

    #[test]
    fn mapping_prompt_flags_deleted_positions() {
        let step = Step::delete(1, 3);
        let deleted = mapping_prompt("HELLO", &step, 2, &map(2, &step));
        assert!(deleted.contains("Delete from index 1 to 3"));
        assert!(deleted.contains("inside a deleted range"));
        assert!(deleted.contains("moved from 2 to 1"));
        let kept = mapping_prompt("HELLO", &step, 4, &map(4, &step));
        assert!(!kept.contains("inside a deleted range"));
        assert!(kept.contains("Mapped Position (After): 2"));
    }

    #[test]
    fn question_prompt_embeds_question() {
        let p = question_prompt("What is a StepMap?");
        assert!(p.ends_with("What is a StepMap?"));
    }

    #[test]
    fn api_key_resolution_order() {
        let cfg = ExplainConfig::default();
        let both = |name: &str| match name {
            "API_KEY" => Some("primary".to_string()),
            "GEMINI_API_KEY" => Some("secondary".to_string()),
            _ => None,
        };
        assert_eq!(resolve_api_key(&cfg, both).as_deref(), Some("primary"));
        let blank_primary = |name: &str| match name {
            "API_KEY" => Some("  ".to_string()),
            "GEMINI_API_KEY" => Some("secondary".to_string()),
            _ => None,
        };
        assert_eq!(resolve_api_key(&cfg, blank_primary).as_deref(), Some("secondary"));
        assert_eq!(resolve_api_key(&cfg, |_| None), None);
    }

    #[test]
    fn from_config_without_key_is_unconfigured() {
        let e = Explainer::from_config_with(&ExplainConfig::default(), |_| None);
        assert!(!e.is_configured());
        assert_eq!(e.model(), "gemini-2.5-flash");
        let e = Explainer::from_config_with(&ExplainConfig::default(), |_| Some("k".into()));
        assert!(e.is_configured());
    }

    #[derive(Clone)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failure_log_carries_no_document_text() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let writer = SharedWriter(buf.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let (e, _) = explainer(Reply::Fail);
        let step = Step::insert(0, "QQ");
        tracing::subscriber::with_default(subscriber, || {
            e.explain_mapping("TOPSECRET", &step, 3, &map(3, &step));
        });

        let logs = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("request_failed"), "missing failure event: {logs}");
        assert!(logs.contains("prompt_len="));
        assert!(!logs.contains("TOPSECRET"));
    }
}
