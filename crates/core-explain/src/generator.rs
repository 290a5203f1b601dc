use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server returned status {code}")]
    Status { code: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// A remote (or fake) text model. Implementations block until the reply arrives.
pub trait TextGenerator: Send + Sync {
    /// Stable identifier for logs.
    fn name(&self) -> &'static str;
    /// Returns the model's text; an empty string means the model produced nothing.
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerateError>;
}
