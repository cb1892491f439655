//! Question generation via the DeepSeek chat-completions API.
//!
//! One request, one question. Failures never propagate to the caller:
//! `generate` maps every error to one of two literal fallback strings that
//! are delivered to the user in place of a question.

use crate::config::{
    Settings, DEEPSEEK_API_BASE, GENERATION_MAX_TOKENS, GENERATION_MODEL, GENERATION_TEMPERATURE,
    GENERATION_TIMEOUT_SECS, QUESTION_PROMPT,
};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Shown when the API answered but produced no usable question
pub const FALLBACK_NOT_GENERATED: &str = "Не удалось сгенерировать вопрос. Попробуйте позже.";

/// Shown when the API could not be reached at all (network error or timeout)
pub const FALLBACK_UNAVAILABLE: &str =
    "Извините, сервис генерации вопросов временно недоступен.";

/// Errors of a single generation request
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Connectivity failure or timeout before a response arrived
    #[error("network error: {0}")]
    Network(String),
    /// The API answered with a non-success status
    #[error("API error: {0}")]
    Api(String),
    /// The API answered 2xx but the body is not the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Client for generating one financial literacy question per call.
///
/// Model, temperature, token limit and prompt are fixed in
/// [`crate::config`]; only the credential and (for tests) the endpoint vary.
pub struct QuestionGenerator {
    http_client: HttpClient,
    api_key: Option<String>,
    api_base: String,
    timeout: Duration,
}

impl QuestionGenerator {
    /// Creates a generator pointed at the production DeepSeek endpoint.
    ///
    /// A missing API key is not an error here: the first request will come
    /// back non-OK and surface as the fallback text.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self::with_api_base(settings.deepseek_api_key.clone(), DEEPSEEK_API_BASE)
    }

    /// Creates a generator against a custom API base URL
    #[must_use]
    pub fn with_api_base(api_key: Option<String>, api_base: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_base: api_base.into(),
            timeout: Duration::from_secs(GENERATION_TIMEOUT_SECS),
        }
    }

    /// Overrides the request timeout (default 10 s)
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generates one question, falling back to a fixed apology string.
    ///
    /// Returns the generated text verbatim on success. On failure the error
    /// is logged and one of [`FALLBACK_NOT_GENERATED`] /
    /// [`FALLBACK_UNAVAILABLE`] is returned instead; no error ever reaches
    /// the caller and there are no retries.
    pub async fn generate(&self) -> String {
        match self.request_question().await {
            Ok(question) => question,
            Err(err @ GeneratorError::Network(_)) => {
                error!("Question generation request failed: {err}");
                FALLBACK_UNAVAILABLE.to_string()
            }
            Err(err) => {
                warn!("Question generation returned no usable question: {err}");
                FALLBACK_NOT_GENERATED.to_string()
            }
        }
    }

    async fn request_question(&self) -> Result<String, GeneratorError> {
        let url = format!("{}/chat/completions", self.api_base);
        let api_key = self.api_key.as_deref().unwrap_or_default();

        let body = json!({
            "model": GENERATION_MODEL,
            "messages": [{"role": "user", "content": QUESTION_PROMPT}],
            "temperature": GENERATION_TEMPERATURE,
            "max_tokens": GENERATION_MAX_TOKENS
        });

        let response = self
            .http_client
            .post(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            // Truncate very long error bodies before they reach the logs
            let truncated: String = error_text.chars().take(500).collect();
            return Err(GeneratorError::Api(format!("{status} - {truncated}")));
        }

        let payload: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeneratorError::Network(e.to_string())
            } else {
                GeneratorError::Malformed(e.to_string())
            }
        })?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| {
                GeneratorError::Malformed("missing choices[0].message.content".to_string())
            })
    }
}
