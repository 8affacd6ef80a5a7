//! Optional LLM-backed splitting of free text into coupon fields.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::normalize::{clean_optional, clean_terms, truncate_chars};

const MAX_INPUT_CHARS: usize = 8_000;

const SYSTEM_PROMPT: &str = "You split raw coupon text into fields. Return a JSON object with \
keys: description (one-sentence offer summary), terms (terms and conditions, newline separated), \
code (the coupon code or null), expiry (expiry date text or null). Use null for anything absent. \
Never invent values.";

#[derive(Debug, Error)]
pub enum SegregationError {
    #[error("segregation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("segregation API returned HTTP {status}")]
    Status { status: u16 },

    #[error("malformed segregation response: {0}")]
    Malformed(String),
}

/// Structured fields recovered from free-form coupon text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegregatedFields {
    pub description: Option<String>,
    pub terms: Option<String>,
    pub code: Option<String>,
    pub expiry: Option<String>,
}

#[async_trait]
pub trait FieldSegregator: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SegregationError`] on transport, status or parse failure.
    /// Callers fall back to deterministic normalization.
    async fn segregate(&self, raw_text: &str) -> Result<SegregatedFields, SegregationError>;
}

/// Chat-completions backed segregator using JSON response mode.
#[derive(Debug, Clone)]
pub struct OpenAiSegregator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiSegregator {
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: String, model: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client whose requests give up after `timeout`, so a stalled endpoint
    /// cannot hold up normalization.
    ///
    /// # Errors
    ///
    /// Returns [`SegregationError::Http`] if the client cannot be built.
    pub fn client_with_timeout(timeout: Duration) -> Result<reqwest::Client, SegregationError> {
        Ok(reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?)
    }

    /// `Ok(None)` unless segregation is enabled and an API key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SegregationError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &cpdb_core::AppConfig) -> Result<Option<Self>, SegregationError> {
        let Some(api_key) = config
            .openai_api_key
            .clone()
            .filter(|_| config.segregation_available())
        else {
            return Ok(None);
        };
        let client =
            Self::client_with_timeout(Duration::from_secs(config.segregation_timeout_secs))?;
        Ok(Some(Self::new(
            client,
            api_key,
            config.segregation_model.clone(),
            config.segregation_base_url.clone(),
        )))
    }
}

#[async_trait]
impl FieldSegregator for OpenAiSegregator {
    async fn segregate(&self, raw_text: &str) -> Result<SegregatedFields, SegregationError> {
        let body = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": truncate_chars(raw_text, MAX_INPUT_CHARS) }
            ]
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SegregationError::Status {
                status: status.as_u16(),
            });
        }

        let payload: Value = response.json().await?;
        let content = payload
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| SegregationError::Malformed("missing choices[0].message.content".to_string()))?;

        parse_fields(content)
    }
}

fn parse_fields(content: &str) -> Result<SegregatedFields, SegregationError> {
    let parsed: Value =
        serde_json::from_str(content).map_err(|e| SegregationError::Malformed(e.to_string()))?;
    if !parsed.is_object() {
        return Err(SegregationError::Malformed(
            "expected a JSON object".to_string(),
        ));
    }

    let field = |key: &str| clean_optional(parsed.get(key).and_then(Value::as_str));
    let terms = parsed
        .get("terms")
        .and_then(Value::as_str)
        .and_then(clean_terms);

    Ok(SegregatedFields {
        description: field("description"),
        terms,
        code: field("code"),
        expiry: field("expiry"),
    })
}
