//! Remote completion client
//!
//! Issues the outbound chat-completion request with bearer auth and a fixed
//! referer, enforcing the per-minute quota before any network activity and
//! racing the whole exchange against a timeout. Provider responses and
//! failures are mapped onto [`CompletionError`].

use std::env;
use std::fmt;
use std::time::Duration;

use crate::api::{ApiErrorBody, ChatMessage, ChatRequest, ChatResponse, RateLimiter};
use crate::core::constants::{
    API_KEY_ENV, COMPLETION_BASE_URL, COMPLETION_REFERER, MIN_API_KEY_LEN, RATE_LIMIT_PER_MINUTE,
    RATE_LIMIT_WINDOW, REQUEST_TIMEOUT,
};

#[derive(Debug)]
pub enum CompletionError {
    /// The per-minute request quota is exhausted.
    RateLimited,

    /// The timeout race won before the provider answered.
    Timeout(Duration),

    /// No usable credential; the request was never issued.
    Unauthorized,

    /// The provider answered with a structured error payload.
    Provider(String),

    /// The provider answered successfully but returned no choices.
    EmptyResponse,

    /// Transport-level failure below the provider protocol.
    Network(reqwest::Error),
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::RateLimited => {
                write!(f, "Rate limit exceeded. Please try again later.")
            }
            CompletionError::Timeout(timeout) => {
                write!(f, "Request timed out after {}ms", timeout.as_millis())
            }
            CompletionError::Unauthorized => write!(f, "API key is not configured"),
            CompletionError::Provider(message) => write!(f, "API error: {message}"),
            CompletionError::EmptyResponse => {
                write!(f, "No response content received from API")
            }
            CompletionError::Network(source) => write!(f, "Request failed: {source}"),
        }
    }
}

impl std::error::Error for CompletionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompletionError::Network(source) => Some(source),
            _ => None,
        }
    }
}

pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    referer: String,
    api_key: Option<String>,
    timeout: Duration,
    limiter: RateLimiter,
}

impl CompletionClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: COMPLETION_BASE_URL.to_string(),
            referer: COMPLETION_REFERER.to_string(),
            api_key,
            timeout: REQUEST_TIMEOUT,
            limiter: RateLimiter::new(RATE_LIMIT_PER_MINUTE, RATE_LIMIT_WINDOW),
        }
    }

    /// Build a client from the environment-supplied credential.
    pub fn from_env() -> Self {
        Self::new(env::var(API_KEY_ENV).ok())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.limiter = RateLimiter::new(per_minute, RATE_LIMIT_WINDOW);
        self
    }

    fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|key| key.len() >= MIN_API_KEY_LEN)
    }

    /// Soft health probe: credential presence only, no network, no quota.
    pub fn test_connectivity(&self) -> bool {
        self.credential().is_some()
    }

    /// Send the conversation to the completion endpoint and return the first
    /// choice's text verbatim. Quota is consumed before the credential check,
    /// and both are consulted before any network activity.
    pub async fn send_completion(
        &self,
        model: &str,
        history: Vec<ChatMessage>,
    ) -> Result<String, CompletionError> {
        if !self.limiter.try_acquire() {
            return Err(CompletionError::RateLimited);
        }
        let key = self.credential().ok_or(CompletionError::Unauthorized)?;

        let request = ChatRequest {
            model: model.to_string(),
            messages: history,
        };
        let url = endpoint_url(&self.base_url, "chat/completions");

        let exchange = async {
            let response = self
                .http
                .post(url)
                .header("Authorization", format!("Bearer {key}"))
                .header("HTTP-Referer", &self.referer)
                .json(&request)
                .send()
                .await
                .map_err(CompletionError::Network)?;

            let status = response.status();
            let body = response.text().await.map_err(CompletionError::Network)?;
            decode_completion(status.is_success(), &body)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.timeout)),
        }
    }
}

/// Map a provider response body onto the error taxonomy. Error payloads win
/// over the HTTP status so the provider's own message text is preserved.
fn decode_completion(status_ok: bool, body: &str) -> Result<String, CompletionError> {
    if let Ok(error_body) = serde_json::from_str::<ApiErrorBody>(body) {
        return Err(CompletionError::Provider(collapse_whitespace(
            &error_body.error.message,
        )));
    }
    if !status_ok {
        return Err(CompletionError::Provider(extract_error_message(body)));
    }

    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|_| CompletionError::Provider(extract_error_message(body)))?;

    match parsed.choices.into_iter().next() {
        Some(choice) => Ok(choice.message.content),
        None => Err(CompletionError::EmptyResponse),
    }
}

/// Best-effort summary for bodies that do not follow the error schema.
fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty response body>".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let summary = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("error").and_then(|v| v.as_str()))
            .or_else(|| value.get("message").and_then(|v| v.as_str()));
        if let Some(summary) = summary {
            let collapsed = collapse_whitespace(summary);
            if !collapsed.is_empty() {
                return collapsed;
            }
        }
    }

    collapse_whitespace(trimmed)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
