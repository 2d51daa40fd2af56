//! Claude API integration for the sleep tracker.
//!
//! Packages the caller-supplied records and statistics into a single prompt,
//! issues one Messages API request, and returns the model's text verbatim.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ADVICE_MAX_TOKENS: u32 = 1024;
const ADVICE_TEMPERATURE: f32 = 0.7;

/// Advice bridge errors.
#[derive(Debug, Error)]
pub enum AdviceError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// The payload could not be serialized into the prompt.
    #[error("failed to serialize advice payload: {0}")]
    Payload(#[source] serde_json::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Records and precomputed statistics forwarded by the caller.
///
/// The bridge never recomputes these; whatever the caller supplies is what
/// the model sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvicePayload {
    pub sleeps: serde_json::Value,
    pub sleep_stats: serde_json::Value,
    pub weekly_sleep_stats: serde_json::Value,
    pub hour_distribution_stats: serde_json::Value,
}

/// Claude API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, AdviceError> {
        let api_key = api_key.into();

        if api_key.trim().is_empty() {
            return Err(AdviceError::InvalidApiKey {
                reason: "API key cannot be empty or whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(AdviceError::ClientBuild)?;

        Ok(Self { http, api_key })
    }

    /// Requests sleep advice for the given payload.
    ///
    /// The response may arrive as several text fragments; they are consumed
    /// to exhaustion and concatenated into one string, returned unmodified.
    pub async fn advice(&self, model: &str, payload: &AdvicePayload) -> Result<String, AdviceError> {
        let prompt = build_advice_prompt(payload)?;
        let request = MessageRequest {
            model: model.to_string(),
            max_tokens: ADVICE_MAX_TOKENS,
            temperature: ADVICE_TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| AdviceError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: MessageResponse = serde_json::from_str(&body)
            .map_err(|err| AdviceError::InvalidResponse(err.to_string()))?;
        extract_text(payload.content)
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

fn extract_text(blocks: Vec<ContentBlock>) -> Result<String, AdviceError> {
    let mut pieces = Vec::new();
    for block in blocks {
        let ContentBlock::Text { text } = block;
        pieces.push(text);
    }
    if pieces.is_empty() {
        return Err(AdviceError::InvalidResponse(
            "missing text content".to_string(),
        ));
    }
    Ok(pieces.concat())
}

fn parse_api_error(body: &str) -> Option<AdviceError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| AdviceError::Api {
            message: payload.error.message,
        })
}

fn build_advice_prompt(payload: &AdvicePayload) -> Result<String, AdviceError> {
    let serialized = serde_json::to_string_pretty(payload).map_err(AdviceError::Payload)?;
    let mut lines = Vec::new();
    lines.push(
        "You are a sleep coach. Review the sleep log below and give practical advice."
            .to_string(),
    );
    lines.push(
        "The data contains raw sleep records, daily averages for the last week, weekly totals, and an hour-of-day distribution of sleep starts and ends."
            .to_string(),
    );
    lines.push("Durations are in hours. Timestamps carry the sleeper's local offset.".to_string());
    lines.push(
        "Comment on total sleep, regularity of bed and wake times, and one or two concrete improvements."
            .to_string(),
    );
    lines.push(String::new());
    lines.push(serialized);
    Ok(lines.join("\n"))
}
