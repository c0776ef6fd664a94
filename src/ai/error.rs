//! Closed error type produced by every provider adapter.
//!
//! Adapters classify HTTP statuses and provider-specific error bodies into one
//! of these variants, so the orchestrator never probes response shapes itself.

use serde::Deserialize;
use thiserror::Error;

pub const QUOTA_MESSAGE: &str = "API 调用额度不足或请求过于频繁，请稍后重试";
pub const SAFETY_MESSAGE: &str = "内容未通过安全审核，请调整描述后重试";
pub const CREDENTIALS_MESSAGE: &str = "API 密钥无效，请检查服务端配置";
pub const TRANSPORT_MESSAGE: &str = "服务器错误，请稍后重试";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("content rejected by provider: {0}")]
    SafetyRejected(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("provider error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    pub fn status_code(&self) -> u16 {
        match self {
            ProviderError::QuotaExceeded(_) => 429,
            ProviderError::SafetyRejected(_) | ProviderError::UnsupportedInput(_) => 400,
            ProviderError::Status { status, .. } if (400..600).contains(status) => *status,
            ProviderError::Transport(_)
            | ProviderError::InvalidCredentials(_)
            | ProviderError::Status { .. }
            | ProviderError::MalformedResponse(_) => 500,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ProviderError::QuotaExceeded(_) => QUOTA_MESSAGE.to_string(),
            ProviderError::SafetyRejected(_) => SAFETY_MESSAGE.to_string(),
            ProviderError::InvalidCredentials(_) => CREDENTIALS_MESSAGE.to_string(),
            ProviderError::UnsupportedInput(message) => message.clone(),
            ProviderError::Status { message, .. } | ProviderError::MalformedResponse(message) => {
                format!("API 错误: {}", message)
            }
            ProviderError::Transport(_) => TRANSPORT_MESSAGE.to_string(),
        }
    }
}

/// Bodies are read as text and decoded separately, so anything reqwest itself
/// reports is a connection, timeout or read failure.
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// The error body shapes the supported providers return.
///
/// OpenAI-compatible and Gemini APIs nest an `error` object; Replicate uses a
/// flat `detail` string.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

/// Best-effort extraction of a readable message and a machine tag from a
/// provider error body.
pub(crate) fn parse_error_body(body: &str) -> (String, Option<String>) {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    if let Some(detail) = parsed.error {
        let tag = detail
            .status
            .or(detail.error_type)
            .or_else(|| match detail.code {
                Some(serde_json::Value::String(code)) => Some(code),
                _ => None,
            });
        let message = detail.message.unwrap_or_else(|| body.trim().to_string());
        return (message, tag);
    }

    if let Some(detail) = parsed.detail {
        return (detail, None);
    }

    (body.trim().to_string(), None)
}

fn mentions_safety(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    ["content_filter", "content_policy", "safety", "nsfw"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

fn mentions_bad_key(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    ["api key not valid", "api_key_invalid", "invalid api key", "authentication"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

/// Map a non-success HTTP response from any provider into a [`ProviderError`].
pub(crate) fn classify_status(status: u16, body: &str) -> ProviderError {
    let (message, tag) = parse_error_body(body);
    let tag = tag.unwrap_or_default();

    match status {
        401 | 403 => ProviderError::InvalidCredentials(message),
        // 402 is DeepSeek's and Replicate's "insufficient balance".
        402 | 429 => ProviderError::QuotaExceeded(message),
        _ if tag == "RESOURCE_EXHAUSTED" => ProviderError::QuotaExceeded(message),
        _ if tag == "UNAUTHENTICATED" || tag == "PERMISSION_DENIED" => {
            ProviderError::InvalidCredentials(message)
        }
        400 if mentions_bad_key(&message) || mentions_bad_key(body) => {
            ProviderError::InvalidCredentials(message)
        }
        400 | 422 if mentions_safety(&tag) || mentions_safety(&message) => {
            ProviderError::SafetyRejected(message)
        }
        _ => ProviderError::Status { status, message },
    }
}
