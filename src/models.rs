//! Data models and structures
//!
//! Defines the typed requests produced by validation, the prompt shapes
//! returned to callers, and the runtime configuration.

use crate::ai::mime;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Target image-model family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetModel {
    Mj,
    Sd,
}

impl TargetModel {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mj" => Some(TargetModel::Mj),
            "sd" => Some(TargetModel::Sd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetModel::Mj => "mj",
            TargetModel::Sd => "sd",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub raw_text: String,
    pub target_model: TargetModel,
    pub aspect_ratio: Option<String>,
    pub negative_prompt_seed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Base64Raw,
    DataUrl,
    RemoteUrl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribeRequest {
    pub image_payload: String,
    pub encoding: ImageEncoding,
}

impl DescribeRequest {
    /// Build a request, inferring the encoding from the payload prefix.
    pub fn new(image_payload: String) -> Self {
        let encoding = if image_payload.starts_with("data:") {
            ImageEncoding::DataUrl
        } else if image_payload.starts_with("http://") || image_payload.starts_with("https://") {
            ImageEncoding::RemoteUrl
        } else {
            ImageEncoding::Base64Raw
        };

        Self {
            image_payload,
            encoding,
        }
    }

    /// Payload as a data URL, assuming PNG for bare base64. Remote URLs are
    /// returned unchanged.
    pub fn to_data_url(&self) -> String {
        match self.encoding {
            ImageEncoding::Base64Raw => mime::to_data_url("image/png", &self.image_payload),
            ImageEncoding::DataUrl | ImageEncoding::RemoteUrl => self.image_payload.clone(),
        }
    }
}

/// Trimmed, non-empty text returned by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    raw_text: String,
}

impl CompletionResult {
    /// Returns `None` when the provider answered with blank text.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self {
                raw_text: trimmed.to_string(),
            })
        }
    }

    pub fn text(&self) -> &str {
        &self.raw_text
    }

    pub fn into_text(self) -> String {
        self.raw_text
    }
}

/// Model-specific prompt, serialized as the `generate` response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum FormattedPrompt {
    Mj {
        prompt: String,
    },
    Sd {
        #[serde(rename = "positivePrompt")]
        positive_prompt: String,
        #[serde(rename = "negativePrompt")]
        negative_prompt: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeResponse {
    pub optimized_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DescribeResponse {
    pub prompt: String,
}

/// Uniform failure body. The status travels alongside but is not serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip)]
    pub status: u16,
}

/// Which vision backend serves `describe` in this deployment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DescribeBackend {
    Replicate,
    Gemini,
}

impl DescribeBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replicate" => Some(DescribeBackend::Replicate),
            "gemini" => Some(DescribeBackend::Gemini),
            _ => None,
        }
    }

    /// Environment variable holding this backend's secret.
    pub fn credential_key(&self) -> &'static str {
        match self {
            DescribeBackend::Replicate => "REPLICATE_API_TOKEN",
            DescribeBackend::Gemini => "GEMINI_API_KEY",
        }
    }
}

pub const COMPLETION_CREDENTIAL_KEY: &str = "DEEPSEEK_API_KEY";

const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";
const DEFAULT_REPLICATE_VERSION: &str =
    "50adaf2d3ad20a6f911a8a9e3ccf777b263b8596f7047d685e3cbf4c6362b638";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub deepseek_api_key: Option<String>,
    pub deepseek_base_url: String,
    pub deepseek_model: String,
    pub describe_backend: DescribeBackend,
    pub replicate_api_token: Option<String>,
    pub replicate_model_version: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    ///
    /// A missing `.env` is fine; an unreadable or malformed one is an error.
    pub fn from_env() -> crate::Result<Self> {
        tolerate_missing_dotenv(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Secrets are presence-checked per request, so blank counts as unset.
        let secret = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let describe_backend = match lookup("DESCRIBE_PROVIDER") {
            Some(value) => DescribeBackend::parse(&value).ok_or_else(|| {
                crate::Error::Generic(format!(
                    "DESCRIBE_PROVIDER must be 'replicate' or 'gemini', got '{}'",
                    value
                ))
            })?,
            None => DescribeBackend::Replicate,
        };

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| crate::Error::Generic(format!("Invalid BIND_ADDR: {}", e)))?;

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(value) => value
                .parse::<usize>()
                .map_err(|e| crate::Error::Generic(format!("Invalid MAX_BODY_BYTES: {}", e)))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            deepseek_api_key: secret(COMPLETION_CREDENTIAL_KEY),
            deepseek_base_url: lookup("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DEEPSEEK_BASE_URL.to_string()),
            deepseek_model: lookup("DEEPSEEK_MODEL")
                .unwrap_or_else(|| DEFAULT_DEEPSEEK_MODEL.to_string()),
            describe_backend,
            replicate_api_token: secret("REPLICATE_API_TOKEN"),
            replicate_model_version: lookup("REPLICATE_MODEL_VERSION")
                .unwrap_or_else(|| DEFAULT_REPLICATE_VERSION.to_string()),
            gemini_api_key: secret("GEMINI_API_KEY"),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            bind_addr,
            max_body_bytes,
        })
    }

    /// Secret for the configured describe backend, if present.
    pub fn describe_secret(&self) -> Option<&str> {
        match self.describe_backend {
            DescribeBackend::Replicate => self.replicate_api_token.as_deref(),
            DescribeBackend::Gemini => self.gemini_api_key.as_deref(),
        }
    }
}

fn tolerate_missing_dotenv<T>(loaded: Result<T, dotenvy::Error>) -> crate::Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_formatted_prompt_mj_serialization() {
        let prompt = FormattedPrompt::Mj {
            prompt: "A fluffy cat --ar 1:1 --v 6.0".to_string(),
        };
        let json = serde_json::to_value(&prompt).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "mj", "prompt": "A fluffy cat --ar 1:1 --v 6.0"})
        );
    }

    #[test]
    fn test_formatted_prompt_sd_serialization() {
        let prompt = FormattedPrompt::Sd {
            positive_prompt: "A fluffy cat".to_string(),
            negative_prompt: String::new(),
        };
        let json = serde_json::to_value(&prompt).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "sd", "positivePrompt": "A fluffy cat", "negativePrompt": ""})
        );
    }

    #[test]
    fn test_error_envelope_omits_status() {
        let envelope = ErrorEnvelope {
            error: "无效的模型参数".to_string(),
            status: 400,
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"error":"无效的模型参数"}"#);
    }

    #[test]
    fn test_describe_request_infers_encoding() {
        assert_eq!(
            DescribeRequest::new("data:image/webp;base64,AAAA".to_string()).encoding,
            ImageEncoding::DataUrl
        );
        assert_eq!(
            DescribeRequest::new("https://example.com/x.png".to_string()).encoding,
            ImageEncoding::RemoteUrl
        );
        assert_eq!(
            DescribeRequest::new("iVBORw0KGgo=".to_string()).encoding,
            ImageEncoding::Base64Raw
        );
    }

    #[test]
    fn test_describe_request_synthesizes_png_data_url() {
        let request = DescribeRequest::new("iVBORw0KGgo=".to_string());
        assert_eq!(request.to_data_url(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_completion_result_rejects_blank() {
        assert!(CompletionResult::from_raw("  \n ").is_none());
        assert_eq!(
            CompletionResult::from_raw("  A cat \n").unwrap().text(),
            "A cat"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.deepseek_api_key, None);
        assert_eq!(config.deepseek_base_url, "https://api.deepseek.com");
        assert_eq!(config.describe_backend, DescribeBackend::Replicate);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.max_body_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn test_config_treats_blank_secret_as_missing() {
        let config = Config::from_lookup(lookup_from(&[
            ("DEEPSEEK_API_KEY", "   "),
            ("DESCRIBE_PROVIDER", "gemini"),
            ("GEMINI_API_KEY", "g-key"),
        ]))
        .unwrap();
        assert_eq!(config.deepseek_api_key, None);
        assert_eq!(config.describe_backend, DescribeBackend::Gemini);
        assert_eq!(config.describe_secret(), Some("g-key"));
    }

    #[test]
    fn test_config_rejects_unknown_describe_provider() {
        let err = Config::from_lookup(lookup_from(&[("DESCRIBE_PROVIDER", "blip")])).unwrap_err();
        assert!(err.to_string().contains("DESCRIBE_PROVIDER"));
    }

    #[test]
    fn test_missing_dotenv_file_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = dotenvy::from_path(dir.path().join(".env"));
        assert!(tolerate_missing_dotenv(loaded).is_ok());
    }

    #[test]
    fn test_malformed_dotenv_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "PROMPT_OPTIMIZER_TEST_BROKEN=\"unterminated\n").unwrap();

        let err = tolerate_missing_dotenv(dotenvy::from_path(&path)).unwrap_err();
        assert!(matches!(err, crate::Error::EnvVar(_)));
        assert_eq!(err.status_code(), 500);
    }
}
