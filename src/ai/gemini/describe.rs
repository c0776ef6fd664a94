use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part};
use crate::ai::{mime, DescribeService, ProviderError};
use crate::models::{DescribeRequest, ImageEncoding};
use crate::{prompts, Result};
use async_trait::async_trait;
use base64::Engine as _;
use std::time::Duration;

/// MIME type assumed when the caller sends bare base64.
const DEFAULT_INLINE_MIME: &str = "image/jpeg";

pub const BASE64_REQUIRED_MESSAGE: &str = "请提供 base64 格式的图片数据";

const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "IMAGE_SAFETY",
];

/// Vision backend that sends inline image bytes to a Gemini multimodal model.
///
/// Only accepts inline data; remote URLs are rejected before any request is
/// made.
pub struct GeminiDescribeClient {
    http: GeminiHttpClient,
}

impl GeminiDescribeClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                model,
                Duration::from_secs(60),
                client,
            ),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    /// Resolve the request into a MIME type and decoded image bytes.
    fn inline_image(request: &DescribeRequest) -> std::result::Result<(String, Vec<u8>), ProviderError> {
        let (mime_type, payload) = match request.encoding {
            ImageEncoding::RemoteUrl => {
                return Err(ProviderError::UnsupportedInput(
                    BASE64_REQUIRED_MESSAGE.to_string(),
                ))
            }
            ImageEncoding::DataUrl => mime::parse_data_url(&request.image_payload).ok_or_else(
                || ProviderError::UnsupportedInput(BASE64_REQUIRED_MESSAGE.to_string()),
            )?,
            ImageEncoding::Base64Raw => (DEFAULT_INLINE_MIME, request.image_payload.as_str()),
        };

        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| ProviderError::UnsupportedInput(BASE64_REQUIRED_MESSAGE.to_string()))?;

        Ok((mime_type.to_string(), bytes))
    }

    fn extract_text(response: &GenerateContentResponse) -> std::result::Result<String, ProviderError> {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_ref())
        {
            return Err(ProviderError::SafetyRejected(format!(
                "Prompt blocked: {}",
                reason
            )));
        }

        let candidate = response.candidates.first().ok_or_else(|| {
            ProviderError::MalformedResponse("No candidates in Gemini response".to_string())
        })?;

        let text = candidate.content.as_ref().and_then(|content| {
            content.parts.iter().find_map(|p| match p {
                Part::Text { text } => Some(text.clone()),
                Part::InlineData { .. } => None,
            })
        });

        match (text, candidate.finish_reason.as_deref()) {
            (Some(text), _) => Ok(text),
            (None, Some(reason)) if BLOCKING_FINISH_REASONS.contains(&reason) => Err(
                ProviderError::SafetyRejected(format!("Candidate blocked: {}", reason)),
            ),
            // Blank text is the orchestrator's empty-result case, not a
            // provider failure.
            (None, _) => Ok(String::new()),
        }
    }
}

#[async_trait]
impl DescribeService for GeminiDescribeClient {
    async fn describe(&self, request: &DescribeRequest) -> Result<String> {
        let (mime_type, bytes) = Self::inline_image(request)?;

        tracing::debug!(
            "Describing image via Gemini (model: {}, {} bytes, {})",
            self.http.model(),
            bytes.len(),
            mime_type
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type,
                            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
                        },
                    },
                    Part::Text {
                        text: prompts::describe_instruction().to_string(),
                    },
                ],
            }],
        };

        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        Ok(Self::extract_text(&response)?)
    }
}
