//! Endpoint orchestration for optimize, generate and describe.
//!
//! Each operation runs validate → credential check → one provider call →
//! post-process. Any failure short-circuits into an [`Error`] that the caller
//! turns into an error envelope. The app holds no per-request state.

use crate::ai::{
    CompletionService, DescribeService, GeminiDescribeClient, OpenAiChatClient,
    ReplicateDescribeClient,
};
use crate::models::{
    CompletionResult, Config, DescribeBackend, DescribeResponse, FormattedPrompt,
    OptimizeResponse, COMPLETION_CREDENTIAL_KEY,
};
use crate::{prompts, validation, Error, Result};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const EMPTY_OPTIMIZE_MESSAGE: &str = "未能生成优化后的提示词";
pub const EMPTY_GENERATE_MESSAGE: &str = "未能生成结果";
pub const EMPTY_DESCRIBE_MESSAGE: &str = "未能生成提示词，请重试";

/// Orchestrates the three operations over injected provider adapters.
///
/// A `None` adapter means its secret is not configured; operations needing it
/// fail with [`Error::Misconfiguration`] before any dispatch.
pub struct App {
    completion: Option<Box<dyn CompletionService>>,
    describer: Option<Box<dyn DescribeService>>,
    describe_backend: DescribeBackend,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub completion: Option<Box<dyn CompletionService>>,
    pub describer: Option<Box<dyn DescribeService>>,
    pub describe_backend: DescribeBackend,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices) -> Self {
        Self {
            completion: services.completion,
            describer: services.describer,
            describe_backend: services.describe_backend,
        }
    }

    /// Construct the production adapters from configuration.
    pub fn from_config(config: &Config) -> Self {
        let http_client = reqwest::Client::new();

        let completion = match &config.deepseek_api_key {
            Some(api_key) => {
                info!(
                    "Completion provider: {} (model: {})",
                    config.deepseek_base_url, config.deepseek_model
                );
                Some(Box::new(
                    OpenAiChatClient::new_with_client(
                        api_key.clone(),
                        config.deepseek_model.clone(),
                        http_client.clone(),
                    )
                    .with_base_url(config.deepseek_base_url.clone()),
                ) as Box<dyn CompletionService>)
            }
            None => {
                warn!(
                    "{} not set; optimize and generate will fail until it is configured",
                    COMPLETION_CREDENTIAL_KEY
                );
                None
            }
        };

        let describer = match config.describe_secret() {
            Some(secret) => {
                let describer: Box<dyn DescribeService> = match config.describe_backend {
                    DescribeBackend::Replicate => {
                        info!(
                            "Describe provider: Replicate (version: {})",
                            config.replicate_model_version
                        );
                        Box::new(ReplicateDescribeClient::new_with_client(
                            secret.to_string(),
                            config.replicate_model_version.clone(),
                            http_client,
                        ))
                    }
                    DescribeBackend::Gemini => {
                        info!("Describe provider: Gemini (model: {})", config.gemini_model);
                        Box::new(GeminiDescribeClient::new_with_client(
                            secret.to_string(),
                            config.gemini_model.clone(),
                            http_client,
                        ))
                    }
                };
                Some(describer)
            }
            None => {
                warn!(
                    "{} not set; describe will fail until it is configured",
                    config.describe_backend.credential_key()
                );
                None
            }
        };

        Self::with_services(AppServices {
            completion,
            describer,
            describe_backend: config.describe_backend,
        })
    }

    pub fn describe_backend(&self) -> DescribeBackend {
        self.describe_backend
    }

    pub fn completion_configured(&self) -> bool {
        self.completion.is_some()
    }

    pub fn describe_configured(&self) -> bool {
        self.describer.is_some()
    }

    fn completion(&self) -> Result<&dyn CompletionService> {
        self.completion
            .as_deref()
            .ok_or_else(|| Error::Misconfiguration {
                key: COMPLETION_CREDENTIAL_KEY.to_string(),
            })
    }

    fn describer(&self) -> Result<&dyn DescribeService> {
        self.describer
            .as_deref()
            .ok_or_else(|| Error::Misconfiguration {
                key: self.describe_backend.credential_key().to_string(),
            })
    }

    /// Expand a plain description into a general-purpose prompt.
    #[instrument(name = "optimize", skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn optimize(&self, payload: &Value) -> Result<OptimizeResponse> {
        let prompt = validation::validate_optimize(payload)?;
        let completion = self.completion()?;

        let raw = completion
            .complete(prompts::optimize_system(), &prompt)
            .await?;
        let result = CompletionResult::from_raw(&raw)
            .ok_or_else(|| Error::EmptyResult(EMPTY_OPTIMIZE_MESSAGE.to_string()))?;

        info!("Optimized prompt ({} chars)", result.text().chars().count());
        Ok(OptimizeResponse {
            optimized_prompt: result.into_text(),
        })
    }

    /// Expand a description into a prompt shaped for the requested family.
    #[instrument(name = "generate", skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn generate(&self, payload: &Value) -> Result<FormattedPrompt> {
        let request = validation::validate_generate(payload)?;
        let completion = self.completion()?;

        let raw = completion
            .complete(prompts::system_prompt_for(request.target_model), &request.raw_text)
            .await?;
        let result = CompletionResult::from_raw(&raw)
            .ok_or_else(|| Error::EmptyResult(EMPTY_GENERATE_MESSAGE.to_string()))?;

        info!(
            "Generated {} prompt ({} chars)",
            request.target_model.as_str(),
            result.text().chars().count()
        );
        Ok(prompts::format_completion(&request, result))
    }

    /// Derive a prompt from an image via the configured vision backend.
    #[instrument(name = "describe", skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn describe(&self, payload: &Value) -> Result<DescribeResponse> {
        let request = validation::validate_describe(payload)?;
        let describer = self.describer()?;

        let raw = describer.describe(&request).await?;
        let result = CompletionResult::from_raw(&raw)
            .ok_or_else(|| Error::EmptyResult(EMPTY_DESCRIBE_MESSAGE.to_string()))?;

        info!(
            "Described image via {:?} ({} chars)",
            self.describe_backend,
            result.text().chars().count()
        );
        Ok(DescribeResponse {
            prompt: result.into_text(),
        })
    }
}
