use super::client::ReplicateHttpClient;
use super::types::{Prediction, PredictionInput, PredictionRequest, PredictionStatus};
use crate::ai::{DescribeService, ProviderError};
use crate::models::DescribeRequest;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_POLLS: u32 = 120;

/// Vision backend running an image-to-prompt model on Replicate.
///
/// Accepts data URLs, bare base64 (sent as a PNG data URL) and remote URLs.
pub struct ReplicateDescribeClient {
    http: ReplicateHttpClient,
    version: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl ReplicateDescribeClient {
    pub fn new(api_token: String, version: String) -> Self {
        Self::new_with_client(api_token, version, reqwest::Client::new())
    }

    pub fn new_with_client(api_token: String, version: String, client: reqwest::Client) -> Self {
        Self {
            http: ReplicateHttpClient::new_with_client(api_token, Duration::from_secs(60), client),
            version,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    /// Shorten the server-side wait before falling back to polling.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.http = self.http.with_wait(wait);
        self
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    async fn wait_for_completion(&self, mut prediction: Prediction) -> Result<Prediction> {
        let mut polls = 0;

        while !prediction.status.is_terminal() {
            if polls >= self.max_polls {
                return Err(ProviderError::Transport(format!(
                    "Prediction {} still {:?} after {} polls",
                    prediction.id, prediction.status, polls
                ))
                .into());
            }

            let url = prediction
                .urls
                .as_ref()
                .map(|urls| urls.get.clone())
                .ok_or_else(|| {
                    ProviderError::MalformedResponse(format!(
                        "Prediction {} has no polling URL",
                        prediction.id
                    ))
                })?;

            tokio::time::sleep(self.poll_interval).await;
            prediction = self.http.get_prediction(&url).await?;
            polls += 1;
            tracing::debug!(
                "Prediction {} status after poll {}: {:?}",
                prediction.id,
                polls,
                prediction.status
            );
        }

        Ok(prediction)
    }
}

/// Coerce a prediction output into text.
///
/// Streaming models return a list of tokens, which are concatenated.
pub(crate) fn output_to_text(output: Option<&Value>) -> String {
    match output {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(other) => other.to_string(),
    }
}

fn failure_to_error(prediction: &Prediction) -> ProviderError {
    let message = match &prediction.error {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => format!("prediction {:?}", prediction.status),
    };

    if message.to_ascii_lowercase().contains("nsfw") {
        ProviderError::SafetyRejected(message)
    } else {
        ProviderError::Status {
            status: 500,
            message,
        }
    }
}

#[async_trait]
impl DescribeService for ReplicateDescribeClient {
    async fn describe(&self, request: &DescribeRequest) -> Result<String> {
        tracing::debug!(
            "Creating Replicate prediction (version: {}, encoding: {:?})",
            self.version,
            request.encoding
        );

        let create = PredictionRequest {
            version: self.version.clone(),
            input: PredictionInput {
                image: request.to_data_url(),
            },
        };

        let prediction = self.http.create_prediction(&create).await?;
        let prediction = self.wait_for_completion(prediction).await?;

        match prediction.status {
            PredictionStatus::Succeeded => Ok(output_to_text(prediction.output.as_ref())),
            _ => Err(failure_to_error(&prediction).into()),
        }
    }
}
