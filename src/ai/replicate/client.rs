use super::types::{Prediction, PredictionRequest};
use crate::ai::http::send_json;
use crate::Result;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

/// How long Replicate may hold the create call open before answering with an
/// in-progress prediction. The API caps this at 60 s.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(60);

/// Slack on top of the wait window so the create call outlives it.
const CREATE_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

pub struct ReplicateHttpClient {
    client: Client,
    api_token: String,
    base_url: String,
    timeout: Duration,
    wait: Duration,
}

impl ReplicateHttpClient {
    /// `timeout` bounds poll requests; the create call is bounded by the wait
    /// window plus a margin.
    pub fn new_with_client(api_token: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_token,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
            wait: DEFAULT_WAIT,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Clamped to whole seconds in `1..=60`.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = Duration::from_secs(wait.as_secs().clamp(1, DEFAULT_WAIT.as_secs()));
        self
    }

    pub(crate) fn create_timeout(&self) -> Duration {
        self.wait + CREATE_TIMEOUT_MARGIN
    }

    fn authorized(&self, builder: RequestBuilder, timeout: Duration) -> RequestBuilder {
        builder.timeout(timeout).bearer_auth(&self.api_token)
    }

    /// Create a prediction, asking Replicate to block until it finishes or
    /// the wait window closes.
    pub async fn create_prediction(&self, request: &PredictionRequest) -> Result<Prediction> {
        let url = format!("{}/v1/predictions", self.base_url);
        let request = self
            .authorized(self.client.post(url), self.create_timeout())
            .header("Prefer", format!("wait={}", self.wait.as_secs()))
            .json(request);
        send_json("Replicate", request).await
    }

    /// Fetch the current state of a prediction by its `urls.get` link.
    pub async fn get_prediction(&self, url: &str) -> Result<Prediction> {
        send_json("Replicate", self.authorized(self.client.get(url), self.timeout)).await
    }
}
