use crate::ai::error::{classify_status, ProviderError};
use crate::Result;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Send a prepared request and decode a JSON body.
///
/// Non-success statuses go through [`classify_status`]; bodies that fail to
/// decode become [`ProviderError::MalformedResponse`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T> {
    let response = request.send().await.map_err(|e| {
        tracing::error!("{} request failed: {}", provider, e);
        e
    })?;
    read_json(provider, response).await
}

async fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!("{} returned {}: {}", provider, status, body);
        return Err(classify_status(status.as_u16(), &body).into());
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Unreadable {} response: {}\nBody: {}", provider, e, body);
        ProviderError::MalformedResponse(format!("{} response: {}", provider, e)).into()
    })
}
