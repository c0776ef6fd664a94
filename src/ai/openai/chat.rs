use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::{CompletionService, ProviderError};
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Fixed sampling temperature for prompt expansion.
pub const TEMPERATURE: f64 = 0.7;

pub struct OpenAiChatClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, Duration::from_secs(60), client),
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl CompletionService for OpenAiChatClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        tracing::debug!(
            "Requesting chat completion (model: {}, {} input chars)",
            self.model,
            user_prompt.chars().count()
        );

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
            temperature: TEMPERATURE,
        };

        let response = self.http.chat_completion(&request).await?;

        let choice = response.choices.first().ok_or_else(|| {
            ProviderError::MalformedResponse("No choices in chat response".to_string())
        })?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(ProviderError::SafetyRejected(
                "Completion stopped by content filter".to_string(),
            )
            .into());
        }

        // A missing content field is treated like blank text; the caller
        // decides whether that is an empty result.
        Ok(choice.message.content.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::error::TRANSPORT_MESSAGE;
    use crate::Error;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(server: &MockServer) -> OpenAiChatClient {
        OpenAiChatClient::new("test-key".to_string(), "deepseek-chat".to_string())
            .with_base_url(server.uri())
    }

    fn completion_body(content: &str, finish_reason: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": finish_reason
            }]
        })
    }

    #[tokio::test]
    async fn test_complete_parses_first_choice() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("A fluffy cat, studio lighting", "stop")),
            )
            .mount(&server)
            .await;

        let text = make_client(&server)
            .complete("system", "a cat")
            .await
            .unwrap();
        assert_eq!(text, "A fluffy cat, studio lighting");
    }

    #[tokio::test]
    async fn test_complete_sends_two_messages_and_temperature() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-chat",
                "temperature": 0.7,
                "messages": [
                    { "role": "system", "content": "be terse" },
                    { "role": "user", "content": "a cat" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok", "stop")))
            .expect(1)
            .mount(&server)
            .await;

        make_client(&server)
            .complete("be terse", "a cat")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_quota_exceeded() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit reached", "type": "rate_limit_error" }
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .complete("system", "a cat")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::QuotaExceeded(_))
        ));
        assert_eq!(err.status_code(), 429);
    }

    #[tokio::test]
    async fn test_bad_key_maps_to_invalid_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Authentication Fails", "type": "authentication_error" }
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .complete("system", "a cat")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::InvalidCredentials(_))
        ));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_content_filter_maps_to_safety_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body("", "content_filter")),
            )
            .mount(&server)
            .await;

        let err = make_client(&server)
            .complete("system", "something unsafe")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::SafetyRejected(_))
        ));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = make_client(&server)
            .complete("system", "a cat")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .complete("system", "a cat")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Provider(ProviderError::MalformedResponse(_))
        ));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_unreachable_provider_maps_to_transport() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = OpenAiChatClient::new("test-key".to_string(), "deepseek-chat".to_string())
            .with_base_url(format!("http://{}", addr))
            .complete("system", "a cat")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Transport(_))));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.user_message(), TRANSPORT_MESSAGE);
    }
}
