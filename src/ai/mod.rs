//! AI service integration for prompt expansion and image description
//!
//! Provides the provider-agnostic traits the orchestrator depends on, plus
//! one adapter per external capability: an OpenAI-compatible chat client for
//! text expansion and two alternative vision backends (Replicate, Gemini) for
//! `describe`.

pub mod error;
pub mod gemini;
mod http;
pub mod mime;
pub mod mock;
pub mod openai;
pub mod replicate;

pub use error::ProviderError;
pub use gemini::GeminiDescribeClient;
pub use mock::{MockCompletionClient, MockDescribeClient};
pub use openai::OpenAiChatClient;
pub use replicate::ReplicateDescribeClient;

use crate::models::DescribeRequest;
use crate::Result;
use async_trait::async_trait;

/// Text expansion via a hosted chat-completion model.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one system/user exchange and return the first answer verbatim.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Reverse prompting: derive a text prompt from an image.
#[async_trait]
pub trait DescribeService: Send + Sync {
    async fn describe(&self, request: &DescribeRequest) -> Result<String>;
}
