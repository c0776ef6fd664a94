//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! Every failure path ends up as an [`ErrorEnvelope`] before it leaves the
//! process, so the variants here carry user-facing text rather than provider
//! internals.

use crate::ai::ProviderError;
use crate::models::ErrorEnvelope;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing configuration: {key}")]
    Misconfiguration { key: String },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Provider(ProviderError::from(err))
    }
}

impl Error {
    /// HTTP status the error is surfaced with.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::Provider(err) => err.status_code(),
            Error::Misconfiguration { .. }
            | Error::EmptyResult(_)
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::EnvVar(_)
            | Error::Generic(_) => 500,
        }
    }

    /// Localized message safe to hand back to the caller.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidInput(message) | Error::EmptyResult(message) => message.clone(),
            Error::Misconfiguration { key } => {
                format!("API Key 未配置，请设置环境变量 {}", key)
            }
            Error::Provider(err) => err.user_message(),
            Error::Serialization(_) | Error::Io(_) | Error::EnvVar(_) | Error::Generic(_) => {
                "服务器错误，请稍后重试".to_string()
            }
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.user_message(),
            status: self.status_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
