//! Prompt optimizer - expands plain-language image ideas into model-ready prompts
//!
//! Mediates between a client and hosted models: a chat-completion model turns
//! a short description into a Midjourney- or Stable-Diffusion-style prompt, and
//! a vision model derives a prompt from a reference image.

pub mod ai;
pub mod app;
pub mod error;
pub mod history;
pub mod models;
pub mod prompts;
pub mod server;
pub mod session;
pub mod validation;

pub use error::{Error, Result};
