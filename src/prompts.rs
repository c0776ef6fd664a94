//! Fixed instruction templates and the deterministic post-processing applied
//! to completions.
//!
//! Templates tell the model to emit bare English prompt text only. Control
//! syntax such as `--ar` is never trusted to come from the model; it is
//! appended here.

use crate::models::{CompletionResult, FormattedPrompt, GenerationRequest, TargetModel};

pub const OPTIMIZE_SYSTEM: &str = include_str!("../data/prompts/optimize_system.txt");
pub const MIDJOURNEY_SYSTEM: &str = include_str!("../data/prompts/midjourney_system.txt");
pub const STABLE_DIFFUSION_SYSTEM: &str =
    include_str!("../data/prompts/stable_diffusion_system.txt");
pub const DESCRIBE_INSTRUCTION: &str = include_str!("../data/prompts/describe_instruction.txt");

pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
pub const MIDJOURNEY_VERSION: &str = "6.0";

pub fn optimize_system() -> &'static str {
    OPTIMIZE_SYSTEM.trim()
}

pub fn describe_instruction() -> &'static str {
    DESCRIBE_INSTRUCTION.trim()
}

/// System instruction for a target model family.
pub fn system_prompt_for(target: TargetModel) -> &'static str {
    match target {
        TargetModel::Mj => MIDJOURNEY_SYSTEM.trim(),
        TargetModel::Sd => STABLE_DIFFUSION_SYSTEM.trim(),
    }
}

/// `--ar <ratio> --v 6.0`, with the ratio trimmed and defaulting to 16:9.
pub fn midjourney_suffix(aspect_ratio: Option<&str>) -> String {
    let ratio = aspect_ratio
        .map(str::trim)
        .filter(|ratio| !ratio.is_empty())
        .unwrap_or(DEFAULT_ASPECT_RATIO);
    format!("--ar {} --v {}", ratio, MIDJOURNEY_VERSION)
}

/// Shape a completion into the response for the request's target family.
pub fn format_completion(request: &GenerationRequest, result: CompletionResult) -> FormattedPrompt {
    match request.target_model {
        TargetModel::Mj => FormattedPrompt::Mj {
            prompt: format!(
                "{} {}",
                result.text(),
                midjourney_suffix(request.aspect_ratio.as_deref())
            ),
        },
        TargetModel::Sd => FormattedPrompt::Sd {
            positive_prompt: result.into_text(),
            negative_prompt: request
                .negative_prompt_seed
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
        },
    }
}
