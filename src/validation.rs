//! Inbound payload validation.
//!
//! Pure checks over untyped JSON bodies. Each function returns a typed request
//! or an [`Error::InvalidInput`] carrying the message shown to the user, and
//! never touches a provider.

use crate::models::{DescribeRequest, GenerationRequest, TargetModel};
use crate::{Error, Result};
use serde_json::{Map, Value};

pub const INVALID_PROMPT_MESSAGE: &str = "请输入有效的提示词";
pub const INVALID_MODEL_MESSAGE: &str = "无效的模型参数";
pub const INVALID_IMAGE_MESSAGE: &str = "请提供有效的图片数据";
pub const INVALID_BODY_MESSAGE: &str = "请求体必须是有效的 JSON 对象";

/// Parse a raw request body into a JSON object.
pub fn parse_body(body: &[u8]) -> Result<Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) | Err(_) => Err(Error::InvalidInput(INVALID_BODY_MESSAGE.to_string())),
    }
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>> {
    payload
        .as_object()
        .ok_or_else(|| Error::InvalidInput(INVALID_BODY_MESSAGE.to_string()))
}

/// Trimmed, non-empty string field, or `None`.
fn non_blank<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Optional string field; non-string values are treated as absent.
fn optional_string(object: &Map<String, Value>, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `optimize` requires a non-blank `prompt`.
pub fn validate_optimize(payload: &Value) -> Result<String> {
    let object = as_object(payload)?;
    non_blank(object, "prompt")
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidInput(INVALID_PROMPT_MESSAGE.to_string()))
}

/// `generate` requires a non-blank `prompt` and `model` of `"mj"` or `"sd"`.
///
/// `aspectRatio` and `negativePrompt` are accepted for either family; the
/// template engine ignores whichever does not apply.
pub fn validate_generate(payload: &Value) -> Result<GenerationRequest> {
    let object = as_object(payload)?;

    let raw_text = non_blank(object, "prompt")
        .ok_or_else(|| Error::InvalidInput(INVALID_PROMPT_MESSAGE.to_string()))?;

    let target_model = object
        .get("model")
        .and_then(Value::as_str)
        .and_then(TargetModel::parse)
        .ok_or_else(|| Error::InvalidInput(INVALID_MODEL_MESSAGE.to_string()))?;

    Ok(GenerationRequest {
        raw_text: raw_text.to_string(),
        target_model,
        aspect_ratio: optional_string(object, "aspectRatio"),
        negative_prompt_seed: optional_string(object, "negativePrompt"),
    })
}

/// `describe` requires a non-empty `image` string; its bytes are not checked.
pub fn validate_describe(payload: &Value) -> Result<DescribeRequest> {
    let object = as_object(payload)?;
    non_blank(object, "image")
        .map(|image| DescribeRequest::new(image.to_string()))
        .ok_or_else(|| Error::InvalidInput(INVALID_IMAGE_MESSAGE.to_string()))
}
