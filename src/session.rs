//! Client-side session state: the current input, generation parameters and
//! the persisted recent history.

use crate::history::{HistoryEntry, HistoryStore};
use crate::models::{FormattedPrompt, TargetModel};
use crate::{ai::mime, Error, Result};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Uploads above this size are refused before any request is made.
pub const MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024;

pub const EMPTY_INPUT_MESSAGE: &str = "请输入您的需求";
pub const UPLOAD_TOO_LARGE_MESSAGE: &str = "图片大小不能超过 4MB";

pub struct Session {
    pub input: String,
    pub target_model: TargetModel,
    pub aspect_ratio: Option<String>,
    pub negative_prompt: Option<String>,
    history: Vec<HistoryEntry>,
    store: HistoryStore,
}

impl Session {
    /// Start a session, loading history once from the store.
    pub fn start(store: HistoryStore) -> Self {
        let history = store.load();
        Self {
            input: String::new(),
            target_model: TargetModel::Mj,
            aspect_ratio: None,
            negative_prompt: None,
            history,
            store,
        }
    }

    /// Chain a preset style tag onto the current input.
    pub fn append_style_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        let current = self.input.trim_end();
        self.input = if current.is_empty() {
            tag.to_string()
        } else {
            format!("{}, {}", current, tag)
        };
    }

    fn require_input(&self) -> Result<&str> {
        let input = self.input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput(EMPTY_INPUT_MESSAGE.to_string()));
        }
        Ok(input)
    }

    pub fn optimize_payload(&self) -> Result<Value> {
        Ok(json!({ "prompt": self.require_input()? }))
    }

    pub fn generate_payload(&self) -> Result<Value> {
        let mut payload = json!({
            "prompt": self.require_input()?,
            "model": self.target_model.as_str(),
        });
        match self.target_model {
            TargetModel::Mj => {
                if let Some(ratio) = &self.aspect_ratio {
                    payload["aspectRatio"] = json!(ratio);
                }
            }
            TargetModel::Sd => {
                if let Some(negative) = &self.negative_prompt {
                    payload["negativePrompt"] = json!(negative);
                }
            }
        }
        Ok(payload)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Record a successful result against the current input.
    pub fn record_success(&mut self, output: String, now: DateTime<Utc>) -> Result<()> {
        let entry = HistoryEntry::new(self.input.trim().to_string(), output, now);
        let existing = std::mem::take(&mut self.history);
        self.history = self.store.record(existing, entry)?;
        Ok(())
    }
}

/// Flatten a formatted prompt into the text stored in history.
pub fn history_output(prompt: &FormattedPrompt) -> String {
    match prompt {
        FormattedPrompt::Mj { prompt } => prompt.clone(),
        FormattedPrompt::Sd {
            positive_prompt,
            negative_prompt,
        } if negative_prompt.is_empty() => positive_prompt.clone(),
        FormattedPrompt::Sd {
            positive_prompt,
            negative_prompt,
        } => format!("{}\nNegative prompt: {}", positive_prompt, negative_prompt),
    }
}

/// Read an image file into a data URL, refusing files over the upload limit.
pub fn read_image_as_data_url(path: &Path) -> Result<String> {
    let size = fs::metadata(path)?.len();
    if size > MAX_UPLOAD_BYTES {
        return Err(Error::InvalidInput(UPLOAD_TOO_LARGE_MESSAGE.to_string()));
    }

    let bytes = fs::read(path)?;
    let mime_type = mime::detect_image_mime(&bytes);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(mime::to_data_url(mime_type, &encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_CAPACITY;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn session_in(dir: &tempfile::TempDir) -> Session {
        Session::start(HistoryStore::new(dir.path().join("history.json")))
    }

    #[test]
    fn test_append_style_tag_chains_with_commas() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir);

        session.append_style_tag("cyberpunk");
        assert_eq!(session.input, "cyberpunk");

        session.input = "a cat ".to_string();
        session.append_style_tag("cinematic lighting");
        session.append_style_tag("  ");
        session.append_style_tag("8k");
        assert_eq!(session.input, "a cat, cinematic lighting, 8k");
    }

    #[test]
    fn test_payloads_require_input() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_in(&dir);
        let err = session.optimize_payload().unwrap_err();
        assert_eq!(err.user_message(), EMPTY_INPUT_MESSAGE);
    }

    #[test]
    fn test_generate_payload_only_sends_relevant_params() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir);
        session.input = "a cat".to_string();
        session.aspect_ratio = Some("1:1".to_string());
        session.negative_prompt = Some("blurry".to_string());

        assert_eq!(
            session.generate_payload().unwrap(),
            json!({"prompt": "a cat", "model": "mj", "aspectRatio": "1:1"})
        );

        session.target_model = TargetModel::Sd;
        assert_eq!(
            session.generate_payload().unwrap(),
            json!({"prompt": "a cat", "model": "sd", "negativePrompt": "blurry"})
        );
    }

    #[test]
    fn test_record_success_persists_capped_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir);
        session.input = "a cat".to_string();

        for millis in 1..=6 {
            let now = Utc.timestamp_millis_opt(millis).unwrap();
            session
                .record_success(format!("output {}", millis), now)
                .unwrap();
        }

        assert_eq!(session.history().len(), HISTORY_CAPACITY);
        assert_eq!(session.history()[0].output, "output 6");

        let reloaded = session_in(&dir);
        assert_eq!(reloaded.history(), session.history());
    }

    #[test]
    fn test_history_output_for_sd_includes_negative() {
        let prompt = FormattedPrompt::Sd {
            positive_prompt: "A cat".to_string(),
            negative_prompt: "blurry".to_string(),
        };
        assert_eq!(history_output(&prompt), "A cat\nNegative prompt: blurry");
    }

    #[test]
    fn test_read_image_builds_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        fs::write(&path, [0x89, 0x50, 0x4E, 0x47]).unwrap();

        let data_url = read_image_as_data_url(&path).unwrap();
        assert_eq!(data_url, "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn test_read_image_rejects_oversized_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.jpg");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_UPLOAD_BYTES + 1).unwrap();

        let err = read_image_as_data_url(&path).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.user_message(), UPLOAD_TOO_LARGE_MESSAGE);
    }
}
