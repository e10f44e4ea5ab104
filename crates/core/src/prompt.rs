//! Prompt records as served by the job-tracking API.

use serde::Deserialize;

use crate::types::PromptId;

/// Fallback edge length when a record carries no dimensions.
pub const DEFAULT_DIMENSION: u32 = 1024;

/// A pending image-generation request, owned by the external
/// job-tracking service. Workers read these and patch back status and
/// the final filename; nothing else is ever written.
///
/// `generation_type` and `render_status` stay in wire form here —
/// records for other workers may carry values this build does not
/// understand, and deserializing the whole batch must not fail on them.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptRecord {
    pub id: PromptId,
    pub user_id: i64,
    pub generation_type: String,
    pub model: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub generated_prompt: Option<String>,
    pub render_status: i16,
    /// Nullable on the wire; absent and `null` both mean "keep local".
    #[serde(default)]
    pub upload_to_s3: Option<bool>,
    pub input_image_1: Option<String>,
    pub input_image_2: Option<String>,
    pub input_image_1_strength: Option<i32>,
    pub input_image_2_strength: Option<i32>,
    /// Additional reference images for hosted edit models.
    #[serde(default)]
    pub input_images: Option<Vec<String>>,
    pub filename: Option<String>,
}

impl PromptRecord {
    /// Output width, defaulting when the record carries none.
    pub fn width_or_default(&self) -> u32 {
        self.width.unwrap_or(DEFAULT_DIMENSION)
    }

    /// Output height, defaulting when the record carries none.
    pub fn height_or_default(&self) -> u32 {
        self.height.unwrap_or(DEFAULT_DIMENSION)
    }

    /// The prompt text, if the record has a non-empty one. Records
    /// without a prompt are skipped by every dispatcher.
    pub fn prompt_text(&self) -> Option<&str> {
        match self.generated_prompt.as_deref() {
            Some(p) if !p.trim().is_empty() => Some(p),
            _ => None,
        }
    }

    /// Whether the finished image should be uploaded to S3.
    pub fn wants_s3(&self) -> bool {
        self.upload_to_s3.unwrap_or(false)
    }

    /// Reference images for hosted edit models, empty when unset.
    pub fn reference_images(&self) -> &[String] {
        self.input_images.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json() -> &'static str {
        r#"{
            "id": 42,
            "user_id": 7,
            "generation_type": "mix",
            "model": "schnell",
            "width": 832,
            "height": 1216,
            "generated_prompt": "a fox reading a book",
            "render_status": 0,
            "upload_to_s3": true,
            "input_image_1": "https://cdn.example.com/a.png",
            "input_image_2": "https://cdn.example.com/b.png",
            "input_image_1_strength": 2,
            "input_image_2_strength": 4,
            "filename": null
        }"#
    }

    #[test]
    fn deserializes_api_shape() {
        let record: PromptRecord = serde_json::from_str(record_json()).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.generation_type, "mix");
        assert_eq!(record.width_or_default(), 832);
        assert!(record.wants_s3());
        assert!(record.reference_images().is_empty());
        assert_eq!(record.prompt_text(), Some("a fox reading a book"));
    }

    #[test]
    fn null_flags_tolerated() {
        let record: PromptRecord = serde_json::from_str(
            r#"{"id": 1, "user_id": 1, "generation_type": "prompt",
                "model": "dev", "width": 1024, "height": 1024,
                "generated_prompt": "x", "render_status": 0,
                "upload_to_s3": null, "input_images": null,
                "input_image_1": null, "input_image_2": null,
                "input_image_1_strength": null, "input_image_2_strength": null,
                "filename": null}"#,
        )
        .unwrap();
        assert!(!record.wants_s3());
        assert!(record.reference_images().is_empty());
    }

    #[test]
    fn dimensions_default_when_missing() {
        let record: PromptRecord = serde_json::from_str(
            r#"{"id": 1, "user_id": 1, "generation_type": "prompt",
                "model": "dev", "width": null, "height": null,
                "generated_prompt": "x", "render_status": 0,
                "input_image_1": null, "input_image_2": null,
                "input_image_1_strength": null, "input_image_2_strength": null,
                "filename": null}"#,
        )
        .unwrap();
        assert_eq!(record.width_or_default(), DEFAULT_DIMENSION);
        assert_eq!(record.height_or_default(), DEFAULT_DIMENSION);
    }

    #[test]
    fn blank_prompt_is_none() {
        let mut record: PromptRecord = serde_json::from_str(record_json()).unwrap();
        record.generated_prompt = Some("   ".into());
        assert_eq!(record.prompt_text(), None);
        record.generated_prompt = None;
        assert_eq!(record.prompt_text(), None);
    }
}
