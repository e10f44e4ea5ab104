//! Output image naming convention.
//!
//! Every rendered image is named so the record it belongs to can be
//! recovered from the filename alone:
//! `{generation_type}_{model-slug}_{record_id}_{user_id}.png`.

use crate::types::PromptId;

/// Slugify a model name for use in a filename: lowercase, with every
/// run of non-alphanumeric characters collapsed to a single `-`.
pub fn model_slug(model: &str) -> String {
    let mut slug = String::with_capacity(model.len());
    let mut last_was_dash = false;
    for c in model.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Filename for a rendered image.
pub fn output_image_filename(
    generation_type: &str,
    model: &str,
    record_id: PromptId,
    user_id: i64,
) -> String {
    format!(
        "{generation_type}_{}_{record_id}_{user_id}.png",
        model_slug(model)
    )
}

/// Object key under which a rendered image is uploaded.
pub fn s3_object_key(output_filename: &str) -> String {
    format!("images/{output_filename}")
}
