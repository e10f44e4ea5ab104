//! Generation type enum and per-type workflow helpers.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Category of image request, determining which template or backend
/// handles the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationType {
    /// Plain text-to-image.
    #[serde(rename = "prompt")]
    Prompt,
    /// Extend an existing image beyond its borders.
    #[serde(rename = "outpaint")]
    Outpaint,
    /// Blend two source images under a prompt.
    #[serde(rename = "mix")]
    Mix,
    /// Blend a single source image under a prompt.
    #[serde(rename = "mix-one")]
    MixOne,
    /// Kontext-based single-image edit.
    #[serde(rename = "kontext-basic")]
    KontextBasic,
}

impl GenerationType {
    /// Wire name as it appears in prompt records and output filenames.
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationType::Prompt => "prompt",
            GenerationType::Outpaint => "outpaint",
            GenerationType::Mix => "mix",
            GenerationType::MixOne => "mix-one",
            GenerationType::KontextBasic => "kontext-basic",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "prompt" => Ok(GenerationType::Prompt),
            "outpaint" => Ok(GenerationType::Outpaint),
            "mix" => Ok(GenerationType::Mix),
            "mix-one" => Ok(GenerationType::MixOne),
            "kontext-basic" => Ok(GenerationType::KontextBasic),
            other => Err(CoreError::UnknownGenerationType(other.to_string())),
        }
    }

    /// Number of source images this generation type consumes.
    pub fn input_image_count(self) -> usize {
        match self {
            GenerationType::Prompt => 0,
            GenerationType::Outpaint | GenerationType::MixOne | GenerationType::KontextBasic => 1,
            GenerationType::Mix => 2,
        }
    }
}

impl std::fmt::Display for GenerationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a single-image blend strength (1 strongest .. 5 weakest) to the
/// label the mix workflow's style node expects. Out-of-range values
/// clamp to the nearest end.
pub fn strength_label(strength: i32) -> &'static str {
    match strength {
        i32::MIN..=1 => "highest",
        2 => "high",
        3 => "medium",
        4 => "low",
        _ => "lowest",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parse_all_known_types() {
        assert_eq!(
            GenerationType::parse("prompt").unwrap(),
            GenerationType::Prompt
        );
        assert_eq!(
            GenerationType::parse("mix-one").unwrap(),
            GenerationType::MixOne
        );
        assert_eq!(
            GenerationType::parse("kontext-basic").unwrap(),
            GenerationType::KontextBasic
        );
    }

    #[test]
    fn parse_unknown_type_rejected() {
        assert_matches!(
            GenerationType::parse("upscale"),
            Err(CoreError::UnknownGenerationType(_))
        );
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(GenerationType::MixOne.to_string(), "mix-one");
    }

    #[test]
    fn input_image_counts() {
        assert_eq!(GenerationType::Prompt.input_image_count(), 0);
        assert_eq!(GenerationType::MixOne.input_image_count(), 1);
        assert_eq!(GenerationType::Mix.input_image_count(), 2);
    }

    #[test]
    fn strength_labels() {
        assert_eq!(strength_label(1), "highest");
        assert_eq!(strength_label(2), "high");
        assert_eq!(strength_label(3), "medium");
        assert_eq!(strength_label(4), "low");
        assert_eq!(strength_label(5), "lowest");
    }

    #[test]
    fn strength_clamps_out_of_range() {
        assert_eq!(strength_label(0), "highest");
        assert_eq!(strength_label(-3), "highest");
        assert_eq!(strength_label(9), "lowest");
    }
}
