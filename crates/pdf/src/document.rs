//! The storybook input document.

use serde::Deserialize;

/// One story page: narrative text paired with an illustration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryPage {
    #[serde(default)]
    pub text: String,
    pub image_url: Option<String>,
}

/// A full storybook, consumed once per PDF run.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub pages: Vec<StoryPage>,
}

impl StoryDocument {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Title with the fallback used on the title page.
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled Story")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let doc = StoryDocument::from_json(
            r#"{
                "title": "The Fox and the Lantern",
                "subtitle": "A bedtime story",
                "pages": [
                    {"text": "Once upon a time...", "image_url": "https://cdn/x/1.png"},
                    {"text": "The end.", "image_url": null}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.title_or_default(), "The Fox and the Lantern");
        assert_eq!(doc.pages.len(), 2);
        assert!(doc.pages[1].image_url.is_none());
    }

    #[test]
    fn missing_fields_default() {
        let doc = StoryDocument::from_json(r#"{"pages": [{"text": "hi"}]}"#).unwrap();
        assert_eq!(doc.title_or_default(), "Untitled Story");
        assert!(doc.subtitle.is_none());
        assert!(doc.pages[0].image_url.is_none());
    }

    #[test]
    fn empty_document_has_no_pages() {
        let doc = StoryDocument::from_json("{}").unwrap();
        assert!(doc.pages.is_empty());
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(StoryDocument::from_json("{pages: oops").is_err());
    }
}
