//! Illustration downloads for the assembler.
//!
//! All images are fetched up front, one per story page. A failed
//! download becomes `None` and the engines render a placeholder for
//! that page instead of aborting the whole book.

use std::time::Duration;

use base64::engine::general_purpose;
use base64::Engine as _;

use crate::document::StoryPage;

/// Some image hosts refuse requests without a browser user-agent.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A downloaded illustration.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl PageImage {
    pub fn new(bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        let mime = content_type
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string())
            .filter(|ct| ct.starts_with("image/"))
            .or_else(|| {
                image::guess_format(&bytes)
                    .ok()
                    .map(|f| f.to_mime_type().to_string())
            })
            .unwrap_or_else(|| "image/jpeg".to_string());
        Self { bytes, mime }
    }

    /// The image as a `data:` URI for inline HTML embedding.
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Build the HTTP client used for illustration downloads.
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client")
}

/// Fetch one illustration; `None` (with a log line) on any failure or
/// when the page has no URL.
pub async fn fetch_image(
    client: &reqwest::Client,
    url: Option<&str>,
    page_number: usize,
) -> Option<PageImage> {
    let url = match url {
        Some(u) if !u.is_empty() => u,
        _ => {
            tracing::warn!(page = page_number, "No image URL for page");
            return None;
        }
    };

    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(page = page_number, url, error = %e, "Image download failed");
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::error!(
            page = page_number,
            url,
            status = response.status().as_u16(),
            "Image download failed",
        );
        return None;
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match response.bytes().await {
        Ok(bytes) => {
            tracing::info!(page = page_number, url, bytes = bytes.len(), "Downloaded image");
            Some(PageImage::new(bytes.to_vec(), content_type.as_deref()))
        }
        Err(e) => {
            tracing::error!(page = page_number, url, error = %e, "Image body read failed");
            None
        }
    }
}

/// Fetch every page's illustration, in order.
pub async fn fetch_page_images(
    client: &reqwest::Client,
    pages: &[StoryPage],
) -> Vec<Option<PageImage>> {
    let mut images = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        images.push(fetch_image(client, page.image_url.as_deref(), i + 1).await);
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn content_type_header_wins() {
        let img = PageImage::new(vec![1, 2, 3], Some("image/png"));
        assert_eq!(img.mime, "image/png");
    }

    #[test]
    fn content_type_parameters_stripped() {
        let img = PageImage::new(vec![1, 2, 3], Some("image/png; charset=binary"));
        assert_eq!(img.mime, "image/png");
    }

    #[test]
    fn magic_bytes_fallback() {
        let img = PageImage::new(PNG_MAGIC.to_vec(), None);
        assert_eq!(img.mime, "image/png");
    }

    #[test]
    fn non_image_content_type_ignored() {
        let img = PageImage::new(PNG_MAGIC.to_vec(), Some("text/html"));
        assert_eq!(img.mime, "image/png");
    }

    #[test]
    fn unknown_bytes_default_jpeg() {
        let img = PageImage::new(vec![0, 1, 2, 3], None);
        assert_eq!(img.mime, "image/jpeg");
    }

    #[test]
    fn data_uri_round_trips() {
        let img = PageImage::new(PNG_MAGIC.to_vec(), Some("image/png"));
        let uri = img.data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        let payload = uri.split(',').nth(1).unwrap();
        assert_eq!(
            general_purpose::STANDARD.decode(payload).unwrap(),
            PNG_MAGIC
        );
    }
}
