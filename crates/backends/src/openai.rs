//! OpenAI Images API backend.
//!
//! Synchronous request/response — no queue to poll. The request shape
//! differs per model family: gpt-image models always answer with
//! base64 and take `output_format`, while dall-e models take
//! `response_format` and may answer with either a URL or base64.

use serde::{Deserialize, Serialize};

use base64::engine::general_purpose;
use base64::Engine;

use crate::{BackendError, GenerationBackend, GenerationRequest, ImageOutput};

const SERVICE: &str = "openai";

const IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";

/// Client for the OpenAI Images API.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    images_url: String,
}

#[derive(Debug, Serialize)]
struct ImagesGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,

    // gpt-image models
    #[serde(skip_serializing_if = "Option::is_none")]
    output_format: Option<&'a str>,

    // dall-e models
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ImagesGenerateResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

/// The Images API only accepts a fixed set of sizes; snap the record's
/// dimensions to the nearest orientation.
fn size_for(width: u32, height: u32) -> &'static str {
    if width > height {
        "1536x1024"
    } else if height > width {
        "1024x1536"
    } else {
        "1024x1024"
    }
}

impl OpenAiBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            images_url: IMAGES_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_images_url(mut self, images_url: String) -> Self {
        self.images_url = images_url;
        self
    }

    fn build_request<'a>(model: &'a str, prompt: &'a str, size: &'a str) -> ImagesGenerateRequest<'a> {
        if model.starts_with("gpt-image") {
            ImagesGenerateRequest {
                model,
                prompt,
                n: 1,
                size,
                output_format: Some("png"),
                response_format: None,
            }
        } else {
            ImagesGenerateRequest {
                model,
                prompt,
                n: 1,
                size,
                output_format: None,
                response_format: Some("b64_json"),
            }
        }
    }
}

#[async_trait::async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ImageOutput, BackendError> {
        let size = size_for(request.width, request.height);
        let body = Self::build_request(&request.model, &request.prompt, size);

        let response = self
            .client
            .post(&self.images_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Api {
                service: SERVICE,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: ImagesGenerateResponse =
            response
                .json()
                .await
                .map_err(|_| BackendError::MalformedResponse {
                    service: SERVICE,
                    field: "data",
                })?;

        let first = parsed
            .data
            .into_iter()
            .next()
            .ok_or(BackendError::MalformedResponse {
                service: SERVICE,
                field: "data[0]",
            })?;

        if let Some(b64) = first.b64_json {
            let bytes = general_purpose::STANDARD.decode(b64)?;
            tracing::info!(
                record_id = request.record_id,
                bytes = bytes.len(),
                "OpenAI returned inline image",
            );
            Ok(ImageOutput::Bytes(bytes))
        } else if let Some(url) = first.url {
            Ok(ImageOutput::Url(url))
        } else {
            Err(BackendError::MalformedResponse {
                service: SERVICE,
                field: "data[0].b64_json | data[0].url",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_snaps_to_orientation() {
        assert_eq!(size_for(1024, 1024), "1024x1024");
        assert_eq!(size_for(1920, 1080), "1536x1024");
        assert_eq!(size_for(832, 1216), "1024x1536");
    }

    #[test]
    fn gpt_image_request_shape() {
        let body =
            serde_json::to_value(OpenAiBackend::build_request("gpt-image-1", "p", "1024x1024"))
                .unwrap();
        assert_eq!(body["output_format"], "png");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn dalle_request_shape() {
        let body =
            serde_json::to_value(OpenAiBackend::build_request("dall-e-3", "p", "1024x1024"))
                .unwrap();
        assert_eq!(body["response_format"], "b64_json");
        assert!(body.get("output_format").is_none());
    }

    #[test]
    fn response_parses_either_payload() {
        let with_b64: ImagesGenerateResponse =
            serde_json::from_str(r#"{"data": [{"b64_json": "QUJD"}]}"#).unwrap();
        assert!(with_b64.data[0].b64_json.is_some());

        let with_url: ImagesGenerateResponse =
            serde_json::from_str(r#"{"data": [{"url": "https://img/x.png"}]}"#).unwrap();
        assert_eq!(with_url.data[0].url.as_deref(), Some("https://img/x.png"));
    }
}
