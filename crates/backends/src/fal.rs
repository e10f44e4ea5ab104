//! fal.ai queue API backend.
//!
//! The queue API is asynchronous: submit a job, poll its status URL
//! until it completes, then fetch the result payload. The status and
//! result URLs are addressed by the *vendor* segment of the model id
//! only (`flux-1/schnell` polls under `flux-1`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use storyloom_core::aspect::closest_aspect_ratio;

use crate::{BackendError, GenerationBackend, GenerationRequest, ImageOutput};

const SERVICE: &str = "fal";

/// Default queue base URL.
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";

/// How long to wait for a queued job before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Delay between status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Consecutive 405 responses on the status URL before the job is
/// treated as expired.
const MAX_METHOD_NOT_ALLOWED: u32 = 5;

/// Models addressed by an aspect-ratio name instead of pixel
/// dimensions.
const ASPECT_RATIO_MODELS: &[&str] = &["imagen4/preview/ultra", "minimax/image-01"];

/// Client for the fal.ai queue API.
pub struct FalBackend {
    client: reqwest::Client,
    api_key: String,
    queue_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct FalRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<ImageSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    image_urls: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ImageSize {
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    #[serde(default)]
    images: Vec<ImageRef>,
    image: Option<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
}

/// Pull the image URL out of a result payload: `images[0].url` first,
/// then the single-image `image.url` shape.
fn extract_image_url(result: ResultResponse) -> Option<String> {
    result
        .images
        .into_iter()
        .next()
        .map(|i| i.url)
        .or(result.image.map(|i| i.url))
}

/// The path segment jobs are polled under: everything before the first
/// `/` of the model id.
fn vendor_segment(model: &str) -> &str {
    model.split('/').next().unwrap_or(model)
}

impl FalBackend {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            timeout,
        }
    }

    /// Point the client at a different queue endpoint (tests).
    pub fn with_queue_url(mut self, queue_url: String) -> Self {
        self.queue_url = queue_url;
        self
    }

    fn build_request<'a>(&self, request: &'a GenerationRequest) -> FalRequest<'a> {
        // Ratio-addressed models ignore pixel dimensions; everything
        // else gets an explicit image_size.
        if ASPECT_RATIO_MODELS.contains(&request.model.as_str()) {
            FalRequest {
                prompt: &request.prompt,
                image_size: None,
                aspect_ratio: Some(closest_aspect_ratio(request.width, request.height)),
                image_urls: request.image_urls.clone(),
            }
        } else {
            FalRequest {
                prompt: &request.prompt,
                image_size: Some(ImageSize {
                    width: request.width,
                    height: request.height,
                }),
                aspect_ratio: None,
                image_urls: request.image_urls.clone(),
            }
        }
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let url = format!("{}/fal-ai/{}", self.queue_url, request.model);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&self.build_request(request))
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

        let submit: SubmitResponse =
            response
                .json()
                .await
                .map_err(|_| BackendError::MalformedResponse {
                    service: SERVICE,
                    field: "request_id",
                })?;
        Ok(submit.request_id)
    }

    async fn poll_until_complete(
        &self,
        model: &str,
        request_id: &str,
    ) -> Result<(), BackendError> {
        let vendor = vendor_segment(model);
        let status_url = format!(
            "{}/fal-ai/{}/requests/{}/status",
            self.queue_url, vendor, request_id
        );

        let started = tokio::time::Instant::now();
        let mut method_not_allowed = 0u32;

        while started.elapsed() < self.timeout {
            tokio::time::sleep(POLL_INTERVAL).await;

            let response = self
                .client
                .get(&status_url)
                .header("Authorization", format!("Key {}", self.api_key))
                .send()
                .await?;

            let http_status = response.status();
            if !http_status.is_success() {
                // The queue answers 405 once a finished job has been
                // reaped; a run of them means the job is gone.
                if http_status.as_u16() == 405 {
                    method_not_allowed += 1;
                    if method_not_allowed >= MAX_METHOD_NOT_ALLOWED {
                        return Err(BackendError::Expired {
                            service: SERVICE,
                            request_id: request_id.to_string(),
                        });
                    }
                }
                tracing::warn!(
                    request_id,
                    status = http_status.as_u16(),
                    "fal status check failed, retrying",
                );
                continue;
            }

            let status: StatusResponse =
                response
                    .json()
                    .await
                    .map_err(|_| BackendError::MalformedResponse {
                        service: SERVICE,
                        field: "status",
                    })?;

            match status.status.as_str() {
                "COMPLETED" => return Ok(()),
                "FAILED" | "ERROR" => {
                    return Err(BackendError::JobFailed {
                        service: SERVICE,
                        status: status.status,
                    })
                }
                // IN_QUEUE / IN_PROGRESS keep polling.
                _ => {}
            }
        }

        Err(BackendError::Timeout {
            model: model.to_string(),
            seconds: self.timeout.as_secs(),
        })
    }

    async fn fetch_result(&self, model: &str, request_id: &str) -> Result<String, BackendError> {
        let vendor = vendor_segment(model);
        let result_url = format!(
            "{}/fal-ai/{}/requests/{}",
            self.queue_url, vendor, request_id
        );

        let response = self
            .client
            .get(&result_url)
            .header("Authorization", format!("Key {}", self.api_key))
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

        let result: ResultResponse =
            response
                .json()
                .await
                .map_err(|_| BackendError::MalformedResponse {
                    service: SERVICE,
                    field: "images",
                })?;

        extract_image_url(result).ok_or(BackendError::MalformedResponse {
            service: SERVICE,
            field: "images[0].url",
        })
    }
}

#[async_trait::async_trait]
impl GenerationBackend for FalBackend {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ImageOutput, BackendError> {
        let request_id = self.submit(request).await?;
        tracing::info!(
            record_id = request.record_id,
            model = %request.model,
            request_id = %request_id,
            "Submitted job to fal queue",
        );

        self.poll_until_complete(&request.model, &request_id).await?;

        let url = self.fetch_result(&request.model, &request_id).await?;
        tracing::info!(
            record_id = request.record_id,
            request_id = %request_id,
            "fal job completed",
        );
        Ok(ImageOutput::Url(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_segment_strips_variant() {
        assert_eq!(vendor_segment("flux-1/schnell"), "flux-1");
        assert_eq!(vendor_segment("imagen4/preview/ultra"), "imagen4");
        assert_eq!(vendor_segment("aura-flow"), "aura-flow");
    }

    #[test]
    fn extract_prefers_images_array() {
        let result: ResultResponse = serde_json::from_str(
            r#"{"images": [{"url": "https://a/0.png"}, {"url": "https://a/1.png"}],
                "image": {"url": "https://b/x.png"}}"#,
        )
        .unwrap();
        assert_eq!(extract_image_url(result).unwrap(), "https://a/0.png");
    }

    #[test]
    fn extract_falls_back_to_single_image() {
        let result: ResultResponse =
            serde_json::from_str(r#"{"image": {"url": "https://b/x.png"}}"#).unwrap();
        assert_eq!(extract_image_url(result).unwrap(), "https://b/x.png");
    }

    #[test]
    fn extract_none_when_empty() {
        let result: ResultResponse = serde_json::from_str(r#"{"images": []}"#).unwrap();
        assert!(extract_image_url(result).is_none());
    }

    #[test]
    fn pixel_models_send_image_size() {
        let backend = FalBackend::new("k".into(), DEFAULT_TIMEOUT);
        let request = GenerationRequest {
            record_id: 1,
            model: "flux-1/schnell".into(),
            prompt: "p".into(),
            width: 832,
            height: 1216,
            image_urls: vec![],
        };
        let body = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(body["image_size"]["width"], 832);
        assert!(body.get("aspect_ratio").is_none());
        assert!(body.get("image_urls").is_none());
    }

    #[test]
    fn ratio_models_send_aspect_ratio() {
        let backend = FalBackend::new("k".into(), DEFAULT_TIMEOUT);
        let request = GenerationRequest {
            record_id: 1,
            model: "imagen4/preview/ultra".into(),
            prompt: "p".into(),
            width: 1920,
            height: 1080,
            image_urls: vec![],
        };
        let body = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(body["aspect_ratio"], "16:9");
        assert!(body.get("image_size").is_none());
    }

    #[test]
    fn reference_images_serialized_when_present() {
        let backend = FalBackend::new("k".into(), DEFAULT_TIMEOUT);
        let request = GenerationRequest {
            record_id: 1,
            model: "gemini-25-flash-image/edit".into(),
            prompt: "p".into(),
            width: 1024,
            height: 1024,
            image_urls: vec!["data:image/png;base64,AAAA".into()],
        };
        let body = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(body["image_urls"].as_array().unwrap().len(), 1);
    }
}
