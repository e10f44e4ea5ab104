//! Hosted image-generation backends.
//!
//! Each hosted API has its own request/response shape; the worker only
//! cares that a prompt goes in and an image comes out. The
//! [`GenerationBackend`] trait is that seam, with one implementation
//! per service.

pub mod data_uri;
pub mod fal;
pub mod openai;

use storyloom_core::types::PromptId;

/// What a backend is asked to render. Model names are already resolved
/// to the service's full identifier.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub record_id: PromptId,
    pub model: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    /// Reference images for edit models, as `data:` URIs.
    pub image_urls: Vec<String>,
}

/// The rendered image, in whichever form the service hands back.
#[derive(Debug, Clone)]
pub enum ImageOutput {
    /// A URL to download the image from.
    Url(String),
    /// Raw image bytes (services that respond with base64 payloads).
    Bytes(Vec<u8>),
}

/// Errors shared by every hosted backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("{service} API error ({status}): {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// A 2xx response missing the fields we need.
    #[error("{service} response missing {field}")]
    MalformedResponse {
        service: &'static str,
        field: &'static str,
    },

    /// The service reported the generation job as failed.
    #[error("{service} job failed with status {status}")]
    JobFailed {
        service: &'static str,
        status: String,
    },

    /// The queued job expired before completing.
    #[error("{service} job {request_id} expired while polling")]
    Expired {
        service: &'static str,
        request_id: String,
    },

    /// The job did not complete within the polling window.
    #[error("Timeout after {seconds}s waiting for {model}")]
    Timeout { model: String, seconds: u64 },

    /// Base64 payload in the response could not be decoded.
    #[error("Failed to decode base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A local reference image could not be read.
    #[error("Failed to read reference image {path}: {source}")]
    ImageRead {
        path: String,
        source: std::io::Error,
    },
}

/// A hosted image-generation service.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Service name for logs and errors.
    fn name(&self) -> &'static str;

    /// Render one image for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<ImageOutput, BackendError>;
}
