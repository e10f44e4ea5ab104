//! REST client for the job-tracking API endpoints.

use serde::{Deserialize, Serialize};
use storyloom_core::prompt::PromptRecord;
use storyloom_core::status::RenderStatus;
use storyloom_core::types::PromptId;

/// HTTP client for one job-tracking service instance.
pub struct RenderQueueApi {
    client: reqwest::Client,
    base_url: String,
}

/// Response of `GET /prompts/pending`.
#[derive(Debug, Deserialize)]
struct PendingResponse {
    #[allow(dead_code)]
    success: bool,
    prompts: Vec<PromptRecord>,
}

/// Response of `GET /prompts/queue-count`.
#[derive(Debug, Deserialize)]
struct QueueCountResponse {
    count: i64,
}

/// Acknowledgement body returned by the update endpoints.
#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateStatusRequest {
    id: PromptId,
    status: i16,
}

#[derive(Debug, Serialize)]
struct UpdateFilenameRequest<'a> {
    id: PromptId,
    filename: &'a str,
}

/// Errors from the job-tracking API layer.
#[derive(Debug, thiserror::Error)]
pub enum RenderQueueApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Job API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose body reports `success: false`.
    #[error("Job API rejected the request: {0}")]
    Rejected(String),
}

impl RenderQueueApi {
    /// Create a client for the API at `base_url`
    /// (e.g. `http://localhost:8011/api`).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (connection pooling with the other HTTP layers).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Fetch the pending batch: every record the service wants workers
    /// to look at (queued, plus in-flight records to re-check).
    pub async fn fetch_pending(&self) -> Result<Vec<PromptRecord>, RenderQueueApiError> {
        let response = self
            .client
            .get(format!("{}/prompts/pending", self.base_url))
            .send()
            .await?;

        let body: PendingResponse = Self::parse_response(response).await?;
        Ok(body.prompts)
    }

    /// Patch a record's render status.
    pub async fn update_render_status(
        &self,
        id: PromptId,
        status: RenderStatus,
    ) -> Result<(), RenderQueueApiError> {
        let response = self
            .client
            .post(format!("{}/prompts/update-status", self.base_url))
            .json(&UpdateStatusRequest {
                id,
                status: status.code(),
            })
            .send()
            .await?;

        Self::check_ack(response).await?;
        tracing::debug!(id, status = status.code(), "Updated render status");
        Ok(())
    }

    /// Report the final image location for a record. The service marks
    /// the record completed as part of this update.
    pub async fn update_filename(
        &self,
        id: PromptId,
        filename: &str,
    ) -> Result<(), RenderQueueApiError> {
        let response = self
            .client
            .post(format!("{}/prompts/update-filename", self.base_url))
            .json(&UpdateFilenameRequest { id, filename })
            .send()
            .await?;

        Self::check_ack(response).await?;
        tracing::debug!(id, filename, "Reported final image location");
        Ok(())
    }

    /// Number of records still waiting for a render.
    pub async fn queue_count(&self) -> Result<i64, RenderQueueApiError> {
        let response = self
            .client
            .get(format!("{}/prompts/queue-count", self.base_url))
            .send()
            .await?;

        let body: QueueCountResponse = Self::parse_response(response).await?;
        Ok(body.count)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an `ApiError` carrying the
    /// status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RenderQueueApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RenderQueueApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RenderQueueApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Check both the HTTP status and the `success` flag in the body.
    async fn check_ack(response: reqwest::Response) -> Result<(), RenderQueueApiError> {
        let ack: AckResponse = Self::parse_response(response).await?;
        if !ack.success {
            return Err(RenderQueueApiError::Rejected(
                ack.message.unwrap_or_else(|| "<no message>".to_string()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_response_shape() {
        let json = r#"{
            "success": true,
            "prompts": [{
                "id": 3, "user_id": 1, "generation_type": "prompt",
                "model": "schnell", "width": 1024, "height": 1024,
                "generated_prompt": "a lighthouse at dusk",
                "render_status": 0, "upload_to_s3": false,
                "input_image_1": null, "input_image_2": null,
                "input_image_1_strength": null,
                "input_image_2_strength": null, "filename": null
            }]
        }"#;
        let parsed: PendingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.prompts.len(), 1);
        assert_eq!(parsed.prompts[0].id, 3);
    }

    #[test]
    fn queue_count_shape() {
        let parsed: QueueCountResponse = serde_json::from_str(r#"{"count": 12}"#).unwrap();
        assert_eq!(parsed.count, 12);
    }

    #[test]
    fn ack_carries_optional_message() {
        let ok: AckResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(ok.success);
        let rejected: AckResponse =
            serde_json::from_str(r#"{"success": false, "message": "Prompt not found"}"#).unwrap();
        assert!(!rejected.success);
        assert_eq!(rejected.message.as_deref(), Some("Prompt not found"));
    }
}
