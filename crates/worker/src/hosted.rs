//! Hosted-API render path.
//!
//! Simpler than the local path: hosted jobs block inside the backend
//! call (queue polling included), so by the time `generate` returns
//! there is either an image or an error. Records seen in an in-flight
//! state were dispatched by a worker that died mid-job; the stall
//! guard eventually fails them.

use std::time::Duration;

use storyloom_backends::data_uri::collect_reference_images;
use storyloom_backends::{GenerationBackend, GenerationRequest, ImageOutput};
use storyloom_client::RenderQueueApi;
use storyloom_cloud::download_image;
use storyloom_core::model::ModelCatalog;
use storyloom_core::naming::output_image_filename;
use storyloom_core::prompt::PromptRecord;
use storyloom_core::stall::{StallTracker, DEFAULT_STALL_THRESHOLD};
use storyloom_core::status::RenderStatus;

use crate::dispatch::{hosted_model_for, CycleStats, RecordOutcome, Stores};
use crate::{ProcessError, WorkerError};

/// Pause between hosted submissions, to stay under service rate limits.
const RECORD_PACING: Duration = Duration::from_secs(6);

/// True when the model is served by the OpenAI Images API rather than
/// the fal queue.
pub fn is_openai_model(model: &str) -> bool {
    model.starts_with("gpt-image") || model.starts_with("dall-e")
}

/// Worker loop body for the hosted path.
pub struct HostedWorker {
    api: RenderQueueApi,
    http: reqwest::Client,
    stores: Stores,
    stall: StallTracker,
    catalog: ModelCatalog,
    fal: Option<storyloom_backends::fal::FalBackend>,
    openai: Option<storyloom_backends::openai::OpenAiBackend>,
}

impl HostedWorker {
    pub fn new(
        api: RenderQueueApi,
        http: reqwest::Client,
        stores: Stores,
        catalog: ModelCatalog,
        fal: Option<storyloom_backends::fal::FalBackend>,
        openai: Option<storyloom_backends::openai::OpenAiBackend>,
    ) -> Self {
        Self {
            api,
            http,
            stores,
            stall: StallTracker::new(DEFAULT_STALL_THRESHOLD),
            catalog,
            fal,
            openai,
        }
    }

    /// One poll cycle over the pending batch.
    pub async fn run_cycle(&mut self) -> Result<CycleStats, WorkerError> {
        let records = self.api.fetch_pending().await?;
        tracing::debug!(count = records.len(), "Fetched pending records");

        let mut stats = CycleStats::default();
        for record in &records {
            let outcome = self.process_record(record).await;
            stats.record(outcome);
            if outcome != RecordOutcome::Skipped {
                tokio::time::sleep(RECORD_PACING).await;
            }
        }
        Ok(stats)
    }

    async fn process_record(&mut self, record: &PromptRecord) -> RecordOutcome {
        let Some(model) = hosted_model_for(record, &self.catalog) else {
            tracing::trace!(
                id = record.id,
                generation_type = %record.generation_type,
                model = %record.model,
                "Skipping record: not a hosted render",
            );
            return RecordOutcome::Skipped;
        };

        tracing::info!(
            id = record.id,
            model = %record.model,
            resolved_model = %model,
            status = record.render_status,
            user_id = record.user_id,
            "Processing record",
        );

        match self.try_process(record, &model).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(id = record.id, error = %e, "Record failed");
                self.stall.clear(record.id);
                if let Err(report_err) = self
                    .api
                    .update_render_status(record.id, RenderStatus::Failed)
                    .await
                {
                    tracing::error!(
                        id = record.id,
                        error = %report_err,
                        "Failed to report failure",
                    );
                }
                RecordOutcome::Failed
            }
        }
    }

    async fn try_process(
        &mut self,
        record: &PromptRecord,
        model: &str,
    ) -> Result<RecordOutcome, ProcessError> {
        let Some(prompt) = record.prompt_text() else {
            tracing::debug!(id = record.id, "Skipping record with empty prompt");
            return Ok(RecordOutcome::Skipped);
        };

        let status = RenderStatus::from_code(record.render_status)?;
        if matches!(status, RenderStatus::Rendering | RenderStatus::NeedsRetry) {
            // Some other run dispatched this; nothing to re-check on a
            // synchronous backend, so just count sightings.
            if self.stall.record_sighting(record.id) {
                tracing::warn!(id = record.id, "Record stalled; marking failed");
                self.api
                    .update_render_status(record.id, RenderStatus::Failed)
                    .await?;
                return Ok(RecordOutcome::Failed);
            }
            return Ok(RecordOutcome::Pending);
        }

        self.api
            .update_render_status(record.id, RenderStatus::Rendering)
            .await?;

        let references = record.reference_images();
        let image_urls = collect_reference_images(&self.http, references).await;
        if !references.is_empty() {
            tracing::info!(
                id = record.id,
                requested = references.len(),
                embedded = image_urls.len(),
                "Embedded reference images",
            );
        }

        let request = GenerationRequest {
            record_id: record.id,
            model: model.to_string(),
            prompt: prompt.to_string(),
            width: record.width_or_default(),
            height: record.height_or_default(),
            image_urls,
        };

        let backend = self.backend_for(model)?;
        let output = backend.generate(&request).await?;

        let output_filename = output_image_filename(
            &record.generation_type,
            &record.model,
            record.id,
            record.user_id,
        );
        let local_path = std::env::temp_dir().join(&output_filename);
        match output {
            ImageOutput::Url(url) => {
                download_image(&self.http, &url, &local_path).await?;
            }
            ImageOutput::Bytes(bytes) => {
                tokio::fs::write(&local_path, &bytes).await?;
            }
        }

        self.stall.clear(record.id);
        self.stores
            .finalize(&self.api, record, &local_path, &output_filename)
            .await?;

        if let Err(e) = tokio::fs::remove_file(&local_path).await {
            tracing::debug!(path = %local_path.display(), error = %e, "Temp image not removed");
        }
        Ok(RecordOutcome::Completed)
    }

    fn backend_for(&self, model: &str) -> Result<&dyn GenerationBackend, ProcessError> {
        if is_openai_model(model) {
            if let Some(openai) = &self.openai {
                return Ok(openai);
            }
        } else if let Some(fal) = &self.fal {
            return Ok(fal);
        }
        Err(ProcessError::NoBackend(model.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_models_recognized() {
        assert!(is_openai_model("gpt-image-1"));
        assert!(is_openai_model("dall-e-3"));
        assert!(!is_openai_model("flux-1/schnell"));
        assert!(!is_openai_model("aura-flow"));
    }
}
