//! ComfyUI render path.
//!
//! Per record: load + patch the workflow template, queue it, give the
//! instance a moment, then look for the saved file. Output that is not
//! there yet parks the record in needs-retry; the next cycles pick it
//! up again through the in-flight branch until the file appears or the
//! stall guard gives up.

use std::path::PathBuf;
use std::time::Duration;

use storyloom_client::RenderQueueApi;
use storyloom_cloud::download_image;
use storyloom_comfyui::outputs::{expected_output_path, resolve_kontext_output};
use storyloom_comfyui::{build_workflow, ComfyUIApi, RenderJob};
use storyloom_core::generation::GenerationType;
use storyloom_core::naming::output_image_filename;
use storyloom_core::prompt::PromptRecord;
use storyloom_core::stall::{StallTracker, DEFAULT_STALL_THRESHOLD};
use storyloom_core::status::RenderStatus;

use crate::dispatch::{comfy_handles, CycleStats, RecordOutcome, Stores};
use crate::{ProcessError, WorkerError};

/// How long to wait after queuing before the first output check.
const POST_SUBMIT_SETTLE: Duration = Duration::from_secs(5);

/// Worker loop body for the local ComfyUI path.
pub struct ComfyWorker {
    api: RenderQueueApi,
    comfy: ComfyUIApi,
    http: reqwest::Client,
    stores: Stores,
    stall: StallTracker,
    workflow_dir: PathBuf,
    output_dir: PathBuf,
    comfy_output_dir: PathBuf,
}

impl ComfyWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: RenderQueueApi,
        comfy: ComfyUIApi,
        http: reqwest::Client,
        stores: Stores,
        workflow_dir: PathBuf,
        output_dir: PathBuf,
        comfy_output_dir: PathBuf,
    ) -> Self {
        Self {
            api,
            comfy,
            http,
            stores,
            stall: StallTracker::new(DEFAULT_STALL_THRESHOLD),
            workflow_dir,
            output_dir,
            comfy_output_dir,
        }
    }

    /// One poll cycle: fetch the pending batch and process each record
    /// sequentially.
    pub async fn run_cycle(&mut self) -> Result<CycleStats, WorkerError> {
        let records = self.api.fetch_pending().await?;
        tracing::debug!(count = records.len(), "Fetched pending records");

        let mut stats = CycleStats::default();
        for record in &records {
            stats.record(self.process_record(record).await);
        }
        Ok(stats)
    }

    /// Process one record, converting any error into a failed status.
    async fn process_record(&mut self, record: &PromptRecord) -> RecordOutcome {
        if !comfy_handles(record) {
            tracing::trace!(
                id = record.id,
                generation_type = %record.generation_type,
                model = %record.model,
                "Skipping record: not a local render",
            );
            return RecordOutcome::Skipped;
        }

        tracing::info!(
            id = record.id,
            generation_type = %record.generation_type,
            model = %record.model,
            status = record.render_status,
            user_id = record.user_id,
            "Processing record",
        );

        match self.try_process(record).await {
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

    async fn try_process(&mut self, record: &PromptRecord) -> Result<RecordOutcome, ProcessError> {
        let generation_type = GenerationType::parse(&record.generation_type)?;
        let Some(prompt) = record.prompt_text() else {
            tracing::debug!(id = record.id, "Skipping record with empty prompt");
            return Ok(RecordOutcome::Skipped);
        };

        let (output_path, output_filename) = self.resolve_output(record, generation_type).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let status = RenderStatus::from_code(record.render_status)?;
        if matches!(status, RenderStatus::Rendering | RenderStatus::NeedsRetry) {
            if self.stall.record_sighting(record.id) {
                tracing::warn!(id = record.id, "Record stalled; marking failed");
                self.api
                    .update_render_status(record.id, RenderStatus::Failed)
                    .await?;
                return Ok(RecordOutcome::Failed);
            }
            if output_path.exists() {
                self.stall.clear(record.id);
                self.stores
                    .finalize(&self.api, record, &output_path, &output_filename)
                    .await?;
                return Ok(RecordOutcome::Completed);
            }
            return Ok(RecordOutcome::Pending);
        }

        // Queued. A file may already exist from an earlier run that
        // never got reported.
        if output_path.exists() {
            tracing::info!(id = record.id, "Found existing output; reporting");
            self.stores
                .finalize(&self.api, record, &output_path, &output_filename)
                .await?;
            return Ok(RecordOutcome::Completed);
        }

        // Fresh dispatch: stage source images, patch, queue. The
        // staging directory must outlive this call — ComfyUI reads the
        // files when the graph executes, not when it is queued.
        let staging = tempfile::tempdir()?.keep();
        let input_images = self
            .stage_input_images(record, generation_type, &staging)
            .await?;

        let job = RenderJob {
            generation_type,
            model: record.model.clone(),
            prompt: prompt.to_string(),
            width: record.width_or_default(),
            height: record.height_or_default(),
            output_filename: output_filename.clone(),
            input_images,
            input_image_1_strength: record.input_image_1_strength,
            input_image_2_strength: record.input_image_2_strength,
            seed: RenderJob::random_seed(),
        };
        let workflow = build_workflow(&self.workflow_dir, &job)?;

        self.comfy.submit_workflow(&workflow, record.id).await?;
        self.api
            .update_render_status(record.id, RenderStatus::Rendering)
            .await?;
        tracing::info!(id = record.id, "Queued render");

        tokio::time::sleep(POST_SUBMIT_SETTLE).await;

        if output_path.exists() {
            self.stores
                .finalize(&self.api, record, &output_path, &output_filename)
                .await?;
            Ok(RecordOutcome::Completed)
        } else {
            tracing::debug!(id = record.id, "Output not ready yet");
            self.api
                .update_render_status(record.id, RenderStatus::NeedsRetry)
                .await?;
            Ok(RecordOutcome::Retrying)
        }
    }

    /// Where this record's output lands, and the file name to report
    /// it under.
    ///
    /// Kontext graphs name their own outputs, so the path comes from
    /// the execution history; everything else saves under the patched
    /// file name template.
    async fn resolve_output(
        &self,
        record: &PromptRecord,
        generation_type: GenerationType,
    ) -> Result<(PathBuf, String), ProcessError> {
        if generation_type == GenerationType::KontextBasic {
            let history = self.comfy.get_history(record.id).await?;
            let path = resolve_kontext_output(&history, record.id, &self.comfy_output_dir);
            let filename = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "kontext.png".to_string());
            Ok((path, filename))
        } else {
            let filename = output_image_filename(
                &record.generation_type,
                &record.model,
                record.id,
                record.user_id,
            );
            Ok((expected_output_path(&self.output_dir, &filename), filename))
        }
    }

    /// Download the record's source images into the staging directory,
    /// in record order. Only the URLs the generation type needs are
    /// considered.
    async fn stage_input_images(
        &self,
        record: &PromptRecord,
        generation_type: GenerationType,
        staging: &std::path::Path,
    ) -> Result<Vec<PathBuf>, ProcessError> {
        let needed = generation_type.input_image_count();
        let sources = [&record.input_image_1, &record.input_image_2];

        let mut paths = Vec::with_capacity(needed);
        for (index, source) in sources.iter().enumerate().take(needed) {
            let Some(url) = source.as_deref() else {
                // Missing URL surfaces as a missing-image patch error
                // with the right index.
                break;
            };
            let dest = staging.join(format!("image{}.png", index + 1));
            download_image(&self.http, url, &dest).await?;
            paths.push(dest);
        }
        Ok(paths)
    }
}
