//! Record routing and shared finalization.
//!
//! The routing predicates are pure so they can be tested without a
//! queue: given a record, which path (if any) on *this* worker should
//! take it. Skipped records are left untouched for another worker.

use std::path::Path;

use storyloom_client::{RenderQueueApi, RenderQueueApiError};
use storyloom_cloud::{ImageStore, LocalImageStore, S3ImageStore};
use storyloom_core::generation::GenerationType;
use storyloom_core::model::{is_local_model, resolve_model_name, ModelCatalog};
use storyloom_core::naming::s3_object_key;
use storyloom_core::prompt::PromptRecord;
use storyloom_core::status::RenderStatus;

/// Generation types the ComfyUI path can template.
const COMFY_TYPES: &[GenerationType] = &[
    GenerationType::Prompt,
    GenerationType::Mix,
    GenerationType::MixOne,
    GenerationType::KontextBasic,
];

/// What a worker decided to do with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Not for this worker; left untouched.
    Skipped,
    /// Dispatched to a backend this cycle; output pending.
    Dispatched,
    /// Dispatched on an earlier cycle; still waiting for output.
    Pending,
    /// Final image stored and reported.
    Completed,
    /// Marked needs-retry; output was not available yet.
    Retrying,
    /// Marked failed.
    Failed,
}

/// Counters for one poll cycle, logged at cycle end.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStats {
    pub seen: usize,
    pub skipped: usize,
    pub dispatched: usize,
    pub pending: usize,
    pub completed: usize,
    pub retrying: usize,
    pub failed: usize,
}

impl CycleStats {
    pub fn record(&mut self, outcome: RecordOutcome) {
        self.seen += 1;
        match outcome {
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Dispatched => self.dispatched += 1,
            RecordOutcome::Pending => self.pending += 1,
            RecordOutcome::Completed => self.completed += 1,
            RecordOutcome::Retrying => self.retrying += 1,
            RecordOutcome::Failed => self.failed += 1,
        }
    }
}

/// True when the ComfyUI path serves this record: a templated
/// generation type on a local model.
pub fn comfy_handles(record: &PromptRecord) -> bool {
    let Ok(generation_type) = GenerationType::parse(&record.generation_type) else {
        return false;
    };
    COMFY_TYPES.contains(&generation_type) && is_local_model(&record.model)
}

/// Resolve the hosted model for this record, if the hosted path serves
/// it: plain prompt records whose resolved model the catalog allows.
pub fn hosted_model_for(record: &PromptRecord, catalog: &ModelCatalog) -> Option<String> {
    if GenerationType::parse(&record.generation_type) != Ok(GenerationType::Prompt) {
        return None;
    }
    let resolved = resolve_model_name(&record.model);
    if catalog.allows(resolved) {
        Some(resolved.to_string())
    } else {
        None
    }
}

/// Where finished images go for one worker: S3 when configured, local
/// disk always available as the opt-out (and the fallback).
pub struct Stores {
    s3: Option<S3ImageStore>,
    local: LocalImageStore,
}

impl Stores {
    pub fn new(s3: Option<S3ImageStore>, local: LocalImageStore) -> Self {
        Self { s3, local }
    }

    /// Store a finished render and report its location. Records asking
    /// for S3 fall back to local disk when no bucket is configured.
    pub async fn finalize(
        &self,
        api: &RenderQueueApi,
        record: &PromptRecord,
        image_path: &Path,
        output_filename: &str,
    ) -> Result<(), RenderQueueApiError> {
        let key = s3_object_key(output_filename);
        let location = if record.wants_s3() {
            match &self.s3 {
                Some(s3) => s3.store(image_path, &key).await,
                None => {
                    tracing::warn!(
                        id = record.id,
                        "Record wants S3 but no bucket is configured; storing locally",
                    );
                    self.local.store(image_path, &key).await
                }
            }
        } else {
            self.local.store(image_path, &key).await
        };

        match location {
            Ok(location) => {
                api.update_filename(record.id, &location).await?;
                tracing::info!(id = record.id, location = %location, "Render completed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(id = record.id, error = %e, "Failed to store rendered image");
                api.update_render_status(record.id, RenderStatus::Failed)
                    .await?;
                Ok(())
            }
        }
    }
}
