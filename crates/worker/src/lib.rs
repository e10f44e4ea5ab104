//! Render-job worker: polls the job-tracking service and drives one of
//! the generation paths.
//!
//! A worker runs in one of two modes. The *comfy* mode serves local
//! models by templating ComfyUI workflows; the *hosted* mode submits
//! to external generation APIs. Both end the same way: download/locate
//! the image, store it, report the location.

pub mod config;
pub mod dispatch;
pub mod hosted;
pub mod local;

/// Errors that can fail a whole poll cycle (as opposed to a single
/// record, which is failed in place and reported).
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Queue(#[from] storyloom_client::RenderQueueApiError),
}

/// Everything that can go wrong while processing a single record.
/// Always handled in place: logged, and the record marked failed.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Core(#[from] storyloom_core::error::CoreError),

    #[error(transparent)]
    Workflow(#[from] storyloom_comfyui::WorkflowError),

    #[error(transparent)]
    ComfyApi(#[from] storyloom_comfyui::ComfyUIApiError),

    #[error(transparent)]
    Backend(#[from] storyloom_backends::BackendError),

    #[error(transparent)]
    Download(#[from] storyloom_cloud::DownloadError),

    #[error(transparent)]
    Queue(#[from] storyloom_client::RenderQueueApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No backend configured for model '{0}'")]
    NoBackend(String),
}
