use std::time::Duration;

use storyloom_client::RenderQueueApi;
use storyloom_cloud::{LocalImageStore, S3ImageStore};
use storyloom_core::model::ModelCatalog;
use storyloom_worker::config::{WorkerConfig, WorkerMode};
use storyloom_worker::dispatch::{CycleStats, Stores};
use storyloom_worker::hosted::HostedWorker;
use storyloom_worker::local::ComfyWorker;
use storyloom_worker::WorkerError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The mode-specific loop body behind one `run_cycle` call site.
enum Worker {
    Comfy(Box<ComfyWorker>),
    Hosted(Box<HostedWorker>),
}

impl Worker {
    async fn run_cycle(&mut self) -> Result<CycleStats, WorkerError> {
        match self {
            Worker::Comfy(w) => w.run_cycle().await,
            Worker::Hosted(w) => w.run_cycle().await,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyloom_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    tracing::info!(mode = ?config.mode, api = %config.api_base_url, "Worker starting");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client");

    let api = RenderQueueApi::with_client(http.clone(), config.api_base_url.clone());
    let queue_stats = RenderQueueApi::with_client(http.clone(), config.api_base_url.clone());

    let s3 = match &config.aws_bucket {
        Some(bucket) => {
            let store =
                S3ImageStore::from_env(bucket.clone(), config.cloudfront_url.clone()).await;
            tracing::info!(bucket = %bucket, cdn = ?config.cloudfront_url, "S3 store configured");
            Some(store)
        }
        None => {
            tracing::info!("No AWS_BUCKET set; storing images locally only");
            None
        }
    };
    let stores = Stores::new(s3, LocalImageStore::new(config.output_dir.clone()));

    let mut worker = match config.mode {
        WorkerMode::Comfy => {
            let comfy = storyloom_comfyui::ComfyUIApi::with_client(
                http.clone(),
                config.comfy_url.clone(),
            );
            Worker::Comfy(Box::new(ComfyWorker::new(
                api,
                comfy,
                http,
                stores,
                config.workflow_dir.clone(),
                config.output_dir.clone(),
                config.comfy_output_dir.clone(),
            )))
        }
        WorkerMode::Hosted => {
            let catalog = load_catalog(&config);
            let fal = config
                .fal_key
                .clone()
                .map(|key| storyloom_backends::fal::FalBackend::new(key, config.fal_timeout));
            let openai = config
                .openai_api_key
                .clone()
                .map(storyloom_backends::openai::OpenAiBackend::new);
            if fal.is_none() && openai.is_none() {
                anyhow::bail!("Hosted mode needs FAL_KEY or OPENAI_API_KEY");
            }
            Worker::Hosted(Box::new(HostedWorker::new(
                api, http, stores, catalog, fal, openai,
            )))
        }
    };

    // Poll forever: a failed cycle is logged and the loop keeps going.
    loop {
        match worker.run_cycle().await {
            Ok(stats) => {
                if stats.seen > 0 {
                    tracing::info!(
                        seen = stats.seen,
                        completed = stats.completed,
                        dispatched = stats.dispatched,
                        pending = stats.pending,
                        retrying = stats.retrying,
                        failed = stats.failed,
                        skipped = stats.skipped,
                        "Cycle done",
                    );
                } else {
                    tracing::debug!("No pending records");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Poll cycle failed");
            }
        }

        if let Ok(count) = queue_stats.queue_count().await {
            tracing::debug!(count, "Renders still queued");
        }

        tokio::time::sleep(config.poll_interval).await;
    }
}

/// Load the hosted-model catalog, falling back to an empty one (only
/// override models dispatchable) when the file is missing or broken.
fn load_catalog(config: &WorkerConfig) -> ModelCatalog {
    match std::fs::read_to_string(&config.models_file) {
        Ok(text) => match ModelCatalog::from_json(&text) {
            Ok(catalog) => {
                tracing::info!(
                    models = catalog.len(),
                    file = %config.models_file.display(),
                    "Loaded model catalog",
                );
                catalog
            }
            Err(e) => {
                tracing::error!(
                    file = %config.models_file.display(),
                    error = %e,
                    "Model catalog unparsable; dispatching override models only",
                );
                ModelCatalog::default()
            }
        },
        Err(e) => {
            tracing::error!(
                file = %config.models_file.display(),
                error = %e,
                "Model catalog unreadable; dispatching override models only",
            );
            ModelCatalog::default()
        }
    }
}
