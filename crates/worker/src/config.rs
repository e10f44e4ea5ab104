//! Worker configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

/// Which generation path this worker serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// Local ComfyUI rendering.
    Comfy,
    /// Hosted generation APIs.
    Hosted,
}

impl WorkerMode {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "comfy" => Ok(WorkerMode::Comfy),
            "hosted" => Ok(WorkerMode::Hosted),
            other => anyhow::bail!("WORKER_MODE must be 'comfy' or 'hosted', got '{other}'"),
        }
    }
}

/// Everything a worker reads from the environment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Job-tracking API base, e.g. `http://localhost:8011/api`.
    pub api_base_url: String,
    pub mode: WorkerMode,
    /// Delay between poll cycles.
    pub poll_interval: Duration,

    // -- comfy mode --
    /// ComfyUI HTTP base URL.
    pub comfy_url: String,
    /// Directory holding the workflow template files.
    pub workflow_dir: PathBuf,
    /// Directory ComfyUI saves template-named outputs into.
    pub output_dir: PathBuf,
    /// ComfyUI's own default output directory (kontext outputs).
    pub comfy_output_dir: PathBuf,

    // -- hosted mode --
    pub fal_key: Option<String>,
    pub fal_timeout: Duration,
    pub openai_api_key: Option<String>,
    /// Model catalog file for hosted dispatch.
    pub models_file: PathBuf,

    // -- storage --
    pub aws_bucket: Option<String>,
    pub cloudfront_url: Option<String>,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl WorkerConfig {
    /// Read the configuration, applying defaults where the variable is
    /// optional.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_base_url =
            std::env::var("API_BASE_URL").context("API_BASE_URL must be set")?;
        let mode = WorkerMode::parse(&var_or("WORKER_MODE", "comfy"))?;

        let poll_interval_s: u64 = var_or("POLL_INTERVAL_S", "5")
            .parse()
            .context("POLL_INTERVAL_S must be a number of seconds")?;
        let fal_timeout_s: u64 = var_or("FAL_TIMEOUT", "180")
            .parse()
            .context("FAL_TIMEOUT must be a number of seconds")?;

        Ok(Self {
            api_base_url,
            mode,
            poll_interval: Duration::from_secs(poll_interval_s),
            comfy_url: var_or("COMFY_URL", "http://127.0.0.1:8188"),
            workflow_dir: PathBuf::from(var_or("WORKFLOW_DIR", "workflows")),
            output_dir: PathBuf::from(var_or("OUTPUT_DIR", "output")),
            comfy_output_dir: PathBuf::from(var_or("COMFY_DEFAULT_OUTPUT_DIR", "output")),
            fal_key: std::env::var("FAL_KEY").ok(),
            fal_timeout: Duration::from_secs(fal_timeout_s),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            models_file: PathBuf::from(var_or("MODELS_FILE", "resources/models.json")),
            aws_bucket: std::env::var("AWS_BUCKET").ok(),
            cloudfront_url: std::env::var("AWS_CLOUDFRONT_URL").ok(),
        })
    }
}
