//! Final image placement.
//!
//! Records flag whether their image goes to S3 (served through a CDN)
//! or stays on the machine. Both targets implement [`ImageStore`]; the
//! worker picks per record and reports whatever location comes back.

use std::path::{Path, PathBuf};

use aws_sdk_s3::primitives::ByteStream;

/// Errors from storing a rendered image.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// A place rendered images can be put, yielding the location string
/// reported back to the job-tracking service.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the file at `local_path` under `key`; return the public
    /// location (URL or path) to report.
    async fn store(&self, local_path: &Path, key: &str) -> Result<String, StorageError>;
}

/// S3-backed store with optional CDN URL mapping.
pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    /// CDN base URL; when set, reported URLs point at the CDN instead
    /// of the bucket.
    cdn_base: Option<String>,
}

impl S3ImageStore {
    /// Build a store from the ambient AWS configuration (env
    /// credentials, region).
    pub async fn from_env(bucket: String, cdn_base: Option<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket,
            cdn_base,
        }
    }

    pub fn new(client: aws_sdk_s3::Client, bucket: String, cdn_base: Option<String>) -> Self {
        Self {
            client,
            bucket,
            cdn_base,
        }
    }

    /// Public URL for an uploaded key.
    fn public_url(&self, key: &str) -> String {
        match &self.cdn_base {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/')),
            None => {
                let region = self
                    .client
                    .config()
                    .region()
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "us-east-1".to_string());
                format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, region, key)
            }
        }
    }
}

#[async_trait::async_trait]
impl ImageStore for S3ImageStore {
    async fn store(&self, local_path: &Path, key: &str) -> Result<String, StorageError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::Read {
                path: local_path.to_path_buf(),
                source: std::io::Error::other(e),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let url = self.public_url(key);
        tracing::info!(key, url = %url, "Uploaded image to S3");
        Ok(url)
    }
}

/// Plain-directory store for records that opt out of S3. The reported
/// location is the absolute path of the copy.
pub struct LocalImageStore {
    output_dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

#[async_trait::async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, local_path: &Path, key: &str) -> Result<String, StorageError> {
        // Keys look like "images/<filename>"; only the file name
        // matters on disk.
        let filename = Path::new(key)
            .file_name()
            .map(|f| f.to_os_string())
            .unwrap_or_else(|| "image.png".into());
        let dest = self.output_dir.join(filename);

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| StorageError::Copy {
                from: local_path.to_path_buf(),
                to: dest.clone(),
                source,
            })?;

        // No-op when the render already landed in the output dir.
        if dest != local_path {
            tokio::fs::copy(local_path, &dest)
                .await
                .map_err(|source| StorageError::Copy {
                    from: local_path.to_path_buf(),
                    to: dest.clone(),
                    source,
                })?;
        }

        Ok(dest.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_store_copies_and_reports_path() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("render.png");
        std::fs::write(&src, b"png bytes").unwrap();

        let store = LocalImageStore::new(out_dir.path().to_path_buf());
        let reported = store.store(&src, "images/prompt_dev_1_2.png").await.unwrap();

        let dest = out_dir.path().join("prompt_dev_1_2.png");
        assert_eq!(reported, dest.to_string_lossy());
        assert_eq!(std::fs::read(dest).unwrap(), b"png bytes");
    }

    #[tokio::test]
    async fn local_store_accepts_file_already_in_place() {
        let out_dir = tempfile::tempdir().unwrap();
        let src = out_dir.path().join("render.png");
        std::fs::write(&src, b"png bytes").unwrap();

        let store = LocalImageStore::new(out_dir.path().to_path_buf());
        let reported = store.store(&src, "images/render.png").await.unwrap();
        assert_eq!(reported, src.to_string_lossy());
    }

    #[tokio::test]
    async fn local_store_creates_missing_output_dir() {
        let src_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("render.png");
        std::fs::write(&src, b"x").unwrap();

        let base = tempfile::tempdir().unwrap();
        let out = base.path().join("nested").join("images");
        let store = LocalImageStore::new(out.clone());
        store.store(&src, "images/a.png").await.unwrap();
        assert!(out.join("a.png").exists());
    }
}
