//! Streaming image download with extension inference.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

/// Per-download timeout.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from the download layer.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("Download of {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Writing the file failed.
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Choose a file extension from the response content type, falling
/// back to the URL's own extension, then to `.jpg`.
pub fn infer_extension(content_type: Option<&str>, url: &str) -> &'static str {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if ct.contains("jpeg") || ct.contains("jpg") {
            return ".jpg";
        }
        if ct.contains("png") {
            return ".png";
        }
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('.').next() {
        Some("png") => ".png",
        Some("jpg") | Some("jpeg") => ".jpg",
        _ => ".jpg",
    }
}

/// Download `url` to exactly `dest`, streaming chunks to disk.
pub async fn download_image(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<(), DownloadError> {
    let response = client
        .get(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|source| DownloadError::Io {
            path: dest.to_path_buf(),
            source,
        })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|source| DownloadError::Io {
                path: dest.to_path_buf(),
                source,
            })?;
    }
    file.flush().await.map_err(|source| DownloadError::Io {
        path: dest.to_path_buf(),
        source,
    })?;

    tracing::debug!(url, dest = %dest.display(), "Downloaded image");
    Ok(())
}

/// Download `url` into `dir` under `stem` + an inferred extension.
/// Returns the full path written.
pub async fn download_to_dir(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
    stem: &str,
) -> Result<PathBuf, DownloadError> {
    let response = client
        .get(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let ext = infer_extension(content_type.as_deref(), url);
    let dest = dir.join(format!("{stem}{ext}"));

    let bytes = response.bytes().await?;
    tokio::fs::write(&dest, &bytes)
        .await
        .map_err(|source| DownloadError::Io {
            path: dest.clone(),
            source,
        })?;

    tracing::debug!(url, dest = %dest.display(), "Downloaded image");
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_wins() {
        assert_eq!(
            infer_extension(Some("image/png"), "https://x/file.jpg"),
            ".png"
        );
        assert_eq!(
            infer_extension(Some("image/jpeg"), "https://x/file.png"),
            ".jpg"
        );
    }

    #[test]
    fn url_extension_fallback() {
        assert_eq!(infer_extension(None, "https://x/file.png"), ".png");
        assert_eq!(infer_extension(None, "https://x/file.jpeg"), ".jpg");
    }

    #[test]
    fn query_string_stripped_before_extension() {
        assert_eq!(
            infer_extension(None, "https://x/file.png?token=abc"),
            ".png"
        );
    }

    #[test]
    fn unknown_defaults_to_jpg() {
        assert_eq!(infer_extension(None, "https://x/file"), ".jpg");
        assert_eq!(infer_extension(Some("application/octet-stream"), "https://x/f"), ".jpg");
    }
}
