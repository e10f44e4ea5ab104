//! Reference-image embedding for hosted edit models.
//!
//! Edit models take their reference images inline as `data:` URIs, so
//! each record entry — a URL or a local path — is fetched/read,
//! mime-sniffed, and base64-encoded.

use base64::engine::general_purpose;
use base64::Engine;

use crate::BackendError;

/// Sniff an image mime type from magic bytes. Falls back to JPEG,
/// which every generation service accepts as a reference format.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

/// Encode raw image bytes as a `data:` URI.
pub fn encode_data_uri(bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        sniff_mime(bytes),
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Load one reference image — URL or local path — as a `data:` URI.
pub async fn load_as_data_uri(
    client: &reqwest::Client,
    source: &str,
) -> Result<String, BackendError> {
    let bytes: Vec<u8> = if source.starts_with("http://") || source.starts_with("https://") {
        let response = client.get(source).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Api {
                service: "image fetch",
                status: status.as_u16(),
                body: source.to_string(),
            });
        }
        response.bytes().await?.to_vec()
    } else {
        tokio::fs::read(source)
            .await
            .map_err(|source_err| BackendError::ImageRead {
                path: source.to_string(),
                source: source_err,
            })?
    };

    Ok(encode_data_uri(&bytes))
}

/// Load every reference image on a record, skipping (and logging) the
/// ones that cannot be read. Dropping a broken reference matches how
/// records were handled before: the generation proceeds with whatever
/// references loaded.
pub async fn collect_reference_images(
    client: &reqwest::Client,
    sources: &[String],
) -> Vec<String> {
    let mut uris = Vec::with_capacity(sources.len());
    for source in sources {
        match load_as_data_uri(client, source).await {
            Ok(uri) => uris.push(uri),
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "Skipping unreadable reference image");
            }
        }
    }
    uris
}
