//! Image transfer: downloading rendered images and putting them where
//! the job-tracking service can serve them from — an S3 bucket fronted
//! by a CDN, or a plain directory on local disk.

pub mod download;
pub mod store;

pub use download::{download_image, download_to_dir, DownloadError};
pub use store::{ImageStore, LocalImageStore, S3ImageStore, StorageError};
