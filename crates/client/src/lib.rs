//! HTTP client for the job-tracking service.
//!
//! The service owns all prompt records; workers fetch the pending batch
//! and patch back render status and the final image location through
//! the endpoints wrapped here.

pub mod api;

pub use api::{RenderQueueApi, RenderQueueApiError};
