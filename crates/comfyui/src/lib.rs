//! ComfyUI REST client and workflow templating.
//!
//! The local render path drives a ComfyUI instance by loading a JSON
//! workflow template for the record's generation type, overwriting a
//! fixed set of node inputs (prompt text, seed, dimensions, output
//! file name, source images), and submitting the patched graph over
//! the HTTP API. Output discovery is filesystem-based, except for
//! kontext edits which read the execution history.

pub mod api;
pub mod outputs;
pub mod workflow;

pub use api::{ComfyUIApi, ComfyUIApiError};
pub use workflow::{build_workflow, patch_workflow, RenderJob, Workflow, WorkflowError};
