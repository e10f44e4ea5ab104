use crate::types::PromptId;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Prompt not found: id {0}")]
    NotFound(PromptId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown generation type: '{0}'")]
    UnknownGenerationType(String),

    #[error("Unknown render status code: {0}")]
    UnknownStatusCode(i16),

    #[error("Internal error: {0}")]
    Internal(String),
}
