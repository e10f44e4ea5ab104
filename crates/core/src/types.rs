/// Prompt record ids are numeric on the job-tracking service.
pub type PromptId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
