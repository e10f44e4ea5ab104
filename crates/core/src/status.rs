//! Render status codes as tracked by the job-tracking service.
//!
//! The service stores the status as a small integer; the worker only
//! ever writes [`RenderStatus::Rendering`], [`RenderStatus::NeedsRetry`]
//! and [`RenderStatus::Failed`] directly — `Completed` is set server-side
//! as part of the filename update operation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle state of a prompt record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum RenderStatus {
    /// Waiting to be picked up by a worker.
    Queued,
    /// A worker has dispatched the record to a backend.
    Rendering,
    /// The final image has been stored and reported.
    Completed,
    /// Dispatched but output was not available yet; will be re-checked.
    NeedsRetry,
    /// Gave up on this record.
    Failed,
}

impl RenderStatus {
    /// Wire representation used by the job-tracking API.
    pub fn code(self) -> i16 {
        match self {
            RenderStatus::Queued => 0,
            RenderStatus::Rendering => 1,
            RenderStatus::Completed => 2,
            RenderStatus::NeedsRetry => 3,
            RenderStatus::Failed => 4,
        }
    }

    /// Parse a wire status code. Unknown codes are an error rather than
    /// a silent default — the status set is closed.
    pub fn from_code(code: i16) -> Result<Self, CoreError> {
        match code {
            0 => Ok(RenderStatus::Queued),
            1 => Ok(RenderStatus::Rendering),
            2 => Ok(RenderStatus::Completed),
            3 => Ok(RenderStatus::NeedsRetry),
            4 => Ok(RenderStatus::Failed),
            other => Err(CoreError::UnknownStatusCode(other)),
        }
    }

    /// True for the states a worker is expected to act on.
    ///
    /// `Rendering` and `NeedsRetry` are included because the poller
    /// re-checks in-flight records for finished output.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            RenderStatus::Queued | RenderStatus::Rendering | RenderStatus::NeedsRetry
        )
    }
}

impl From<RenderStatus> for i16 {
    fn from(s: RenderStatus) -> i16 {
        s.code()
    }
}

impl TryFrom<i16> for RenderStatus {
    type Error = CoreError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        RenderStatus::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn codes_round_trip() {
        for status in [
            RenderStatus::Queued,
            RenderStatus::Rendering,
            RenderStatus::Completed,
            RenderStatus::NeedsRetry,
            RenderStatus::Failed,
        ] {
            assert_eq!(RenderStatus::from_code(status.code()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_code_rejected() {
        assert_matches!(
            RenderStatus::from_code(7),
            Err(CoreError::UnknownStatusCode(7))
        );
    }

    #[test]
    fn pending_states() {
        assert!(RenderStatus::Queued.is_pending());
        assert!(RenderStatus::Rendering.is_pending());
        assert!(RenderStatus::NeedsRetry.is_pending());
        assert!(!RenderStatus::Completed.is_pending());
        assert!(!RenderStatus::Failed.is_pending());
    }

    #[test]
    fn serde_uses_wire_codes() {
        let json = serde_json::to_string(&RenderStatus::NeedsRetry).unwrap();
        assert_eq!(json, "3");
        let back: RenderStatus = serde_json::from_str("1").unwrap();
        assert_eq!(back, RenderStatus::Rendering);
    }
}
