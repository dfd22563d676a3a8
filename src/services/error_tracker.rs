use std::fmt;
use std::sync::{Arc, RwLock};

/// Category of a tracked failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Exception,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorType::Exception => f.write_str("EXCEPTION"),
        }
    }
}

/// Integration a tracked failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCode {
    ApiActivateCode,
    ApiCancelCourse,
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageCode::ApiActivateCode => f.write_str("API_ACTIVATE_CODE"),
            MessageCode::ApiCancelCourse => f.write_str("API_CANCEL_COURSE"),
        }
    }
}

/// Sink for integration failures that are swallowed by the caller
pub trait ErrorTracker: Send + Sync {
    fn push_exception(
        &self,
        error_type: ErrorType,
        message_code: MessageCode,
        error: &(dyn std::error::Error + 'static),
    );
}

/// Emits tracked failures as structured error events
#[derive(Debug, Clone, Default)]
pub struct TracingErrorTracker;

impl ErrorTracker for TracingErrorTracker {
    fn push_exception(
        &self,
        error_type: ErrorType,
        message_code: MessageCode,
        error: &(dyn std::error::Error + 'static),
    ) {
        let cause = error.source().map(|s| s.to_string());

        tracing::error!(
            error_type = %error_type,
            message_code = %message_code,
            error = %error,
            cause = ?cause,
            "etl_exception"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedError {
    pub error_type: ErrorType,
    pub message_code: MessageCode,
    pub message: String,
}

/// Keeps tracked failures in memory for tests
#[derive(Debug, Clone, Default)]
pub struct RecordingErrorTracker {
    tracked: Arc<RwLock<Vec<TrackedError>>>,
}

impl RecordingErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> Vec<TrackedError> {
        self.tracked.read().unwrap().clone()
    }
}

impl ErrorTracker for RecordingErrorTracker {
    fn push_exception(
        &self,
        error_type: ErrorType,
        message_code: MessageCode,
        error: &(dyn std::error::Error + 'static),
    ) {
        self.tracked.write().unwrap().push(TrackedError {
            error_type,
            message_code,
            message: error.to_string(),
        });
    }
}
