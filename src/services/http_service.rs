use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::Serialize;

use super::error_tracker::MessageCode;

pub const JSON_UTF8: &str = "application/json;charset=UTF-8";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum HttpServiceError {
    /// Transport-level failure: the call may succeed on a later attempt.
    #[error("Recoverable HTTP failure: {0}")]
    Recoverable(#[source] BoxError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HttpServiceError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HttpServiceError::Recoverable(_))
    }
}

impl From<reqwest::Error> for HttpServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            HttpServiceError::InvalidRequest(e.to_string())
        } else {
            HttpServiceError::Recoverable(Box::new(e))
        }
    }
}

#[derive(Debug, Serialize)]
struct CancelCourseRequest<'a> {
    cod_code: &'a str,
}

/// Course management calls made for activation codes
#[async_trait]
pub trait CourseService: Send + Sync {
    /// Asks the course platform to cancel the course behind `activate_code`.
    /// Returns the HTTP status the platform answered with.
    async fn cancel_course(&self, activate_code: &str) -> Result<StatusCode, HttpServiceError>;
}

pub struct HttpCourseService {
    client: Client,
    cancel_course_url: String,
}

impl HttpCourseService {
    pub fn new(client: Client, cancel_course_url: impl Into<String>) -> Self {
        Self {
            client,
            cancel_course_url: cancel_course_url.into(),
        }
    }
}

#[async_trait]
impl CourseService for HttpCourseService {
    #[tracing::instrument(skip(self))]
    async fn cancel_course(&self, activate_code: &str) -> Result<StatusCode, HttpServiceError> {
        let response = self
            .client
            .post(&self.cancel_course_url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .json(&CancelCourseRequest {
                cod_code: activate_code,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(
                    message_code = %MessageCode::ApiCancelCourse,
                    error = %e,
                    "Cancel course request failed"
                );
                HttpServiceError::from(e)
            })?;

        let status = response.status();

        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                message_code = %MessageCode::ApiCancelCourse,
                status = %status,
                body = %body,
                "Cancel course rejected"
            );
        } else {
            tracing::debug!(status = %status, "Course cancelled");
        }

        Ok(status)
    }
}

#[derive(Debug, Clone, Copy)]
enum CannedResponse {
    Status(u16),
    Unreachable,
    InvalidRequest,
}

#[derive(Debug, Default)]
struct InMemoryCourseState {
    responses: HashMap<String, CannedResponse>,
    calls: Vec<String>,
}

/// Course service answering from canned responses, 200 unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCourseService {
    state: Arc<RwLock<InMemoryCourseState>>,
}

impl InMemoryCourseService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, activate_code: &str, status: u16) {
        self.state
            .write()
            .unwrap()
            .responses
            .insert(activate_code.to_string(), CannedResponse::Status(status));
    }

    pub fn fail_transport(&self, activate_code: &str) {
        self.state
            .write()
            .unwrap()
            .responses
            .insert(activate_code.to_string(), CannedResponse::Unreachable);
    }

    pub fn fail_request(&self, activate_code: &str) {
        self.state
            .write()
            .unwrap()
            .responses
            .insert(activate_code.to_string(), CannedResponse::InvalidRequest);
    }

    /// Codes passed to `cancel_course`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.state.read().unwrap().calls.clone()
    }
}

#[async_trait]
impl CourseService for InMemoryCourseService {
    async fn cancel_course(&self, activate_code: &str) -> Result<StatusCode, HttpServiceError> {
        let mut state = self.state.write().unwrap();
        state.calls.push(activate_code.to_string());

        match state
            .responses
            .get(activate_code)
            .copied()
            .unwrap_or(CannedResponse::Status(200))
        {
            CannedResponse::Status(code) => StatusCode::from_u16(code)
                .map_err(|e| HttpServiceError::InvalidRequest(e.to_string())),
            CannedResponse::Unreachable => Err(HttpServiceError::Recoverable(Box::new(
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ))),
            CannedResponse::InvalidRequest => Err(HttpServiceError::InvalidRequest(format!(
                "cannot build request for {}",
                activate_code
            ))),
        }
    }
}
