//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "HTTP surface for sensor and file resources."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use iotlab_logging::{log_resource_event, EventOutcome, LogContext};
use iotlab_store::{ErrorKind, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ErrorResponse {
    #[schema(example = "Configuration file does not exist")]
    error: String,
}

/// Error rendered as `{"error": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Caller-facing wording per failure class for one resource family.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Messages {
    pub conflict: &'static str,
    pub not_found: &'static str,
    pub missing_body: &'static str,
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub(crate) fn from_store(err: StoreError, messages: &Messages) -> Self {
        let status = status_for(err.kind());
        let message = match &err {
            StoreError::Conflict(_) => messages.conflict.to_owned(),
            StoreError::NotFound(_) => messages.not_found.to_owned(),
            StoreError::MissingBody(_) => messages.missing_body.to_owned(),
            StoreError::InvalidIdentifier { .. } => err.to_string(),
            StoreError::Io(_) | StoreError::Json(_) | StoreError::InvalidText(_) => {
                error!(error = %err, "storage failure while serving request");
                "internal storage error".to_owned()
            }
        };
        Self::new(status, message)
    }
}

/// Emit the lifecycle event for a store operation.
pub(crate) fn record<T>(ctx: &LogContext, event: &str, result: &Result<T, StoreError>) {
    match result {
        Ok(_) => log_resource_event(Some(ctx), event, "completed", EventOutcome::Success),
        Err(err) => {
            let outcome = match err.kind() {
                ErrorKind::Internal => EventOutcome::Fault,
                _ => EventOutcome::Rejected,
            };
            log_resource_event(Some(ctx), event, &err.to_string(), outcome);
        }
    }
}

/// Decode an optional JSON body: empty input and `null` both yield `None`.
pub(crate) fn parse_optional_json<T: DeserializeOwned>(
    body: &Bytes,
) -> Result<Option<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<T>>(body)
        .map_err(|err| ApiError::bad_request(format!("invalid JSON body: {err}")))
}
