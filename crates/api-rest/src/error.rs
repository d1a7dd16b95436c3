//! Mapping of core and auth failures onto HTTP responses.

use api_shared::auth::AuthError;
use api_shared::dto::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use haccare_core::{CoreError, TextError};

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorRes,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorRes {
                message: message.into(),
                errors: Vec::new(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(_)
            | CoreError::Text(_)
            | CoreError::InvalidTimestamp(_)
            | CoreError::InvalidTimeOfDay(_)
            | CoreError::InvalidTenant(_)
            | CoreError::UnknownLabTest(_) => Self::bad_request(err.to_string()),
            CoreError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            CoreError::AlreadyExists { .. } => Self::new(StatusCode::CONFLICT, err.to_string()),
            CoreError::AdministrationRejected(errors) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: ErrorRes {
                    message: "administration rejected".into(),
                    errors,
                },
            },
            other => {
                tracing::error!("Core error: {:?}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        }
    }
}

impl From<TextError> for ApiError {
    fn from(err: TextError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::unauthorized(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
