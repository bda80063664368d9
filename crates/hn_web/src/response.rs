use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hn_core::Error;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// The envelope every endpoint answers with, on success and on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub status_code: u16,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            status_code: StatusCode::OK.as_u16(),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status_code: StatusCode::CREATED.as_u16(),
            ..Self::ok(message, data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),

    /// The request itself could not be parsed (query string, path).
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) => match e {
                Error::InvalidArgument(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                Error::Forbidden(_) => StatusCode::FORBIDDEN,
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::Conflict(_) => StatusCode::CONFLICT,
                Error::Fetch { .. } | Error::MalformedPage { .. } => StatusCode::BAD_GATEWAY,
                Error::Io(_)
                | Error::Serialization(_)
                | Error::Database(_)
                | Error::External(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, self);
        }
        ApiResponse::<()> {
            success: false,
            message: self.to_string(),
            data: None,
            status_code: status.as_u16(),
        }
        .into_response()
    }
}
