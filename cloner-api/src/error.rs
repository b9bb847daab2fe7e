use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cloner_provisioner::{EditorError, ProvisionError};
use serde_json::json;
use tracing::{error, warn};

use crate::views::{render, IndexTemplate};

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned from JSON and streaming endpoints.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::InvalidIdentifier(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Errors from HTML form endpoints, rendered as the page with an error
/// banner: a fixed prefix followed by the underlying cause.
#[derive(Debug)]
pub struct PageError {
    status: StatusCode,
    message: String,
}

impl PageError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn missing_username() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Username is required")
    }

    pub fn provisioning(err: &ProvisionError) -> Self {
        let (status, prefix) = match err {
            ProvisionError::InvalidIdentifier(_) => {
                return Self::new(StatusCode::BAD_REQUEST, err.to_string());
            }
            ProvisionError::DirectoryCreation { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create workspace")
            }
            ProvisionError::PartialWorkspace { .. } => {
                (StatusCode::CONFLICT, "Failed to clone repository")
            }
            ProvisionError::Clone(_)
            | ProvisionError::Timeout(_)
            | ProvisionError::Cancelled(_)
            | ProvisionError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to clone repository")
            }
        };
        Self::new(status, format!("{}: {}", prefix, err))
    }

    pub fn editor(err: &EditorError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to open editor: {}", err),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ProvisionError> for PageError {
    fn from(err: ProvisionError) -> Self {
        PageError::provisioning(&err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "Request failed");
        } else {
            warn!(status = %self.status, error = %self.message, "Request rejected");
        }

        match render(&IndexTemplate::failure(self.message)) {
            Ok(page) => (self.status, page).into_response(),
            Err(render_err) => render_err.into_response(),
        }
    }
}
