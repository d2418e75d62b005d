//! API error types.
//!
//! Every variant maps to an HTTP status and a `{success:false, message}`
//! JSON body.  The enum implements [`axum::response::IntoResponse`] so
//! handlers can simply return `Err(ApiError::NotFound)`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Errors surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request is malformed or violates upload policy.
    #[error("{0}")]
    Validation(String),

    /// Authentication is required for this operation.
    #[error("Authorization token missing or invalid.")]
    AuthRequired,

    /// The supplied file password does not match.
    #[error("Invalid file password.")]
    InvalidPassword,

    /// The requester is not allowed to access this resource.
    #[error("{0}")]
    Forbidden(String),

    /// The file's download quota has been exhausted.
    #[error("Access limit for this file has been reached.")]
    LimitReached,

    /// No file record with the given id.
    #[error("File not found.")]
    NotFound,

    /// A record exists but the underlying blob is missing.
    #[error("File not found on the server.")]
    NotFoundOnServer,

    /// The file has expired and is no longer served.
    #[error("This file has expired and is no longer available.")]
    Gone,

    /// Catch-all for unexpected storage or database failures.  Full
    /// detail is logged server-side; the client sees a generic message.
    #[error("Something went wrong!")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Return the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthRequired => StatusCode::UNAUTHORIZED,
            ApiError::InvalidPassword => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::LimitReached => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::NotFoundOnServer => StatusCode::NOT_FOUND,
            ApiError::Gone => StatusCode::GONE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref e) = self {
            // The client gets a generic message; the request id ties
            // the log line to a support report.
            let request_id = generate_request_id();
            error!(%request_id, "internal error: {:#}", e);
        }

        let status = self.status_code();
        let body = json!({
            "success": false,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
