//! Error types for vmt-web

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. duplicate vehicle name
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// vmt-common error, status chosen by variant
    #[error(transparent)]
    Common(#[from] vmt_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Common(err) => match err {
                vmt_common::Error::NotFound(_) => StatusCode::NOT_FOUND,
                vmt_common::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                vmt_common::Error::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::BAD_REQUEST => "BAD_REQUEST",
            StatusCode::CONFLICT => "CONFLICT",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Message shown to users, without the variant prefix
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::Other(err) => err.to_string(),
            ApiError::Common(err) => match err {
                vmt_common::Error::NotFound(msg) => format!("{msg} not found"),
                vmt_common::Error::InvalidInput(msg) | vmt_common::Error::Conflict(msg) => {
                    msg.clone()
                }
                other => other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.user_message(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_errors_map_by_variant() {
        let cases = [
            (vmt_common::Error::not_found("Vehicle 3"), StatusCode::NOT_FOUND),
            (vmt_common::Error::invalid("bad year"), StatusCode::BAD_REQUEST),
            (vmt_common::Error::Conflict("dup".into()), StatusCode::CONFLICT),
            (vmt_common::Error::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn user_message_drops_prefix() {
        let err = ApiError::from(vmt_common::Error::not_found("Vehicle 3"));
        assert_eq!(err.user_message(), "Vehicle 3 not found");
        let err = ApiError::from(vmt_common::Error::invalid("Year must be between 1900 and 2100"));
        assert_eq!(err.user_message(), "Year must be between 1900 and 2100");
    }
}
