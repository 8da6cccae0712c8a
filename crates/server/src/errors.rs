//! HTTP error mapping.
//!
//! Every handler failure becomes an [`ApiError`]; its [`IntoResponse`] impl is
//! the one place that decides status codes and bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::files::FileError;
use crate::tool::ToolError;

/// JSON error body: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body did not match the expected JSON shape
    #[error("{0}")]
    BadRequest(#[from] serde_json::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("failed to build response: {0}")]
    Http(#[from] http::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Tool(ToolError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Tool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::File(FileError::NotFound(_) | FileError::InvalidPath(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::File(_) | ApiError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            ApiError::Unauthorized => (status, "Unauthorized").into_response(),
            ApiError::File(ref e) if status == StatusCode::NOT_FOUND => {
                warn!(error = %e, "File not served");
                (status, "404 page not found").into_response()
            }
            ApiError::File(e) => {
                error!(error = %e, "Failed to serve file");
                (status, "500 Internal Server Error").into_response()
            }
            ApiError::Http(e) => {
                error!(error = %e, "Failed to build response");
                (status, "500 Internal Server Error").into_response()
            }
            other => {
                if status.is_server_error() {
                    error!(status = status.as_u16(), error = %other, "Request failed");
                }
                let body = ErrorBody {
                    error: other.to_string(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let parse_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        assert_eq!(ApiError::from(parse_err).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(ToolError::TimedOut(Duration::from_secs(1))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(ToolError::ReadOutput {
                path: PathBuf::from("/certs/x.pem"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(FileError::NotFound(PathBuf::from("/ca/rootCA.pem"))).status(),
            StatusCode::NOT_FOUND
        );
    }
}
