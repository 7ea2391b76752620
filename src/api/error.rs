//! HTTP-facing errors
//!
//! Every failure leaves the API as `{"error": "<message>"}`. Internal
//! failures are logged and answered with a generic message.

use crate::error::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Optional collaborator not configured or not answering
    #[error("{0} service unavailable")]
    Unavailable(&'static str),
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorDto { error: message.into() })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Pipeline(PipelineError::UpstreamRateLimited) => error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "OpenSky rate limit reached, try again later",
            ),
            Self::Pipeline(err @ PipelineError::RouteNotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, err.to_string())
            }
            Self::Pipeline(err @ (PipelineError::Auth(_) | PipelineError::Upstream(_))) => {
                log::error!("❌ Upstream failure: {}", err);
                error_response(StatusCode::BAD_GATEWAY, "Failed to query OpenSky")
            }
            Self::Pipeline(err) => InternalServerError(err).into_response(),
            Self::BadRequest(message) => error_response(StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
            err @ Self::Unavailable(_) => {
                error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
        }
    }
}

/// Logs the wrapped error and answers 500 with a generic message
pub struct InternalServerError<E>(pub E);

impl<E: std::fmt::Display> IntoResponse for InternalServerError<E> {
    fn into_response(self) -> Response {
        log::error!("❌ {}", self.0);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}
