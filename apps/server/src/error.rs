use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use smartdecision_ai::AiError;
use smartdecision_core::{Error as CoreError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    Ai(#[from] AiError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::CannotDeleteDefault => StatusCode::CONFLICT,
        ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Core(e) => (status_for(e.kind()), e.kind().as_str()),
            ApiError::Ai(AiError::Timeout(_)) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            ApiError::Ai(e) => (status_for(e.kind()), e.code()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Anyhow(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("Request failed with {}: {}", status, self);
        } else {
            tracing::debug!("Request rejected with {}: {}", status, self);
        }
        let body = Json(ErrorBody {
            code,
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
