use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::error::CmsError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Post not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    #[error("Content source error: {0}")]
    Cms(#[from] CmsError),

    #[error("Internal Server Error")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Cms(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            AppError::Cms(_) | AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Translation key of the message shown to the reader
    pub fn message_key(&self) -> &'static str {
        match self.status() {
            StatusCode::NOT_FOUND => "error.not_found",
            StatusCode::BAD_GATEWAY => "error.upstream",
            _ => "error.internal",
        }
    }

    pub(super) fn log(&self) {
        match self {
            AppError::NotFound | AppError::BadRequest(_) => tracing::debug!("{}", self),
            AppError::Cms(e) => tracing::error!("Content source error: {}", e),
            AppError::Anyhow(e) => tracing::error!("System error: {:#}", e),
        }
    }
}

/// Plain-text rendition, used when the error page itself cannot be rendered
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let message = match status {
            StatusCode::NOT_FOUND => "Post not found",
            StatusCode::BAD_REQUEST => "Bad request",
            StatusCode::BAD_GATEWAY => "Could not reach the content source",
            _ => "Something went wrong",
        };
        (status, message).into_response()
    }
}
