use axum::http::StatusCode;
use axum_derive_error::ErrorResponse;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, ErrorResponse)]
pub enum ApiError {
    #[error("Agent not found.")]
    #[status(StatusCode::NOT_FOUND)]
    AgentNotFound,

    #[error("Chat not found.")]
    #[status(StatusCode::NOT_FOUND)]
    ChatNotFound,

    #[error("Document not found.")]
    #[status(StatusCode::NOT_FOUND)]
    DocumentNotFound,

    #[error("Unauthorized.")]
    #[status(StatusCode::UNAUTHORIZED)]
    AuthenticationRequired,

    #[error("This link has expired.")]
    #[status(StatusCode::UNAUTHORIZED)]
    SignatureExpired,

    #[error("Unauthorized.")]
    #[status(StatusCode::UNAUTHORIZED)]
    InvalidSignature,

    #[error("{0}")]
    #[status(StatusCode::BAD_REQUEST)]
    ClientError(String),

    #[error(transparent)]
    ServerError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::ServerError(err.into())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::ClientError(errors.to_string())
    }
}

impl PartialEq for ApiError {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string() && self.status_code() == other.status_code()
    }
}
