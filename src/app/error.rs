use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Expected failures are surfaced distinctly so the caller can render a
/// precise message; anything unexpected collapses into `Internal` at the
/// operation boundary, with no partial success ever reported.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("user must be logged in")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("malformed cursor")]
    MalformedCursor,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}
