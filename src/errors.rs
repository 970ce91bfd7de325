// errors.rs
use astra::Response;
use thiserror::Error;

/// Errors originating from the tracker core (lookups, authorization,
/// validation) or from the layers around it (sessions, DB, export).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid Input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Database Error: {0}")]
    DbError(String),
    #[error("Spreadsheet Error: {0}")]
    XlsxError(String),
    #[error("Internal Server Error")]
    InternalError,
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::NotFound(_) => 404,
            ServerError::Forbidden(_) => 403,
            ServerError::InvalidInput(_) => 400,
            ServerError::Conflict(_) => 409,
            ServerError::Unauthorized(_) => 401,
            ServerError::DbError(_) | ServerError::XlsxError(_) | ServerError::InternalError => 500,
        }
    }

    /// Short machine-readable kind used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::NotFound(_) => "not_found",
            ServerError::Forbidden(_) => "forbidden",
            ServerError::InvalidInput(_) => "invalid_input",
            ServerError::Conflict(_) => "conflict",
            ServerError::Unauthorized(_) => "unauthorized",
            ServerError::DbError(_) => "db_error",
            ServerError::XlsxError(_) => "xlsx_error",
            ServerError::InternalError => "internal_error",
        }
    }
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;
