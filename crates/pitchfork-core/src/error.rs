use thiserror::Error;

/// Application-wide error types for pitchfork.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (bad status, unreadable body, invalid URL).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// A fetched document did not yield a complete record.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// The index page could not be fetched or parsed. Fatal: nothing is dispatched.
    #[error("Failed to enumerate locations: {0}")]
    Enumeration(#[source] Box<AppError>),

    /// Request parameters are out of range.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Environment or CLI configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Tasks ended without reporting a result.
    #[error("{0} task(s) ended without reporting a result")]
    TaskLost(usize),
}

impl AppError {
    /// Returns true if this error came from retrieving a single document.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }

    /// Returns true if a document was retrieved but its fields did not parse.
    pub fn is_extraction_error(&self) -> bool {
        matches!(self, AppError::ExtractionError(_))
    }

    /// Returns true if this error aborts a whole aggregation rather than one task.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Enumeration(_) | AppError::InvalidRequest(_) | AppError::ConfigError(_)
        )
    }
}
