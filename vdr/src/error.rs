use thiserror::Error as ThisError;

pub type VdrResult<T> = Result<T, VdrError>;

#[derive(Debug, ThisError)]
pub enum VdrError {
    #[error("Registry object not found: {0}")]
    ObjectNotFound(String),
    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IOError(String),
    #[error("Unknown error: {0}")]
    UnknownError(String),
}
