use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanAssignError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Coarse classification callers translate into a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Unhandled,
}

impl PlanAssignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) | Self::Config(_) | Self::Cancelled | Self::Runtime(_) => {
                ErrorKind::Unhandled
            }
        }
    }
}

impl From<diesel::result::Error> for PlanAssignError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub use crate::Result;
