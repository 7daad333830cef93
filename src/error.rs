//! Error taxonomy shared by the library and the HTTP edge

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by CRM operations
///
/// Each variant maps onto one HTTP status via [`CrmError::status`]. Server-side
/// failures (500) never leak their detail to the client; see
/// [`CrmError::client_message`].
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("{0}")]
    Validation(String),

    /// Domain precondition not met (e.g. installment not in the expected status)
    #[error("{0}")]
    Conflict(String),

    #[error("Non authentifié")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CrmError>;

impl CrmError {
    pub fn validation(message: impl Into<String>) -> Self {
        CrmError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CrmError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        CrmError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CrmError::Conflict(message.into())
    }

    /// HTTP status code for this error
    pub fn status(&self) -> u16 {
        match self {
            CrmError::Validation(_) | CrmError::Conflict(_) => 400,
            CrmError::Unauthorized => 401,
            CrmError::Forbidden(_) => 403,
            CrmError::NotFound(_) => 404,
            CrmError::Store(_)
            | CrmError::Csv(_)
            | CrmError::Archive(_)
            | CrmError::Io(_)
            | CrmError::Json(_)
            | CrmError::Internal(_) => 500,
        }
    }

    /// Message shown to the caller in the response envelope
    pub fn client_message(&self) -> String {
        if self.status() >= 500 {
            "Erreur interne du serveur".to_string()
        } else {
            self.to_string()
        }
    }
}
