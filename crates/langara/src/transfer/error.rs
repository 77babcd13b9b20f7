//! Error types for the transfer guide subsystem.

use thiserror::Error;

/// Errors that can occur while fetching transfer agreements.
///
/// Unrecognized agreement text is not an error; those agreements are simply
/// dropped. These cover failures that leave no correct record to build.
#[derive(Debug, Error, Clone)]
pub enum TransferError {
    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Server returned a non-success status
    #[error("Unexpected response from {url}: {status}")]
    UnexpectedStatus { url: String, status: u16 },

    /// Could not find the search nonce on the search page
    #[error("Search nonce not found")]
    NonceNotFound,

    /// The sending institution code is unknown to the transfer guide
    #[error("Institution '{code}' not found")]
    InstitutionNotFound { code: String },

    /// The subject code is unknown for the sending institution
    #[error("Subject '{code}' not found for institution {institution_id}")]
    SubjectNotFound { code: String, institution_id: i64 },

    /// Response body did not have the expected shape
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    UrlError { message: String },
}

impl TransferError {
    /// Returns true if the error means the request itself named something
    /// the transfer guide does not know.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TransferError::InstitutionNotFound { .. } | TransferError::SubjectNotFound { .. }
        )
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return TransferError::UnexpectedResponse {
                message: err.to_string(),
            };
        }
        TransferError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for TransferError {
    fn from(err: url::ParseError) -> Self {
        TransferError::UrlError {
            message: err.to_string(),
        }
    }
}
