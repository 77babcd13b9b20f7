//! Error types for the Rate My Professors subsystem.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ProfessorError {
    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Server returned a non-success status
    #[error("Unexpected response from {url}: {status}")]
    UnexpectedStatus { url: String, status: u16 },

    /// No school matched the configured name
    #[error("School '{name}' not found")]
    SchoolNotFound { name: String },

    /// The GraphQL endpoint answered with errors and no data
    #[error("GraphQL error: {message}")]
    GraphQl { message: String },

    /// Response body did not have the expected shape
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },
}

impl From<reqwest::Error> for ProfessorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ProfessorError::UnexpectedResponse {
                message: err.to_string(),
            };
        }
        ProfessorError::Network {
            message: err.to_string(),
        }
    }
}
