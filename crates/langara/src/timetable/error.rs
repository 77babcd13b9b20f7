//! Error types for the timetable scraping subsystem.

use thiserror::Error;

/// Errors that can occur while fetching timetable pages.
///
/// Parsing itself never fails; these cover the network side and bad input
/// handed to the fetch layer.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Server returned a non-success status
    #[error("Unexpected response from {url}: {status}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The subject list page contained no subjects
    #[error("No subjects listed for term {term}")]
    NoSubjects { term: String },

    /// Term string was not a `YYYYSS` code with a known semester
    #[error("Invalid term: {term}")]
    InvalidTerm { term: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    UrlError { message: String },
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for ScrapeError {
    fn from(err: url::ParseError) -> Self {
        ScrapeError::UrlError {
            message: err.to_string(),
        }
    }
}
