use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::server::types::ApiErrorType;
use crate::timetable::{ScrapeError, Term};
use crate::transfer::TransferError;

pub mod professors;
pub mod schedule;
pub mod scrape;
pub mod status;
pub mod transfer;

/// Parses a `YYYYSS` term code, or builds a 400 response.
pub(crate) fn parse_term(raw: &str) -> Result<Term, Response> {
    raw.parse::<Term>().map_err(|e| {
        ApiErrorType::from((StatusCode::BAD_REQUEST, "Invalid term", Some(e.to_string())))
            .into_response()
    })
}

/// Builds a 500 response for a failed database call.
pub(crate) fn db_error(message: &str, error: rusqlite::Error) -> Response {
    ApiErrorType::from((
        StatusCode::INTERNAL_SERVER_ERROR,
        message,
        Some(error.to_string()),
    ))
    .into_response()
}

pub(crate) fn scrape_error_to_response(error: ScrapeError) -> Response {
    let (status, message) = match &error {
        ScrapeError::InvalidTerm { .. } => (StatusCode::BAD_REQUEST, "Invalid term"),
        ScrapeError::NoSubjects { .. } => (StatusCode::NOT_FOUND, "No subjects for term"),
        _ => (StatusCode::BAD_GATEWAY, "Failed to scrape timetable"),
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

pub(crate) fn transfer_error_to_response(error: TransferError) -> Response {
    let (status, message) = if error.is_not_found() {
        (StatusCode::NOT_FOUND, "Unknown institution or subject")
    } else {
        (StatusCode::BAD_GATEWAY, "Failed to query the transfer guide")
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_term_rejects_bad_codes() {
        assert_eq!(parse_term("202530").ok(), Some(Term::new(2025, 30)));

        let response = parse_term("2025").unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transfer_error_status() {
        let response = transfer_error_to_response(TransferError::InstitutionNotFound {
            code: "NOPE".to_string(),
        });
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = transfer_error_to_response(TransferError::NonceNotFound);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
