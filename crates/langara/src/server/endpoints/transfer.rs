use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{db_error, transfer_error_to_response};
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct TransferQueryParams {
    pub subject: String,
    pub course_number: String,
    /// Receiving institution code, e.g. `SFU`
    pub institution: Option<String>,
}

/// GET /transfers?subject=CPSC&course_number=1050
/// Returns stored agreements that send the given course
pub async fn get_transfers(
    Query(params): Query<TransferQueryParams>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!(
        subject = %params.subject,
        course_number = %params.course_number,
        institution = ?params.institution,
        "GET /transfers"
    );

    match s.transfer_db.get_transfers_for_course(
        &params.subject.to_uppercase(),
        &params.course_number,
        params.institution.as_deref(),
    ) {
        Ok(agreements) => (StatusCode::OK, Json(agreements)).into_response(),
        Err(e) => db_error("Failed to fetch transfer agreements", e),
    }
}

/// GET /transfers/live?subject=CPSC&course_number=1050
/// Queries the transfer guide directly instead of the stored copy; the
/// institution parameter names the sending institution here
pub async fn get_live_transfers(
    Query(params): Query<TransferQueryParams>,
    State(s): State<Arc<AppState>>,
) -> Response {
    let institution = params
        .institution
        .unwrap_or_else(|| s.config.transfer_guide.default_institution.clone())
        .to_uppercase();
    info!(
        subject = %params.subject,
        course_number = %params.course_number,
        institution = %institution,
        "GET /transfers/live"
    );

    match s
        .transfer_client
        .transfers_for_course(
            &params.course_number,
            &params.subject.to_uppercase(),
            &institution,
        )
        .await
    {
        Ok(agreements) => (StatusCode::OK, Json(agreements)).into_response(),
        Err(e) => transfer_error_to_response(e),
    }
}
