//! Endpoints that scrape upstream sources and refresh stored data.
//!
//! An empty scrape result is never written over stored data.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::{db_error, parse_term, scrape_error_to_response, transfer_error_to_response};
use crate::timetable::Term;
use crate::types::AppState;

fn default_save() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ScrapeTermBody {
    pub year: i32,
    pub semester: u32,
    /// When false the scraped courses are returned instead of stored
    #[serde(default = "default_save")]
    pub save_to_db: bool,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeCourseInfoBody {
    pub year: i32,
    pub semester: u32,
}

/// Validates a body's year/semester the same way a path term is validated.
fn body_term(year: i32, semester: u32) -> Result<Term, Response> {
    parse_term(&Term::new(year, semester).to_string())
}

/// POST /scrape/courses
/// Scrapes a term's timetable and optionally replaces the stored copy
pub async fn post_scrape_courses(
    State(s): State<Arc<AppState>>,
    Json(body): Json<ScrapeTermBody>,
) -> Response {
    let term = match body_term(body.year, body.semester) {
        Ok(term) => term,
        Err(response) => return response,
    };
    info!(term = %term, save_to_db = body.save_to_db, "POST /scrape/courses");

    let start = Instant::now();
    let courses = match s.timetable_client.get_courses(term).await {
        Ok(courses) => courses,
        Err(e) => {
            error!(term = %term, error = %e, "Timetable scrape failed");
            return scrape_error_to_response(e);
        }
    };

    if !body.save_to_db {
        return (StatusCode::OK, Json(courses)).into_response();
    }

    let sections: usize = courses.iter().map(|c| c.sections.len()).sum();
    match s.schedule_db.store_scraped_term(term, &courses) {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "term": term.to_string(),
                "courses": courses.len(),
                "sections": sections,
                "saved": summary.is_some(),
                "summary": summary,
                "duration_ms": start.elapsed().as_millis() as u64,
            })),
        )
            .into_response(),
        Err(e) => db_error("Failed to store scraped courses", e),
    }
}

/// POST /scrape/transfers/:institution
/// Fetches every agreement an institution sends and replaces the stored set
pub async fn post_scrape_transfers(
    Path(institution): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    scrape_transfers(&s, &institution.to_uppercase()).await
}

/// POST /scrape/transfers
/// Same as above for the configured default institution
pub async fn post_scrape_default_transfers(State(s): State<Arc<AppState>>) -> Response {
    let institution = s.config.transfer_guide.default_institution.to_uppercase();
    scrape_transfers(&s, &institution).await
}

async fn scrape_transfers(s: &AppState, institution: &str) -> Response {
    info!(institution = %institution, "POST /scrape/transfers");

    let agreements = match s
        .transfer_client
        .transfers_for_institution(institution)
        .await
    {
        Ok(agreements) => agreements,
        Err(e) => {
            error!(institution = %institution, error = %e, "Transfer scrape failed");
            return transfer_error_to_response(e);
        }
    };

    if agreements.is_empty() {
        warn!(institution = %institution, "Scrape produced no agreements; keeping stored data");
        return (
            StatusCode::OK,
            Json(json!({ "institution": institution, "agreements": 0, "saved": false })),
        )
            .into_response();
    }

    match s.transfer_db.replace_all(&agreements) {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({ "institution": institution, "agreements": count, "saved": true })),
        )
            .into_response(),
        Err(e) => db_error("Failed to store transfer agreements", e),
    }
}

/// POST /scrape/course_info
/// Scrapes descriptions and attributes for every course offered in a term
pub async fn post_scrape_course_info(
    State(s): State<Arc<AppState>>,
    Json(body): Json<ScrapeCourseInfoBody>,
) -> Response {
    let term = match body_term(body.year, body.semester) {
        Ok(term) => term,
        Err(response) => return response,
    };
    info!(term = %term, "POST /scrape/course_info");

    let infos = match s.timetable_client.get_course_info(term).await {
        Ok(infos) => infos,
        Err(e) => {
            error!(term = %term, error = %e, "Course info scrape failed");
            return scrape_error_to_response(e);
        }
    };

    if infos.is_empty() {
        warn!(term = %term, "Scrape produced no course info; keeping stored data");
        return (
            StatusCode::OK,
            Json(json!({ "term": term.to_string(), "courses": 0, "saved": false })),
        )
            .into_response();
    }

    match s.schedule_db.replace_course_info(&infos) {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({ "term": term.to_string(), "courses": count, "saved": true })),
        )
            .into_response(),
        Err(e) => db_error("Failed to store course info", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_body_defaults_to_saving() {
        let body: ScrapeTermBody =
            serde_json::from_str(r#"{ "year": 2025, "semester": 30 }"#).unwrap();
        assert!(body.save_to_db);
        assert_eq!(body_term(body.year, body.semester).ok(), Some(Term::new(2025, 30)));
    }

    #[test]
    fn test_scrape_body_rejects_unknown_semester() {
        let response = body_term(2025, 40).unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
