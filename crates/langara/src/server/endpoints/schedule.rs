use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::{db_error, parse_term};
use crate::db::DbMeeting;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct CourseQueryParams {
    /// Only courses in this subject, e.g. `CPSC`
    pub subject: Option<String>,
}

fn meeting_json(m: DbMeeting) -> serde_json::Value {
    json!({
        "type": m.section_type,
        "days": m.days,
        "time": m.time,
        "room": m.room,
        "instructor": m.instructor,
    })
}

/// GET /terms/:term/courses
/// Returns the stored course tree for a term
pub async fn get_courses(
    Path(term): Path<String>,
    Query(params): Query<CourseQueryParams>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /terms/{}/courses", term);
    let term = match parse_term(&term) {
        Ok(term) => term,
        Err(response) => return response,
    };

    match s.schedule_db.term_has_data(term) {
        Ok(true) => {}
        Ok(false) => {
            return ApiErrorType::from((
                StatusCode::NOT_FOUND,
                "Term not found",
                Some(format!("No stored data for term {term}")),
            ))
            .into_response()
        }
        Err(e) => return db_error("Failed to fetch courses", e),
    }

    let subject = params.subject.map(|s| s.to_uppercase());
    match s.schedule_db.get_courses_for_term(term, subject.as_deref()) {
        Ok(courses) => (StatusCode::OK, Json(courses)).into_response(),
        Err(e) => db_error("Failed to fetch courses", e),
    }
}

/// GET /terms/:term/sections
/// Returns every section with its meetings for a term
pub async fn get_sections(
    Path(term): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /terms/{}/sections", term);
    let term = match parse_term(&term) {
        Ok(term) => term,
        Err(response) => return response,
    };

    match s.schedule_db.get_all_sections_for_term(term) {
        Ok(data) => {
            let response: Vec<_> = data
                .into_iter()
                .map(|(section, meetings)| {
                    json!({
                        "crn": section.crn,
                        "course_code": format!("{} {}", section.subject, section.course),
                        "section": section.section,
                        "title": section.title,
                        "seats_available": section.seats_available,
                        "waitlist": section.waitlist,
                        "notes": section.notes,
                        "meetings": meetings.into_iter().map(meeting_json).collect::<Vec<_>>(),
                    })
                })
                .collect();

            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => db_error("Failed to fetch sections", e),
    }
}

/// GET /terms/:term/sections/:crn/meetings
/// Returns meetings for a specific section
pub async fn get_section_meetings(
    Path((term, crn)): Path<(String, String)>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /terms/{}/sections/{}/meetings", term, crn);
    let term = match parse_term(&term) {
        Ok(term) => term,
        Err(response) => return response,
    };

    match s.schedule_db.get_meetings_for_crn(term, &crn) {
        Ok(meetings) if meetings.is_empty() => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "Section not found",
            Some(format!("No section {crn} in term {term}")),
        ))
        .into_response(),
        Ok(meetings) => {
            let response: Vec<_> = meetings.into_iter().map(meeting_json).collect();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => db_error("Failed to fetch meetings", e),
    }
}

/// GET /course_info/:code
/// Returns the title, description and attributes of a course, e.g. `CPSC 1050`
/// or `CPSC-1050`
pub async fn get_course_info(
    Path(code): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /course_info/{}", code);
    let code = code.replace('-', " ").to_uppercase();

    match s.schedule_db.get_course_info(&code) {
        Ok(Some(info)) => (StatusCode::OK, Json(info)).into_response(),
        Ok(None) => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "Course not found",
            Some(code),
        ))
        .into_response(),
        Err(e) => db_error("Failed to fetch course info", e),
    }
}
