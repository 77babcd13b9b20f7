use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::db_error;
use crate::professors::{ProfessorError, ProfessorQuery};
use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeProfessorsBody {
    /// When false the fetched professors are only returned
    #[serde(default)]
    pub save_to_db: bool,
}

fn professor_error_to_response(error: ProfessorError) -> Response {
    let (status, message) = match &error {
        ProfessorError::SchoolNotFound { .. } => (StatusCode::NOT_FOUND, "School not found"),
        _ => (StatusCode::BAD_GATEWAY, "Failed to query Rate My Professors"),
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

/// GET /professors?department=math&min_rating=4&sort_by=name&sort_order=asc
/// Returns stored professors matching the filters
pub async fn get_professors(
    Query(query): Query<ProfessorQuery>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!(?query, "GET /professors");

    match s.professor_db.query(&query) {
        Ok(professors) => (
            StatusCode::OK,
            Json(json!({ "count": professors.len(), "professors": professors })),
        )
            .into_response(),
        Err(e) => db_error("Failed to fetch professors", e),
    }
}

/// POST /scrape/professors
/// Fetches every rated teacher at the configured school; an empty body
/// only returns them
pub async fn post_scrape_professors(
    State(s): State<Arc<AppState>>,
    body: Option<Json<ScrapeProfessorsBody>>,
) -> Response {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    info!(save_to_db = body.save_to_db, "POST /scrape/professors");

    let professors = match s.professor_client.get_professors().await {
        Ok(professors) => professors,
        Err(e) => {
            error!(error = %e, "Professor scrape failed");
            return professor_error_to_response(e);
        }
    };

    if !body.save_to_db {
        return (
            StatusCode::OK,
            Json(json!({ "count": professors.len(), "saved": false, "professors": professors })),
        )
            .into_response();
    }

    if professors.is_empty() {
        warn!("Scrape produced no professors; keeping stored data");
        return (
            StatusCode::OK,
            Json(json!({ "count": 0, "saved": false, "professors": professors })),
        )
            .into_response();
    }

    match s.professor_db.replace_all(&professors) {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({ "count": count, "saved": true, "professors": professors })),
        )
            .into_response(),
        Err(e) => db_error("Failed to store professors", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::professors::Professor;

    fn state() -> Arc<AppState> {
        let config = AppConfig {
            database_path: ":memory:".to_string(),
            ..AppConfig::default()
        };
        Arc::new(AppState::new(config).unwrap())
    }

    #[test]
    fn test_scrape_body_defaults_to_not_saving() {
        let body: ScrapeProfessorsBody = serde_json::from_str("{}").unwrap();
        assert!(!body.save_to_db);
    }

    #[test]
    fn test_unknown_school_is_not_found() {
        let response = professor_error_to_response(ProfessorError::SchoolNotFound {
            name: "Nowhere".to_string(),
        });
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = professor_error_to_response(ProfessorError::GraphQl {
            message: "bad query".to_string(),
        });
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_get_professors_reads_stored_rows() {
        let s = state();
        s.professor_db
            .replace_all(&[Professor {
                name: "Ada Lovelace".to_string(),
                department: "Computer Science".to_string(),
                avg_rating: 4.6,
                avg_difficulty: 3.1,
                num_ratings: 42,
                would_take_again_percent: Some(91.5),
            }])
            .unwrap();

        let response = get_professors(Query(ProfessorQuery::default()), State(s)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
