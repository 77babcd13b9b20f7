use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::db_error;
use crate::types::AppState;

/// GET /health
/// Reports stored row counts along with liveness
pub async fn get_health(State(s): State<Arc<AppState>>) -> Response {
    let terms = s.schedule_db.get_terms().map(|terms| terms.len());
    let agreements = s.transfer_db.count();

    match (terms, agreements) {
        (Ok(terms), Ok(agreements)) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "stored_terms": terms,
                "transfer_agreements": agreements,
            })),
        )
            .into_response(),
        (Err(e), _) | (_, Err(e)) => db_error("Database unavailable", e),
    }
}

/// GET /terms
/// Lists every term with stored course data, newest first
pub async fn get_terms(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /terms");

    match s.schedule_db.get_terms() {
        Ok(terms) => {
            let codes: Vec<String> = terms.iter().map(ToString::to_string).collect();
            (StatusCode::OK, Json(codes)).into_response()
        }
        Err(e) => db_error("Failed to fetch terms", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn state() -> Arc<AppState> {
        let config = AppConfig {
            database_path: ":memory:".to_string(),
            ..AppConfig::default()
        };
        Arc::new(AppState::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_empty_store() {
        let response = get_health(State(state())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_terms_on_empty_store() {
        let response = get_terms(State(state())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
