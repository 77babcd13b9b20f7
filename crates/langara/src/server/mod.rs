use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::endpoints::{professors, schedule, scrape, status, transfer};
use crate::types::AppState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Reads from the database only
    let term_router = Router::new()
        .route("/courses", get(schedule::get_courses))
        .route("/sections", get(schedule::get_sections))
        .route(
            "/sections/:crn/meetings",
            get(schedule::get_section_meetings),
        );

    // Hits upstream and replaces stored data
    let scrape_router = Router::new()
        .route("/courses", post(scrape::post_scrape_courses))
        .route("/transfers", post(scrape::post_scrape_default_transfers))
        .route(
            "/transfers/:institution",
            post(scrape::post_scrape_transfers),
        )
        .route("/course_info", post(scrape::post_scrape_course_info))
        .route("/professors", post(professors::post_scrape_professors));

    Router::new()
        .route("/health", get(status::get_health))
        .route("/terms", get(status::get_terms))
        .nest("/terms/:term", term_router)
        .route("/course_info/:code", get(schedule::get_course_info))
        .route("/transfers", get(transfer::get_transfers))
        .route("/transfers/live", get(transfer::get_live_transfers))
        .route("/professors", get(professors::get_professors))
        .nest("/scrape", scrape_router)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_router_builds_with_every_handler() {
        let config = AppConfig {
            database_path: ":memory:".to_string(),
            ..AppConfig::default()
        };
        let state = Arc::new(AppState::new(config).unwrap());
        let _router: Router = create_router(state);
    }
}
