//! Periodic refresh of the current term's timetable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{error, info};

use crate::timetable::Term;
use crate::types::AppState;

/// Scrapes the term in progress and replaces its stored copy.
///
/// Returns whether anything was stored.
pub async fn refresh_current_term(state: &AppState) -> bool {
    let term = Term::current();
    let start = Instant::now();

    let courses = match state.timetable_client.get_courses(term).await {
        Ok(courses) => courses,
        Err(e) => {
            error!(term = %term, error = %e, "Scheduled timetable scrape failed");
            return false;
        }
    };

    match state.schedule_db.store_scraped_term(term, &courses) {
        Ok(Some(summary)) => {
            info!(
                term = %term,
                courses = summary.inserted_courses,
                sections = summary.inserted_sections,
                duration_ms = start.elapsed().as_millis() as u64,
                "Scheduled timetable refresh complete"
            );
            true
        }
        Ok(None) => false,
        Err(e) => {
            error!(term = %term, error = %e, "Failed to store scheduled scrape");
            false
        }
    }
}

/// Spawns a task that refreshes the current term every `period`, starting one
/// period from now.
pub fn spawn_term_refresh(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "Starting scheduled timetable refresh");

    tokio::spawn(async move {
        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            refresh_current_term(&state).await;
        }
    })
}
