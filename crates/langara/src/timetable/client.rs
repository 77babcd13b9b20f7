//! HTTP client for the registration system's public timetable pages.
//!
//! Fetching a term's listing takes two requests:
//! 1. GET the course search form to learn which subjects the term offers
//! 2. POST the search form with every subject selected to get the full table
//!
//! Course descriptions live on the college website, one page per course.

use super::attributes::parse_attributes;
use super::error::ScrapeError;
use super::info::{merge_course_info, parse_course_codes, parse_course_description};
use super::subjects::parse_subjects;
use super::{parse_course_data_with_stats, Course, CourseAttribute, CourseDescription, CourseInfo, Term};
use crate::config::TimetableSourceConfig;
use futures::{stream, StreamExt};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Paths on the registration server.
const SUBJECT_SEARCH_PATH: &str = "/hzgkfcls.P_Sel_Crse_Search";
const COURSE_SEARCH_PATH: &str = "/hzgkfcls.P_GetCrse";
const ATTRIBUTES_PATH: &str = "/hzgkcald.P_DispCrseAttr";

/// Client for scraping timetable data.
pub struct TimetableClient {
    client: Client,
    config: TimetableSourceConfig,
}

impl TimetableClient {
    /// Creates a new client with the given source configuration.
    pub fn new(config: TimetableSourceConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ScrapeError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Fetches the subject codes offered in a term.
    pub async fn get_subjects(&self, term: Term) -> Result<Vec<String>, ScrapeError> {
        let url = Url::parse_with_params(
            &format!("{}{}", self.config.base_url, SUBJECT_SEARCH_PATH),
            &[("term", term.to_string())],
        )?;

        info!(term = %term, url = %url, "Fetching subject list");
        let html = self.get_text(url.as_str()).await?;
        let subjects = parse_subjects(&html);

        if subjects.is_empty() {
            return Err(ScrapeError::NoSubjects {
                term: term.to_string(),
            });
        }

        debug!(term = %term, count = subjects.len(), "Fetched subjects");
        Ok(subjects)
    }

    /// Fetches the raw timetable HTML for the given subjects.
    pub async fn get_courses_html(
        &self,
        term: Term,
        subjects: &[String],
    ) -> Result<String, ScrapeError> {
        let url = format!("{}{}", self.config.base_url, COURSE_SEARCH_PATH);
        info!(
            term = %term,
            subjects = subjects.len(),
            "Fetching course listing"
        );

        let response = self
            .client
            .post(&url)
            .form(&course_search_form(term, subjects))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScrapeError::UnexpectedStatus {
                url,
                status: response.status().as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    /// Fetches and parses a term's full course listing.
    pub async fn get_courses(&self, term: Term) -> Result<Vec<Course>, ScrapeError> {
        let start = Instant::now();
        let subjects = self.get_subjects(term).await?;
        let html = self.get_courses_html(term, &subjects).await?;
        let (courses, stats) = parse_course_data_with_stats(&html);

        if courses.is_empty() {
            warn!(
                term = %term,
                rows_seen = stats.rows_seen,
                "Timetable produced no courses"
            );
        } else {
            info!(
                term = %term,
                courses = courses.len(),
                skipped_rows = stats.skipped_rows,
                duration_ms = start.elapsed().as_millis() as u64,
                "Scraped course listing"
            );
        }

        Ok(courses)
    }

    /// Fetches the course attribute table.
    pub async fn get_attributes(&self) -> Result<Vec<CourseAttribute>, ScrapeError> {
        let url = format!("{}{}", self.config.base_url, ATTRIBUTES_PATH);
        info!(url = %url, "Fetching course attributes");

        let html = self.get_text(&url).await?;
        Ok(parse_attributes(&html))
    }

    /// Fetches the description page of a single course.
    pub async fn get_course_description(
        &self,
        course_code: &str,
    ) -> Result<CourseDescription, ScrapeError> {
        let url = course_page_url(&self.config.course_page_base_url, course_code);
        debug!(course_code, url = %url, "Fetching course description");

        let html = self.get_text(&url).await?;
        Ok(parse_course_description(course_code, &html))
    }

    /// Fetches descriptions for every course listed in a term and merges them
    /// with the attribute table.
    pub async fn get_course_info(&self, term: Term) -> Result<Vec<CourseInfo>, ScrapeError> {
        let subjects = self.get_subjects(term).await?;
        let html = self.get_courses_html(term, &subjects).await?;
        let course_codes = parse_course_codes(&html);
        info!(term = %term, count = course_codes.len(), "Fetching course descriptions");

        // A missing page costs that course its description, not the whole run
        let descriptions = stream::iter(course_codes)
            .map(|code| async move {
                match self.get_course_description(&code).await {
                    Ok(description) => description,
                    Err(e) => {
                        warn!(course_code = %code, error = %e, "Failed to fetch course description");
                        CourseDescription {
                            course_code: code,
                            title: None,
                            description: None,
                        }
                    }
                }
            })
            .buffered(self.config.description_concurrency.max(1))
            .collect::<Vec<_>>();

        let (descriptions, attributes) = futures::join!(descriptions, self.get_attributes());
        let attributes = attributes?;

        let merged = merge_course_info(descriptions, attributes);
        info!(term = %term, count = merged.len(), "Built course info");
        Ok(merged)
    }

    async fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ScrapeError::UnexpectedStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Builds the course search form.
///
/// The upstream handler expects every filter field, each first sent with a
/// `dummy` value, followed by one `sel_subj` per selected subject.
fn course_search_form(term: Term, subjects: &[String]) -> Vec<(&'static str, String)> {
    let mut form: Vec<(&'static str, String)> = vec![("term_in", term.to_string())];

    for field in [
        "sel_subj", "sel_day", "sel_schd", "sel_insm", "sel_camp", "sel_levl", "sel_sess",
        "sel_instr", "sel_ptrm", "sel_attr", "sel_dept",
    ] {
        form.push((field, "dummy".to_string()));
    }

    form.extend(
        [
            ("sel_crse", ""),
            ("sel_title", "%"),
            ("sel_dept", "%"),
            ("begin_hh", "0"),
            ("begin_mi", "0"),
            ("begin_ap", "a"),
            ("end_hh", "0"),
            ("end_mi", "0"),
            ("end_ap", "a"),
            ("sel_incl_restr", "Y"),
            ("sel_incl_preq", "Y"),
            ("SUB_BTN", "Get Courses"),
        ]
        .map(|(k, v)| (k, v.to_string())),
    );

    form.extend(subjects.iter().map(|s| ("sel_subj", s.clone())));
    form
}

/// `CPSC 1050` -> `{base}/CPSC-1050`
fn course_page_url(base: &str, course_code: &str) -> String {
    let slug = course_code.split_whitespace().collect::<Vec<_>>().join("-");
    format!("{}/{}", base.trim_end_matches('/'), slug)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::timetable::tests::{document, header_row, section_row};
    use axum::response::Html;
    use axum::routing::{get, post};
    use axum::Router;

    fn attribute_row(code: &str, flags: [&str; 7]) -> String {
        let cells: String = flags.iter().map(|f| format!("<td>{f}</td>")).collect();
        format!("<tr><td>{code}</td>{cells}</tr>")
    }

    /// Serves a two-course term on a local port and returns a source config
    /// pointing at it. Only `CPSC 1050` has a course page.
    pub(crate) async fn serve_fixture() -> TimetableSourceConfig {
        let subjects = r#"<select name="sel_subj" multiple><option value="CPSC">Computing</option></select>"#;
        let listing = document(&[
            header_row("CPSC 1050"),
            section_row("30001", "1050", "001", "Lecture"),
            header_row("CPSC 1150"),
            section_row("30002", "1150", "001", "Lecture"),
        ]);
        let attributes = format!(
            "<table>{}{}</table>",
            attribute_row("CPSC 1050", ["Y", "", "", "", "Y", "", "Y"]),
            attribute_row("CPSC 1150", ["", "", "", "", "Y", "", ""]),
        );
        let course_page = r#"<h1>Introduction to Computer Science</h1>
            <div class="field--name-field-description"><div class="field__item">Fundamentals.</div></div>"#;

        let router = Router::new()
            .route(SUBJECT_SEARCH_PATH, get(move || async move { Html(subjects) }))
            .route(COURSE_SEARCH_PATH, post(move || async move { Html(listing) }))
            .route(ATTRIBUTES_PATH, get(move || async move { Html(attributes) }))
            .route("/courses/CPSC-1050", get(move || async move { Html(course_page) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TimetableSourceConfig {
            base_url: format!("http://{addr}"),
            course_page_base_url: format!("http://{addr}/courses"),
            request_timeout_secs: 5,
            ..TimetableSourceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_course_page_keeps_attributes() {
        let client = TimetableClient::new(serve_fixture().await).unwrap();
        let info = client.get_course_info(Term::new(2025, 30)).await.unwrap();

        assert_eq!(
            info,
            vec![
                CourseInfo {
                    course_code: "CPSC 1050".to_string(),
                    title: Some("Introduction to Computer Science".to_string()),
                    description: Some("Fundamentals.".to_string()),
                    attributes: vec!["2AR".to_string(), "SCI".to_string(), "UT".to_string()],
                },
                CourseInfo {
                    course_code: "CPSC 1150".to_string(),
                    title: None,
                    description: None,
                    attributes: vec!["SCI".to_string()],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_get_courses_from_fixture() {
        let client = TimetableClient::new(serve_fixture().await).unwrap();
        let courses = client.get_courses(Term::new(2025, 30)).await.unwrap();

        let codes: Vec<_> = courses.iter().map(|c| c.course_code.as_str()).collect();
        assert_eq!(codes, ["CPSC 1050", "CPSC 1150"]);
        assert_eq!(courses[1].sections[0].crn, "30002");
    }

    #[test]
    fn test_course_search_form() {
        let subjects = vec!["ABST".to_string(), "CPSC".to_string()];
        let form = course_search_form(Term::new(2025, 30), &subjects);

        assert_eq!(form[0], ("term_in", "202530".to_string()));
        assert_eq!(form[1], ("sel_subj", "dummy".to_string()));

        let selected: Vec<_> = form
            .iter()
            .filter(|(k, v)| *k == "sel_subj" && v != "dummy")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(selected, vec!["ABST", "CPSC"]);
        assert!(form.contains(&("SUB_BTN", "Get Courses".to_string())));
    }

    #[test]
    fn test_course_page_url() {
        assert_eq!(
            course_page_url("https://langara.ca/programs-courses/", "CPSC 1050"),
            "https://langara.ca/programs-courses/CPSC-1050"
        );
    }
}
