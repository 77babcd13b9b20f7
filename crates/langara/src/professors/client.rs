//! HTTP client for the Rate My Professors GraphQL endpoint.

use super::error::ProfessorError;
use super::types::{
    decode, GraphQlRequest, SchoolResults, SchoolSearchText, SchoolSearchVariables, SearchData,
    TeacherResults, TeacherSearchText, TeacherSearchVariables, SCHOOL_SEARCH_QUERY,
    TEACHER_SEARCH_QUERY,
};
use super::{pick_school, Professor};
use crate::config::RateMyProfConfig;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct RateMyProfClient {
    client: Client,
    config: RateMyProfConfig,
}

impl RateMyProfClient {
    pub fn new(config: RateMyProfConfig) -> Result<Self, ProfessorError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProfessorError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Resolves the configured school name to its GraphQL id.
    pub async fn school_id(&self) -> Result<String, ProfessorError> {
        let request = GraphQlRequest {
            query: SCHOOL_SEARCH_QUERY,
            variables: SchoolSearchVariables {
                query: SchoolSearchText {
                    text: self.config.school_name.clone(),
                },
            },
        };

        let data: SearchData<SchoolResults> = self.post(&request).await?;
        let schools = data.new_search.schools.edges.into_iter().map(|e| e.node).collect();
        let school = pick_school(schools, &self.config.school_name).ok_or_else(|| {
            ProfessorError::SchoolNotFound {
                name: self.config.school_name.clone(),
            }
        })?;

        debug!(school = %school.name, id = %school.id, "Resolved school");
        Ok(school.id)
    }

    /// Fetches every rated teacher at the configured school.
    pub async fn get_professors(&self) -> Result<Vec<Professor>, ProfessorError> {
        let start = Instant::now();
        let school_id = self.school_id().await?;

        let mut professors = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 1..=self.config.max_pages {
            let request = GraphQlRequest {
                query: TEACHER_SEARCH_QUERY,
                variables: TeacherSearchVariables {
                    count: self.config.page_size,
                    cursor: cursor.clone(),
                    query: TeacherSearchText {
                        text: String::new(),
                        school_id: school_id.clone(),
                        fallback: true,
                    },
                },
            };

            let data: SearchData<TeacherResults> = self.post(&request).await?;
            let teachers = data.new_search.teachers;
            debug!(page, teachers = teachers.edges.len(), "Fetched teacher page");
            professors.extend(teachers.edges.into_iter().map(|e| Professor::from(e.node)));

            let next = teachers.page_info.end_cursor.filter(|_| teachers.page_info.has_next_page);
            if next.is_none() || next == cursor {
                info!(
                    professors = professors.len(),
                    pages = page,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Fetched professors"
                );
                return Ok(professors);
            }
            cursor = next;
        }

        warn!(
            max_pages = self.config.max_pages,
            professors = professors.len(),
            "Stopped paging teachers at the page limit"
        );
        Ok(professors)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, body: &B) -> Result<T, ProfessorError> {
        let response = self
            .client
            .post(&self.config.graphql_url)
            .header(AUTHORIZATION, &self.config.authorization)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProfessorError::UnexpectedStatus {
                url: response.url().to_string(),
                status: response.status().as_u16(),
            });
        }

        decode(&response.text().await?)
    }
}
