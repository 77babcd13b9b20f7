//! HTTP client for the BC Transfer Guide.
//!
//! A course-to-course search needs:
//! 1. A nonce scraped from the public search page
//! 2. The transfer guide's internal id for the sending institution
//! 3. The internal id for the subject at that institution
//! 4. One POST per results page

use super::cache::LookupCache;
use super::error::TransferError;
use super::types::{Institution, SearchRequest, SearchResponse, TransferSubject};
use super::{process_agreement, process_agreements, TransferAgreement};
use crate::config::TransferGuideConfig;
use chrono::Datelike;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

const INSTITUTIONS_PATH: &str = "/GetFromInstitutions";
const SUBJECTS_PATH: &str = "/GetSubjects";
const NONCE_KEY: &str = "nonce";

static NONCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"id="c2c-search-filters" nonce="([^"]+)""#).unwrap());

/// Client for fetching transfer agreements.
pub struct TransferGuideClient {
    client: Client,
    config: TransferGuideConfig,
    nonce: LookupCache<String>,
    institutions: LookupCache<Vec<Institution>>,
    subjects: LookupCache<Vec<TransferSubject>>,
}

impl TransferGuideClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: TransferGuideConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransferError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Ok(Self {
            client,
            config,
            nonce: LookupCache::new(ttl),
            institutions: LookupCache::new(ttl),
            subjects: LookupCache::new(ttl),
        })
    }

    /// Scrapes the nonce the search endpoint requires.
    pub async fn fetch_nonce(&self) -> Result<String, TransferError> {
        if let Some(nonce) = self.nonce.get(NONCE_KEY) {
            return Ok(nonce);
        }

        debug!(url = %self.config.search_page_url, "Fetching search nonce");
        let html = self
            .check_status(self.client.get(&self.config.search_page_url).send().await?)?
            .text()
            .await?;

        let nonce = parse_nonce(&html).ok_or(TransferError::NonceNotFound)?;
        self.nonce.insert(NONCE_KEY, nonce.clone());
        Ok(nonce)
    }

    /// Looks up the transfer guide's internal id for an institution code.
    pub async fn institution_id(&self, code: &str) -> Result<i64, TransferError> {
        let institutions = match self.institutions.get(INSTITUTIONS_PATH) {
            Some(cached) => cached,
            None => {
                let url = Url::parse_with_params(
                    &format!("{}{}", self.config.api_base_url, INSTITUTIONS_PATH),
                    &[("countryId", "40"), ("internalOnly", "true")],
                )?;
                let fetched: Vec<Institution> = self.get_json(url.as_str()).await?;
                self.institutions.insert(INSTITUTIONS_PATH, fetched.clone());
                fetched
            }
        };

        institutions
            .iter()
            .find(|inst| inst.code == code)
            .map(|inst| inst.id)
            .ok_or_else(|| TransferError::InstitutionNotFound {
                code: code.to_string(),
            })
    }

    /// Lists the subjects an institution sends courses under.
    pub async fn subjects(&self, institution_id: i64) -> Result<Vec<TransferSubject>, TransferError> {
        let key = institution_id.to_string();
        if let Some(cached) = self.subjects.get(&key) {
            return Ok(cached);
        }

        let url = Url::parse_with_params(
            &format!("{}{}", self.config.api_base_url, SUBJECTS_PATH),
            &[("institutionID", key.as_str()), ("sending", "true")],
        )?;
        let subjects: Vec<TransferSubject> = self.get_json(url.as_str()).await?;
        self.subjects.insert(key, subjects.clone());
        Ok(subjects)
    }

    /// Looks up a subject's internal id at an institution.
    pub async fn subject_id(&self, institution_id: i64, code: &str) -> Result<i64, TransferError> {
        self.subjects(institution_id)
            .await?
            .iter()
            .find(|subj| subj.code == code)
            .map(|subj| subj.id)
            .ok_or_else(|| TransferError::SubjectNotFound {
                code: code.to_string(),
                institution_id,
            })
    }

    /// Fetches every agreement for one sending course.
    pub async fn transfers_for_course(
        &self,
        course_number: &str,
        subject_code: &str,
        institution_code: &str,
    ) -> Result<Vec<TransferAgreement>, TransferError> {
        let institution_id = self.institution_id(institution_code).await?;
        let subject_id = self.subject_id(institution_id, subject_code).await?;

        let request = SearchRequest {
            sender: institution_id,
            institution_code: institution_code.to_string(),
            subject_id,
            subject_code: subject_code.to_string(),
            course_number: Some(course_number.to_string()),
            year: self.search_year(),
            page_number: 1,
            is_public: None,
            is_member: true,
        };

        let mut agreements = Vec::new();
        for page in self.search_all_pages(request).await? {
            let Some(course) = page.courses.first() else {
                continue;
            };
            agreements.extend(process_agreements(
                &course.agreements,
                course_number,
                subject_code,
                institution_code,
            ));
        }

        info!(
            course = %format!("{subject_code} {course_number}"),
            institution = institution_code,
            count = agreements.len(),
            "Fetched course transfer agreements"
        );
        Ok(agreements)
    }

    /// Fetches every agreement for every course an institution sends.
    pub async fn transfers_for_institution(
        &self,
        institution_code: &str,
    ) -> Result<Vec<TransferAgreement>, TransferError> {
        let start = Instant::now();
        let institution_id = self.institution_id(institution_code).await?;
        let subjects = self.subjects(institution_id).await?;
        let year = self.search_year();

        let mut agreements = Vec::new();
        for subject in &subjects {
            let request = SearchRequest {
                sender: institution_id,
                institution_code: institution_code.to_string(),
                subject_id: subject.id,
                subject_code: subject.code.clone(),
                course_number: None,
                year,
                page_number: 1,
                is_public: None,
                is_member: true,
            };

            for page in self.search_all_pages(request).await? {
                for course in &page.courses {
                    for raw in &course.agreements {
                        let Some(course_number) = raw.sending_course_number.as_deref() else {
                            warn!(
                                subject = %subject.code,
                                detail = %raw.detail,
                                "Agreement without sending course number"
                            );
                            continue;
                        };
                        agreements.extend(process_agreement(
                            raw,
                            course_number,
                            &subject.code,
                            institution_code,
                        ));
                    }
                }
            }

            debug!(
                subject = %subject.code,
                total = agreements.len(),
                "Processed subject"
            );
        }

        info!(
            institution = institution_code,
            subjects = subjects.len(),
            count = agreements.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Fetched institution transfer agreements"
        );
        Ok(agreements)
    }

    /// Runs a search and returns every results page in order.
    async fn search_all_pages(
        &self,
        mut request: SearchRequest,
    ) -> Result<Vec<SearchResponse>, TransferError> {
        request.page_number = 1;
        let url = self.search_url().await?;
        let (url, first) = match self.post_search(url.as_str(), &request).await {
            Err(e) if is_stale_nonce(&e) => {
                warn!(error = %e, "Search rejected, refreshing nonce");
                self.nonce.invalidate(NONCE_KEY);
                let url = self.search_url().await?;
                let first = self.post_search(url.as_str(), &request).await?;
                (url, first)
            }
            result => (url, result?),
        };
        let total_pages = first.total_pages;
        let mut pages = vec![first];

        for page_number in 2..=total_pages {
            request.page_number = page_number;
            pages.push(self.post_search(url.as_str(), &request).await?);
        }

        Ok(pages)
    }

    async fn search_url(&self) -> Result<Url, TransferError> {
        let nonce = self.fetch_nonce().await?;
        Ok(Url::parse_with_params(
            &self.config.search_url,
            &[("_wpnonce", nonce)],
        )?)
    }

    async fn post_search(
        &self,
        url: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, TransferError> {
        debug!(
            subject = %request.subject_code,
            page = request.page_number,
            "Searching transfer guide"
        );
        let response = self.client.post(url).json(request).send().await?;
        Ok(self.check_status(response)?.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransferError> {
        let response = self.client.get(url).send().await?;
        Ok(self.check_status(response)?.json().await?)
    }

    fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response, TransferError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(TransferError::UnexpectedStatus {
                url: response.url().to_string(),
                status: response.status().as_u16(),
            })
        }
    }

    fn search_year(&self) -> i32 {
        self.config
            .search_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }
}

/// The search endpoint answers an expired nonce with 401 or 403.
fn is_stale_nonce(error: &TransferError) -> bool {
    matches!(
        error,
        TransferError::UnexpectedStatus {
            status: 401 | 403,
            ..
        }
    )
}

/// Extracts the search nonce from the search page HTML.
fn parse_nonce(html: &str) -> Option<String> {
    NONCE_REGEX
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
