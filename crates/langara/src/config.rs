/// Application configuration loaded from a JSON file
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the API server binds to
    pub address: String,
    pub port: u16,
    /// SQLite database file; `:memory:` for a throwaway database
    pub database_path: String,
    /// Default tracing level (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
    /// Period of the current-term timetable refresh; `null` or 0 disables it
    pub term_refresh_interval_secs: Option<u64>,
    pub timetable: TimetableSourceConfig,
    pub transfer_guide: TransferGuideConfig,
    pub rate_my_professors: RateMyProfConfig,
}

/// Where and how to scrape the registration system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimetableSourceConfig {
    pub base_url: String,
    /// Base of the public per-course pages (`{base}/CPSC-1050`)
    pub course_page_base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Number of course description pages fetched at once
    pub description_concurrency: usize,
}

/// Where and how to query the BC Transfer Guide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferGuideConfig {
    /// Public search page the nonce is scraped from
    pub search_page_url: String,
    /// Base of the institution/subject lookup API
    pub api_base_url: String,
    /// Course-to-course search endpoint
    pub search_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Lifetime of cached nonce and id lookups
    pub cache_ttl_secs: u64,
    /// Agreement year to search; defaults to the current year
    pub search_year: Option<i32>,
    /// Institution refreshed by `POST /scrape/transfers` (no path segment)
    pub default_institution: String,
}

/// Where and how to query Rate My Professors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateMyProfConfig {
    pub graphql_url: String,
    /// `Authorization` header the public GraphQL endpoint expects
    pub authorization: String,
    /// School whose teachers are fetched
    pub school_name: String,
    /// Teachers requested per GraphQL page
    pub page_size: u32,
    pub max_pages: u32,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
            database_path: "langara.db".to_string(),
            log_level: "info".to_string(),
            term_refresh_interval_secs: Some(60 * 60),
            timetable: TimetableSourceConfig::default(),
            transfer_guide: TransferGuideConfig::default(),
            rate_my_professors: RateMyProfConfig::default(),
        }
    }
}

impl Default for TimetableSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://swing.langara.bc.ca/prod".to_string(),
            course_page_base_url: "https://langara.ca/programs-courses".to_string(),
            user_agent: USER_AGENT.to_string(),
            request_timeout_secs: 120,
            description_concurrency: 4,
        }
    }
}

impl Default for TransferGuideConfig {
    fn default() -> Self {
        Self {
            search_page_url: "https://www.bctransferguide.ca/transfer-options/search-courses/"
                .to_string(),
            api_base_url: "https://ws.bctransferguide.ca/api/custom/ui/v1.7/agreementws"
                .to_string(),
            search_url:
                "https://www.bctransferguide.ca/wp-json/bctg-search/course-to-course/search-from"
                    .to_string(),
            user_agent: USER_AGENT.to_string(),
            request_timeout_secs: 60,
            cache_ttl_secs: 30 * 60,
            search_year: None,
            default_institution: "LANG".to_string(),
        }
    }
}

impl Default for RateMyProfConfig {
    fn default() -> Self {
        Self {
            graphql_url: "https://www.ratemyprofessors.com/graphql".to_string(),
            authorization: "Basic dGVzdDp0ZXN0".to_string(),
            school_name: "Langara College".to_string(),
            page_size: 1000,
            max_pages: 50,
            user_agent: USER_AGENT.to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a JSON file.
    ///
    /// Fields missing from the file take their default values.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON config file
    ///
    /// # Returns
    /// * `Ok(AppConfig)` - Loaded configuration
    /// * `Err` - If the file can't be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Loads configuration from `path` if it exists, otherwise uses defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::load_from_file(path)
        } else {
            info!(
                "No configuration at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Refresh period, if the scheduled refresh is enabled
    pub fn term_refresh_interval(&self) -> Option<Duration> {
        self.term_refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// `address:port` for binding the server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
