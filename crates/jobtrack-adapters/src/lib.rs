//! Site resolution, raw-record normalization and the scraper collaborators
//! that feed them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use jobtrack_core::{NormalizeMode, NormalizedJob, RawRecord, RawValue, SourceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info_span, Instrument};

pub const CRATE_NAME: &str = "jobtrack-adapters";

pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;
pub const TRUNCATION_MARKER: &str = "...";

/// Ordered (domain fragment, source) table; the first fragment found in a URL wins.
pub const SITE_TABLE: &[(&str, SourceId)] = &[
    ("linkedin.com", SourceId::Linkedin),
    ("indeed.com", SourceId::Indeed),
    ("glassdoor.com", SourceId::Glassdoor),
    ("ziprecruiter.com", SourceId::ZipRecruiter),
    ("google.com", SourceId::Google),
];

/// Map a job-posting URL to a known source, or `None` when unsupported.
pub fn resolve_site(url: &str) -> Option<SourceId> {
    let lower = url.to_ascii_lowercase();
    SITE_TABLE
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, source)| *source)
}

/// Convert one raw upstream record into the canonical listing.
///
/// `fallback_site` fills `source_site` when the record does not name one;
/// `requested_url` fills `url` in single-listing lookups.
pub fn normalize(
    raw: &RawRecord,
    requested_url: Option<&str>,
    mode: NormalizeMode,
    fallback_site: &str,
) -> NormalizedJob {
    NormalizedJob {
        title: raw.title.as_text().or_else(|| mode.placeholder("Title")),
        company: raw.company.as_text().or_else(|| mode.placeholder("Company")),
        location: raw
            .city
            .as_text()
            .or_else(|| raw.location.as_text())
            .or_else(|| mode.placeholder("Location")),
        salary_range: salary_range(&raw.min_amount, &raw.max_amount, mode),
        compensation_interval: raw.interval.as_text(),
        source_site: raw
            .site
            .as_text()
            .unwrap_or_else(|| fallback_site.to_string()),
        posted_date: raw.date_posted.as_text(),
        description: raw.description.as_text().map(|d| preview_description(&d)),
        url: raw
            .job_url
            .as_text()
            .or_else(|| requested_url.map(ToString::to_string))
            .unwrap_or_default(),
    }
}

/// `"$<min>-<max>"` when both bounds are present and numeric.
pub fn salary_range(min: &RawValue, max: &RawValue, mode: NormalizeMode) -> Option<String> {
    let (min, max) = (min.as_amount()?, max.as_amount()?);
    Some(match mode {
        NormalizeMode::Strict => format!("${min}-{max}"),
        NormalizeMode::Lenient => format!("${}-{}", min.truncated(), max.truncated()),
    })
}

pub fn preview_description(text: &str) -> String {
    match text.char_indices().nth(DESCRIPTION_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Parameters handed to the external scraping engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub sources: Vec<SourceId>,
    pub search_term: Option<String>,
    pub location: Option<String>,
    pub results_wanted: u32,
    pub hours_old: Option<u32>,
    pub direct_urls: Option<Vec<String>>,
    pub fetch_full_description_for: Vec<SourceId>,
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{0}")]
    Upstream(String),
    #[error("scraper request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("scraper returned http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("invalid scraper response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// The black-box scraping engine: returns raw records or fails as a whole.
#[async_trait]
pub trait JobScraper: Send + Sync {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<Vec<RawRecord>, ScrapeError>;
}

/// Serves canned upstream records from `<root>/<source>/sample/records.json`.
#[derive(Debug, Clone)]
pub struct FixtureScraper {
    root: PathBuf,
}

impl FixtureScraper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn records_path(&self, source: SourceId) -> PathBuf {
        self.root
            .join(source.as_str())
            .join("sample")
            .join("records.json")
    }

    async fn load_source(&self, source: SourceId) -> Result<Vec<RawRecord>, ScrapeError> {
        let path = self.records_path(source);
        let exists = fs::try_exists(&path)
            .await
            .with_context(|| format!("checking {}", path.display()))?;
        if !exists {
            return Err(ScrapeError::Upstream(format!(
                "no fixture records for source {source}"
            )));
        }
        load_records_file(&path).await.map_err(ScrapeError::from)
    }
}

pub async fn load_records_file(path: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn record_matches(record: &RawRecord, request: &ScrapeRequest) -> bool {
    if let Some(urls) = &request.direct_urls {
        let job_url = record.job_url.as_text().unwrap_or_default();
        return urls.iter().any(|u| u == &job_url);
    }
    let contains = |value: &RawValue, needle: &str| {
        value
            .as_text()
            .map(|v| v.to_lowercase().contains(needle))
            .unwrap_or(false)
    };
    let term_ok = match request.search_term.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => {
            let needle = term.to_lowercase();
            contains(&record.title, &needle)
                || contains(&record.company, &needle)
                || contains(&record.description, &needle)
        }
        _ => true,
    };
    let location_ok = match request.location.as_deref().map(str::trim) {
        Some(loc) if !loc.is_empty() => {
            let needle = loc.to_lowercase();
            contains(&record.city, &needle) || contains(&record.location, &needle)
        }
        _ => true,
    };
    term_ok && location_ok
}

#[async_trait]
impl JobScraper for FixtureScraper {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<Vec<RawRecord>, ScrapeError> {
        let mut out = Vec::new();
        for source in &request.sources {
            let records = self.load_source(*source).await?;
            out.extend(
                records
                    .into_iter()
                    .filter(|r| record_matches(r, request))
                    .take(request.results_wanted as usize),
            );
        }
        debug!(records = out.len(), "fixture scrape complete");
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct HttpScraperConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl HttpScraperConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(60),
            user_agent: Some("jobtrack/0.1".to_string()),
        }
    }
}

/// Delegates scraping to a sidecar service speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScraper {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScrapeResponse {
    Records(Vec<RawRecord>),
    Wrapped { records: Vec<RawRecord> },
}

/// Accepts either a bare record array or `{"records": [...]}`.
pub fn parse_scrape_response(body: &[u8]) -> Result<Vec<RawRecord>, ScrapeError> {
    Ok(match serde_json::from_slice::<ScrapeResponse>(body)? {
        ScrapeResponse::Records(records) => records,
        ScrapeResponse::Wrapped { records } => records,
    })
}

impl HttpScraper {
    pub fn new(config: HttpScraperConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint,
        })
    }
}

#[async_trait]
impl JobScraper for HttpScraper {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<Vec<RawRecord>, ScrapeError> {
        let span = info_span!("scraper_http", endpoint = %self.endpoint, sources = request.sources.len());
        async {
            let resp = self.client.post(&self.endpoint).json(request).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(ScrapeError::HttpStatus {
                    status: status.as_u16(),
                    url: resp.url().to_string(),
                });
            }
            let body = resp.bytes().await?;
            parse_scrape_response(&body)
        }
        .instrument(span)
        .await
    }
}
