//! Aggregation pipeline: single-listing lookup and multi-source search over
//! the scraper collaborator, with every failure mode folded into a normal
//! response payload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use jobtrack_adapters::{
    normalize, resolve_site, FixtureScraper, HttpScraper, HttpScraperConfig, JobScraper,
    ScrapeRequest,
};
use jobtrack_core::{NormalizeMode, NormalizedJob, SourceId};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

pub const CRATE_NAME: &str = "jobtrack-pipeline";

pub const CONFIG_FILE_NAME: &str = "jobtrack.yaml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub default_sites: Vec<SourceId>,
    pub results_wanted: u32,
    /// Only postings newer than this many hours; `None` disables the filter.
    pub hours_old: Option<u32>,
    /// Source name reported for search results that do not carry one.
    pub fallback_site: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_sites: vec![
                SourceId::Linkedin,
                SourceId::Indeed,
                SourceId::Glassdoor,
                SourceId::ZipRecruiter,
            ],
            results_wanted: 40,
            hours_old: Some(72),
            fallback_site: SourceId::Indeed.as_str().to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineConfigFile {
    default_sites: Option<Vec<SourceId>>,
    results_wanted: Option<u32>,
    #[serde(default, deserialize_with = "explicit_null")]
    hours_old: Option<Option<u32>>,
    fallback_site: Option<String>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PipelineConfig {
    /// Defaults, then `jobtrack.yaml` under `workspace_root` if present, then env.
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let mut config = Self::default();
        let path = workspace_root.join(CONFIG_FILE_NAME);
        if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            config
                .apply_yaml(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_yaml(&mut self, text: &str) -> Result<()> {
        let file: PipelineConfigFile = serde_yaml::from_str(text)?;
        if let Some(sites) = file.default_sites {
            self.default_sites = sites;
        }
        if let Some(results_wanted) = file.results_wanted {
            self.results_wanted = results_wanted;
        }
        if let Some(hours_old) = file.hours_old {
            self.hours_old = hours_old;
        }
        if let Some(fallback_site) = file.fallback_site {
            self.fallback_site = fallback_site;
        }
        Ok(())
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(sites) = lookup("JOBTRACK_DEFAULT_SITES") {
            self.default_sites = sites
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<SourceId>())
                .collect::<Result<Vec<_>, _>>()
                .context("JOBTRACK_DEFAULT_SITES")?;
        }
        if let Some(v) = lookup("JOBTRACK_RESULTS_WANTED") {
            self.results_wanted = v.trim().parse().context("JOBTRACK_RESULTS_WANTED must be a number")?;
        }
        if let Some(v) = lookup("JOBTRACK_HOURS_OLD") {
            let v = v.trim();
            self.hours_old = if v.is_empty() || v.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(v.parse().context("JOBTRACK_HOURS_OLD must be a number or `none`")?)
            };
        }
        if let Some(v) = lookup("JOBTRACK_FALLBACK_SITE") {
            self.fallback_site = v.trim().to_string();
        }
        Ok(())
    }
}

/// Why a lookup or search produced no listings. Never raised to callers;
/// converted into the response payload instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Degradation {
    #[error("Unsupported site")]
    UnsupportedSite,
    #[error("Unsupported site name: {}", .0.join(", "))]
    UnsupportedSources(Vec<String>),
    #[error("No results found")]
    UpstreamEmpty,
    #[error("{0}")]
    UpstreamFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(NormalizedJob),
    Degraded(Degradation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Vec<NormalizedJob>),
    Degraded(Degradation),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseJobRequest {
    pub url: String,
}

/// Bulk search parameters. `None` fields fall back to [`PipelineConfig`];
/// `hours_old: Some(None)` (explicit `null`) disables the age filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchJobsRequest {
    pub search_term: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub results_wanted: Option<u32>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub hours_old: Option<Option<u32>>,
    #[serde(default)]
    pub site_name: Option<Vec<String>>,
}

/// `POST /parse-job` payload: all fields `null` plus `error` when degraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ParseJobResponse {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub compensation: Option<String>,
    pub job_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchJobsResponse {
    pub jobs: Vec<NormalizedJob>,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub const NO_JOBS_MESSAGE: &str = "No jobs found";

impl From<LookupOutcome> for ParseJobResponse {
    fn from(outcome: LookupOutcome) -> Self {
        match outcome {
            LookupOutcome::Found(job) => Self {
                title: job.title,
                company: job.company,
                location: job.location,
                salary: job.salary_range,
                compensation: job.compensation_interval,
                job_url: Some(job.url),
                error: None,
            },
            LookupOutcome::Degraded(reason) => Self {
                error: Some(reason.to_string()),
                ..Self::default()
            },
        }
    }
}

impl From<SearchOutcome> for SearchJobsResponse {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Found(jobs) => Self {
                total: jobs.len(),
                jobs,
                message: None,
                error: None,
            },
            SearchOutcome::Degraded(Degradation::UpstreamEmpty) => Self {
                jobs: Vec::new(),
                total: 0,
                message: Some(NO_JOBS_MESSAGE.to_string()),
                error: None,
            },
            SearchOutcome::Degraded(reason) => Self {
                jobs: Vec::new(),
                total: 0,
                message: None,
                error: Some(reason.to_string()),
            },
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

pub struct JobPipeline {
    scraper: Arc<dyn JobScraper>,
    config: PipelineConfig,
}

impl JobPipeline {
    pub fn new(scraper: Arc<dyn JobScraper>, config: PipelineConfig) -> Self {
        Self { scraper, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// One listing from one board; full descriptions only for LinkedIn.
    pub fn lookup_request(url: &str, source: SourceId) -> ScrapeRequest {
        ScrapeRequest {
            sources: vec![source],
            search_term: None,
            location: None,
            results_wanted: 1,
            hours_old: None,
            direct_urls: Some(vec![url.to_string()]),
            fetch_full_description_for: if source == SourceId::Linkedin {
                vec![SourceId::Linkedin]
            } else {
                Vec::new()
            },
        }
    }

    pub fn search_request(&self, params: &SearchJobsRequest) -> Result<ScrapeRequest, Degradation> {
        let sources = match &params.site_name {
            None => self.config.default_sites.clone(),
            Some(names) => {
                let (known, unknown): (Vec<_>, Vec<_>) = names
                    .iter()
                    .map(|name| name.parse::<SourceId>().map_err(|_| name.clone()))
                    .partition(|r| r.is_ok());
                let unknown = unknown.into_iter().filter_map(|r| r.err()).collect::<Vec<_>>();
                if !unknown.is_empty() {
                    return Err(Degradation::UnsupportedSources(unknown));
                }
                known.into_iter().filter_map(|r| r.ok()).collect()
            }
        };
        let fetch_full_description_for = sources
            .iter()
            .copied()
            .filter(|s| *s == SourceId::Linkedin)
            .collect();
        Ok(ScrapeRequest {
            sources,
            search_term: non_blank(Some(&params.search_term)),
            location: non_blank(params.location.as_deref()),
            results_wanted: params.results_wanted.unwrap_or(self.config.results_wanted),
            hours_old: params.hours_old.unwrap_or(self.config.hours_old),
            direct_urls: None,
            fetch_full_description_for,
        })
    }

    /// Preview a single listing. Missing fields stay `null`.
    pub async fn lookup_by_url(&self, url: &str) -> LookupOutcome {
        self.lookup_inner(url)
            .instrument(info_span!("lookup_by_url", url))
            .await
    }

    async fn lookup_inner(&self, url: &str) -> LookupOutcome {
        let Some(source) = resolve_site(url) else {
            warn!(url, "unsupported job site");
            return LookupOutcome::Degraded(Degradation::UnsupportedSite);
        };

        let request = Self::lookup_request(url, source);
        let records = match self.scraper.scrape(&request).await {
            Ok(records) => records,
            Err(err) => {
                warn!(url, %source, error = %err, "scraper failed for listing lookup");
                return LookupOutcome::Degraded(Degradation::UpstreamFailure(err.to_string()));
            }
        };

        match records.first() {
            Some(raw) => {
                info!(url, %source, "listing resolved");
                LookupOutcome::Found(normalize(raw, Some(url), NormalizeMode::Strict, source.as_str()))
            }
            None => {
                warn!(url, %source, "scraper returned no listing");
                LookupOutcome::Degraded(Degradation::UpstreamEmpty)
            }
        }
    }

    /// Search across boards. Every row gets placeholders for missing fields.
    pub async fn search_jobs(&self, params: &SearchJobsRequest) -> SearchOutcome {
        self.search_inner(params)
            .instrument(info_span!("search_jobs", term = %params.search_term))
            .await
    }

    async fn search_inner(&self, params: &SearchJobsRequest) -> SearchOutcome {
        let request = match self.search_request(params) {
            Ok(request) => request,
            Err(reason) => {
                warn!(reason = %reason, "rejected search sources");
                return SearchOutcome::Degraded(reason);
            }
        };

        let records = match self.scraper.scrape(&request).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "scraper failed for search");
                return SearchOutcome::Degraded(Degradation::UpstreamFailure(err.to_string()));
            }
        };

        if records.is_empty() {
            warn!(sources = request.sources.len(), "search returned no jobs");
            return SearchOutcome::Degraded(Degradation::UpstreamEmpty);
        }

        let jobs = records
            .iter()
            .map(|raw| normalize(raw, None, NormalizeMode::Lenient, &self.config.fallback_site))
            .collect::<Vec<_>>();
        info!(jobs = jobs.len(), sources = request.sources.len(), "search complete");
        SearchOutcome::Found(jobs)
    }

    pub async fn parse_job(&self, request: &ParseJobRequest) -> ParseJobResponse {
        self.lookup_by_url(&request.url).await.into()
    }

    pub async fn search(&self, request: &SearchJobsRequest) -> SearchJobsResponse {
        self.search_jobs(request).await.into()
    }
}

/// `JOBTRACK_SCRAPER_URL` selects the HTTP sidecar; otherwise fixtures under
/// `JOBTRACK_FIXTURES_DIR` (default `<workspace_root>/fixtures`).
pub fn scraper_from_env(workspace_root: &Path) -> Result<Arc<dyn JobScraper>> {
    if let Ok(endpoint) = std::env::var("JOBTRACK_SCRAPER_URL") {
        let mut config = HttpScraperConfig::new(endpoint);
        if let Some(secs) = std::env::var("JOBTRACK_SCRAPER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        info!(endpoint = %config.endpoint, "using http scraper");
        return Ok(Arc::new(HttpScraper::new(config)?));
    }
    let root = std::env::var("JOBTRACK_FIXTURES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| workspace_root.join("fixtures"));
    info!(root = %root.display(), "using fixture scraper");
    Ok(Arc::new(FixtureScraper::new(root)))
}

pub fn pipeline_from_env(workspace_root: &Path) -> Result<JobPipeline> {
    let config = PipelineConfig::load(workspace_root)?;
    let scraper = scraper_from_env(workspace_root)?;
    Ok(JobPipeline::new(scraper, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobtrack_adapters::ScrapeError;
    use jobtrack_core::{RawRecord, RawValue};
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Reply {
        Records(Vec<RawRecord>),
        Fail(String),
    }

    struct StubScraper {
        reply: Reply,
        seen: Mutex<Vec<ScrapeRequest>>,
    }

    impl StubScraper {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ScrapeRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobScraper for StubScraper {
        async fn scrape(&self, request: &ScrapeRequest) -> Result<Vec<RawRecord>, ScrapeError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Reply::Records(records) => Ok(records.clone()),
                Reply::Fail(msg) => Err(ScrapeError::Upstream(msg.clone())),
            }
        }
    }

    fn pipeline(stub: &Arc<StubScraper>) -> JobPipeline {
        JobPipeline::new(stub.clone(), PipelineConfig::default())
    }

    fn sparse_record() -> RawRecord {
        RawRecord {
            title: "Staff Engineer".into(),
            min_amount: RawValue::Float(f64::NAN),
            max_amount: RawValue::Integer(200000),
            ..Default::default()
        }
    }

    fn search_params(term: &str) -> SearchJobsRequest {
        SearchJobsRequest {
            search_term: term.to_string(),
            ..Default::default()
        }
    }

    const LINKEDIN_URL: &str = "https://www.linkedin.com/jobs/view/4012345678";

    #[tokio::test]
    async fn lookup_found_keeps_nulls_and_requested_url() {
        let stub = StubScraper::new(Reply::Records(vec![sparse_record(), RawRecord::default()]));
        let outcome = pipeline(&stub).lookup_by_url(LINKEDIN_URL).await;
        let LookupOutcome::Found(job) = outcome else {
            panic!("expected a listing");
        };
        assert_eq!(job.title.as_deref(), Some("Staff Engineer"));
        assert_eq!(job.company, None);
        assert_eq!(job.location, None);
        assert_eq!(job.salary_range, None);
        assert_eq!(job.source_site, "linkedin");
        assert_eq!(job.url, LINKEDIN_URL);

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].sources, vec![SourceId::Linkedin]);
        assert_eq!(requests[0].results_wanted, 1);
        assert_eq!(requests[0].hours_old, None);
        assert_eq!(requests[0].direct_urls, Some(vec![LINKEDIN_URL.to_string()]));
        assert_eq!(requests[0].fetch_full_description_for, vec![SourceId::Linkedin]);
    }

    #[tokio::test]
    async fn lookup_skips_full_description_outside_linkedin() {
        let stub = StubScraper::new(Reply::Records(vec![sparse_record()]));
        let outcome = pipeline(&stub)
            .lookup_by_url("https://www.indeed.com/viewjob?jk=abc")
            .await;
        let LookupOutcome::Found(job) = outcome else {
            panic!("expected a listing");
        };
        assert_eq!(job.source_site, "indeed");
        assert!(stub.requests()[0].fetch_full_description_for.is_empty());
    }

    #[tokio::test]
    async fn lookup_empty_upstream_degrades() {
        let stub = StubScraper::new(Reply::Records(vec![]));
        let response: ParseJobResponse = pipeline(&stub).lookup_by_url(LINKEDIN_URL).await.into();
        assert_eq!(
            response,
            ParseJobResponse {
                error: Some("No results found".to_string()),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn lookup_upstream_failure_carries_message() {
        let stub = StubScraper::new(Reply::Fail("rate limited by board".into()));
        let response = pipeline(&stub)
            .parse_job(&ParseJobRequest {
                url: LINKEDIN_URL.to_string(),
            })
            .await;
        assert_eq!(response.title, None);
        assert_eq!(response.job_url, None);
        assert_eq!(response.error.as_deref(), Some("rate limited by board"));
    }

    #[tokio::test]
    async fn lookup_unsupported_site_never_calls_scraper() {
        let stub = StubScraper::new(Reply::Records(vec![sparse_record()]));
        let outcome = pipeline(&stub).lookup_by_url("https://example.org/job/1").await;
        assert_eq!(outcome, LookupOutcome::Degraded(Degradation::UnsupportedSite));
        assert!(stub.requests().is_empty());
        let response: ParseJobResponse = outcome.into();
        assert_eq!(response.error.as_deref(), Some("Unsupported site"));
        assert_eq!(response.company, None);
    }

    #[tokio::test]
    async fn search_applies_defaults_and_placeholders() {
        let stub = StubScraper::new(Reply::Records(vec![sparse_record(), RawRecord::default()]));
        let response = pipeline(&stub).search(&search_params("rust")).await;
        assert_eq!(response.total, 2);
        assert_eq!(response.jobs.len(), 2);
        assert_eq!(response.message, None);
        assert_eq!(response.error, None);
        for job in &response.jobs {
            assert!(job.title.is_some() && job.company.is_some() && job.location.is_some());
            assert_eq!(job.source_site, "indeed");
        }
        assert_eq!(response.jobs[0].title.as_deref(), Some("Staff Engineer"));
        assert_eq!(response.jobs[1].title.as_deref(), Some("Unknown Title"));

        let request = &stub.requests()[0];
        assert_eq!(
            request.sources,
            vec![SourceId::Linkedin, SourceId::Indeed, SourceId::Glassdoor, SourceId::ZipRecruiter]
        );
        assert_eq!(request.search_term.as_deref(), Some("rust"));
        assert_eq!(request.location, None);
        assert_eq!(request.results_wanted, 40);
        assert_eq!(request.hours_old, Some(72));
        assert_eq!(request.fetch_full_description_for, vec![SourceId::Linkedin]);
    }

    #[tokio::test]
    async fn search_honours_explicit_parameters() {
        let stub = StubScraper::new(Reply::Records(vec![sparse_record()]));
        let params: SearchJobsRequest = serde_json::from_value(serde_json::json!({
            "search_term": "analyst",
            "location": "Denver",
            "results_wanted": 5,
            "hours_old": null,
            "site_name": ["glassdoor", "zip_recruiter"]
        }))
        .unwrap();
        pipeline(&stub).search(&params).await;
        let request = &stub.requests()[0];
        assert_eq!(request.sources, vec![SourceId::Glassdoor, SourceId::ZipRecruiter]);
        assert_eq!(request.location.as_deref(), Some("Denver"));
        assert_eq!(request.results_wanted, 5);
        assert_eq!(request.hours_old, None);
        assert!(request.fetch_full_description_for.is_empty());
    }

    #[test]
    fn absent_hours_old_differs_from_null() {
        let absent: SearchJobsRequest =
            serde_json::from_value(serde_json::json!({"search_term": "x"})).unwrap();
        assert_eq!(absent.hours_old, None);
        let null: SearchJobsRequest =
            serde_json::from_value(serde_json::json!({"search_term": "x", "hours_old": null})).unwrap();
        assert_eq!(null.hours_old, Some(None));
        let set: SearchJobsRequest =
            serde_json::from_value(serde_json::json!({"search_term": "x", "hours_old": 24})).unwrap();
        assert_eq!(set.hours_old, Some(Some(24)));
    }

    #[tokio::test]
    async fn search_empty_upstream_reports_message() {
        let stub = StubScraper::new(Reply::Records(vec![]));
        let response = pipeline(&stub).search(&search_params("cobol")).await;
        assert_eq!(
            response,
            SearchJobsResponse {
                jobs: vec![],
                total: 0,
                message: Some("No jobs found".to_string()),
                error: None,
            }
        );
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn search_failure_reports_error() {
        let stub = StubScraper::new(Reply::Fail("glassdoor: 403 Forbidden".into()));
        let response = pipeline(&stub).search(&search_params("rust")).await;
        assert!(response.jobs.is_empty());
        assert_eq!(response.total, 0);
        assert_eq!(response.message, None);
        assert_eq!(response.error.as_deref(), Some("glassdoor: 403 Forbidden"));
    }

    #[tokio::test]
    async fn search_rejects_unknown_site_names() {
        let stub = StubScraper::new(Reply::Records(vec![sparse_record()]));
        let params = SearchJobsRequest {
            site_name: Some(vec!["indeed".into(), "monster".into()]),
            ..search_params("rust")
        };
        let response = pipeline(&stub).search(&params).await;
        assert_eq!(response.error.as_deref(), Some("Unsupported site name: monster"));
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn search_output_order_matches_upstream_order() {
        let records = (0..5)
            .map(|i| RawRecord {
                title: format!("Job {i}").into(),
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let stub = StubScraper::new(Reply::Records(records));
        let response = pipeline(&stub).search(&search_params("job")).await;
        let titles = response
            .jobs
            .iter()
            .map(|j| j.title.clone().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Job 0", "Job 1", "Job 2", "Job 3", "Job 4"]);
    }

    #[test]
    fn yaml_and_env_override_defaults() {
        let mut config = PipelineConfig::default();
        config
            .apply_yaml("default_sites: [indeed, google]\nresults_wanted: 10\nhours_old: null\n")
            .unwrap();
        assert_eq!(config.default_sites, vec![SourceId::Indeed, SourceId::Google]);
        assert_eq!(config.results_wanted, 10);
        assert_eq!(config.hours_old, None);
        assert_eq!(config.fallback_site, "indeed");

        let env = HashMap::from([
            ("JOBTRACK_DEFAULT_SITES", "linkedin, zip_recruiter"),
            ("JOBTRACK_HOURS_OLD", "24"),
            ("JOBTRACK_FALLBACK_SITE", "glassdoor"),
        ]);
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.default_sites, vec![SourceId::Linkedin, SourceId::ZipRecruiter]);
        assert_eq!(config.hours_old, Some(24));
        assert_eq!(config.fallback_site, "glassdoor");
        assert_eq!(config.results_wanted, 10);
    }

    #[test]
    fn bad_config_values_are_errors() {
        let mut config = PipelineConfig::default();
        assert!(config.apply_yaml("default_sites: [monster]\n").is_err());
        assert!(config.apply_yaml("unknown_key: 1\n").is_err());
        assert!(config
            .apply_env(|key| (key == "JOBTRACK_RESULTS_WANTED").then(|| "many".to_string()))
            .is_err());
        assert!(config
            .apply_env(|key| (key == "JOBTRACK_HOURS_OLD").then(|| "none".to_string()))
            .is_ok());
        assert_eq!(config.hours_old, None);
    }

    #[test]
    fn load_reads_workspace_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "results_wanted: 7\n").unwrap();
        let config = PipelineConfig::load(dir.path()).unwrap();
        assert_eq!(config.results_wanted, 7);
    }
}
