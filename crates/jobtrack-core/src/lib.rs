//! Core domain model for the job tracker: upstream raw records, the
//! canonical normalized job listing and user-managed application records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobtrack-core";

/// Token the upstream scraping library emits when it stringifies a missing
/// numeric cell.
pub const MISSING_NUMERIC_MARKER: &str = "nan";

/// Known upstream job boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Linkedin,
    Indeed,
    Glassdoor,
    ZipRecruiter,
    Google,
}

impl SourceId {
    pub const ALL: [SourceId; 5] = [
        SourceId::Linkedin,
        SourceId::Indeed,
        SourceId::Glassdoor,
        SourceId::ZipRecruiter,
        SourceId::Google,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Linkedin => "linkedin",
            SourceId::Indeed => "indeed",
            SourceId::Glassdoor => "glassdoor",
            SourceId::ZipRecruiter => "zip_recruiter",
            SourceId::Google => "google",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// One loosely-typed upstream cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<JsonValue>", into = "Option<JsonValue>")]
pub enum RawValue {
    #[default]
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Text(value.into())
    }

    /// True for the float NaN the upstream library uses for absent numbers,
    /// and for its stringified form.
    pub fn is_missing_numeric_sentinel(&self) -> bool {
        match self {
            RawValue::Float(v) => v.is_nan(),
            RawValue::Text(s) => s.trim().eq_ignore_ascii_case(MISSING_NUMERIC_MARKER),
            RawValue::Missing | RawValue::Integer(_) => false,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing) || self.is_missing_numeric_sentinel()
    }

    /// Non-blank textual content, passed through as sent. Numbers are
    /// rendered, sentinels are absent.
    pub fn as_text(&self) -> Option<String> {
        if self.is_missing_numeric_sentinel() {
            return None;
        }
        match self {
            RawValue::Missing => None,
            RawValue::Text(s) if s.trim().is_empty() => None,
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Integer(v) => Some(v.to_string()),
            RawValue::Float(v) => Some(v.to_string()),
        }
    }

    /// Finite numeric content. Numeric text is accepted; zero is a value.
    pub fn as_amount(&self) -> Option<Amount> {
        if self.is_missing_numeric_sentinel() {
            return None;
        }
        match self {
            RawValue::Missing => None,
            RawValue::Integer(v) => Some(Amount::Integer(*v)),
            RawValue::Float(v) if v.is_finite() => Some(Amount::Float(*v)),
            RawValue::Float(_) => None,
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if let Ok(v) = trimmed.parse::<i64>() {
                    return Some(Amount::Integer(v));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(Amount::Float)
            }
        }
    }
}

impl From<Option<JsonValue>> for RawValue {
    fn from(value: Option<JsonValue>) -> Self {
        match value {
            None | Some(JsonValue::Null) => RawValue::Missing,
            Some(JsonValue::String(s)) => RawValue::Text(s),
            Some(JsonValue::Number(n)) => match n.as_i64() {
                Some(v) => RawValue::Integer(v),
                None => n.as_f64().map(RawValue::Float).unwrap_or(RawValue::Missing),
            },
            Some(other) => RawValue::Text(other.to_string()),
        }
    }
}

impl From<RawValue> for Option<JsonValue> {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Missing => None,
            RawValue::Text(s) => Some(JsonValue::String(s)),
            RawValue::Integer(v) => Some(JsonValue::from(v)),
            RawValue::Float(v) => Some(
                serde_json::Number::from_f64(v)
                    .map(JsonValue::Number)
                    .unwrap_or_else(|| JsonValue::String(MISSING_NUMERIC_MARKER.to_string())),
            ),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

/// A present salary bound, keeping whether upstream sent it as an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Integer(i64),
    Float(f64),
}

impl Amount {
    pub fn truncated(&self) -> i64 {
        match self {
            Amount::Integer(v) => *v,
            // Saturates at the i64 bounds.
            Amount::Float(v) => v.trunc() as i64,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Integer(v) => write!(f, "{v}"),
            // Debug keeps the fractional marker on integral floats ("85000.0").
            Amount::Float(v) => write!(f, "{v:?}"),
        }
    }
}

/// Upstream job-listing record as handed over by the scraper collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub title: RawValue,
    pub company: RawValue,
    pub city: RawValue,
    pub location: RawValue,
    pub min_amount: RawValue,
    pub max_amount: RawValue,
    pub interval: RawValue,
    pub site: RawValue,
    pub job_url: RawValue,
    pub date_posted: RawValue,
    pub description: RawValue,
}

/// Whether missing fields are masked with placeholders (bulk search) or kept
/// as `null` (single listing preview).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    Strict,
    Lenient,
}

impl NormalizeMode {
    pub fn placeholder(&self, label: &str) -> Option<String> {
        match self {
            NormalizeMode::Strict => None,
            NormalizeMode::Lenient => Some(format!("Unknown {label}")),
        }
    }
}

/// Canonical job listing produced from one raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedJob {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "salary")]
    pub salary_range: Option<String>,
    #[serde(rename = "compensation")]
    pub compensation_interval: Option<String>,
    #[serde(rename = "site")]
    pub source_site: String,
    #[serde(rename = "date_posted")]
    pub posted_date: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "job_url")]
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    #[default]
    Applied,
    PhoneScreen,
    TechnicalInterview,
    OnsiteInterview,
    Offer,
    Rejected,
    Withdrawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Active,
    Interviewing,
    Inactive,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewNote {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// User-managed tracking record for one job application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub id: Uuid,
    pub company: String,
    pub position: String,
    pub applied_date: NaiveDate,
    pub stage: JobStage,
    pub status: JobStatus,
    pub salary: Option<String>,
    pub location: Option<String>,
    pub job_url: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub interview_prep: Vec<InterviewNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submission payload for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDraft {
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub applied_date: Option<NaiveDate>,
    #[serde(default)]
    pub stage: Option<JobStage>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationPatch {
    pub company: Option<String>,
    pub position: Option<String>,
    pub applied_date: Option<NaiveDate>,
    pub stage: Option<JobStage>,
    pub status: Option<JobStatus>,
    pub salary: Option<String>,
    pub location: Option<String>,
    pub job_url: Option<String>,
    pub notes: Option<String>,
}

impl ApplicationRecord {
    pub fn from_draft(draft: ApplicationDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company: draft.company,
            position: draft.position,
            applied_date: draft.applied_date.unwrap_or_else(|| now.date_naive()),
            stage: draft.stage.unwrap_or_default(),
            status: draft.status.unwrap_or_default(),
            salary: draft.salary,
            location: draft.location,
            job_url: draft.job_url,
            notes: draft.notes,
            interview_prep: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_patch(&mut self, patch: ApplicationPatch, now: DateTime<Utc>) {
        fn overwrite<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        fn overwrite_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        overwrite(&mut self.company, patch.company);
        overwrite(&mut self.position, patch.position);
        overwrite(&mut self.applied_date, patch.applied_date);
        overwrite(&mut self.stage, patch.stage);
        overwrite(&mut self.status, patch.status);
        overwrite_opt(&mut self.salary, patch.salary);
        overwrite_opt(&mut self.location, patch.location);
        overwrite_opt(&mut self.job_url, patch.job_url);
        overwrite_opt(&mut self.notes, patch.notes);
        self.updated_at = now;
    }

    pub fn push_note(&mut self, title: String, content: String, now: DateTime<Utc>) -> &InterviewNote {
        self.interview_prep.push(InterviewNote {
            id: Uuid::new_v4(),
            title,
            content,
            created_at: now,
        });
        self.updated_at = now;
        &self.interview_prep[self.interview_prep.len() - 1]
    }
}
