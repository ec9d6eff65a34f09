//! Persistence for user-managed job application records.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use jobtrack_core::{ApplicationDraft, ApplicationPatch, ApplicationRecord, InterviewNote};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobtrack-storage";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job application not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// CRUD over application records plus the append-only interview-prep notes.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Newest first.
    async fn list(&self) -> Result<Vec<ApplicationRecord>, StoreError>;
    async fn get(&self, id: Uuid) -> Result<ApplicationRecord, StoreError>;
    async fn create(&self, draft: ApplicationDraft) -> Result<ApplicationRecord, StoreError>;
    async fn update(&self, id: Uuid, patch: ApplicationPatch) -> Result<ApplicationRecord, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn add_interview_note(
        &self,
        id: Uuid,
        title: String,
        content: String,
    ) -> Result<ApplicationRecord, StoreError>;
}

/// Keyed record set shared by the memory and file stores.
#[derive(Debug, Clone, Default)]
struct Ledger {
    applications: HashMap<Uuid, ApplicationRecord>,
}

impl Ledger {
    fn list(&self) -> Vec<ApplicationRecord> {
        let mut out = self.applications.values().cloned().collect::<Vec<_>>();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    fn get(&self, id: Uuid) -> Result<ApplicationRecord, StoreError> {
        self.applications
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn create(&mut self, draft: ApplicationDraft) -> ApplicationRecord {
        let record = ApplicationRecord::from_draft(draft, Utc::now());
        self.applications.insert(record.id, record.clone());
        record
    }

    fn update(&mut self, id: Uuid, patch: ApplicationPatch) -> Result<ApplicationRecord, StoreError> {
        let record = self
            .applications
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        record.apply_patch(patch, Utc::now());
        Ok(record.clone())
    }

    fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.applications
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    fn add_note(&mut self, id: Uuid, title: String, content: String) -> Result<ApplicationRecord, StoreError> {
        let record = self
            .applications
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        record.push_note(title, content, Utc::now());
        Ok(record.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryApplicationStore {
    ledger: RwLock<Ledger>,
}

impl MemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationStore for MemoryApplicationStore {
    async fn list(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
        Ok(self.ledger.read().await.list())
    }

    async fn get(&self, id: Uuid) -> Result<ApplicationRecord, StoreError> {
        self.ledger.read().await.get(id)
    }

    async fn create(&self, draft: ApplicationDraft) -> Result<ApplicationRecord, StoreError> {
        Ok(self.ledger.write().await.create(draft))
    }

    async fn update(&self, id: Uuid, patch: ApplicationPatch) -> Result<ApplicationRecord, StoreError> {
        self.ledger.write().await.update(id, patch)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.ledger.write().await.delete(id)
    }

    async fn add_interview_note(
        &self,
        id: Uuid,
        title: String,
        content: String,
    ) -> Result<ApplicationRecord, StoreError> {
        self.ledger.write().await.add_note(id, title, content)
    }
}

/// JSON snapshot on disk, rewritten atomically after every mutation.
#[derive(Debug)]
pub struct FileApplicationStore {
    path: PathBuf,
    ledger: Mutex<Ledger>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    applications: Vec<ApplicationRecord>,
}

impl FileApplicationStore {
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let ledger = if fs::try_exists(&path)
            .await
            .with_context(|| format!("checking {}", path.display()))?
        {
            let text = fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let file: LedgerFile =
                serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
            Ledger {
                applications: file.applications.into_iter().map(|r| (r.id, r)).collect(),
            }
        } else {
            Ledger::default()
        };
        info!(path = %path.display(), records = ledger.applications.len(), "opened application file store");
        Ok(Self {
            path,
            ledger: Mutex::new(ledger),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the ledger and swaps it in only once the
    /// copy is on disk, so a failed write leaves memory matching the file.
    async fn commit<T, F>(&self, change: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce(&mut Ledger) -> Result<T, StoreError> + Send,
    {
        let mut ledger = self.ledger.lock().await;
        let mut next = ledger.clone();
        let out = change(&mut next)?;
        self.persist(&next).await?;
        *ledger = next;
        Ok(out)
    }

    async fn persist(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&LedgerFile {
            applications: ledger.list(),
        })
        .context("serializing application ledger")?;
        write_atomically(&self.path, &bytes).await?;
        Ok(())
    }
}

/// Write via a sibling temp file and rename so readers never see a torn file.
async fn write_atomically(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("creating directory {}", parent.display()))?;

    let temp_path = parent.join(format!(".{}.{}.tmp", Uuid::new_v4(), bytes.len()));
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp_path)
        .await
        .with_context(|| format!("opening temp file {}", temp_path.display()))?;
    file.write_all(bytes)
        .await
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("flushing temp file {}", temp_path.display()))?;
    drop(file);

    if let Err(err) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(err).with_context(|| {
            format!("renaming {} -> {}", temp_path.display(), path.display())
        });
    }
    Ok(())
}

#[async_trait]
impl ApplicationStore for FileApplicationStore {
    async fn list(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
        Ok(self.ledger.lock().await.list())
    }

    async fn get(&self, id: Uuid) -> Result<ApplicationRecord, StoreError> {
        self.ledger.lock().await.get(id)
    }

    async fn create(&self, draft: ApplicationDraft) -> Result<ApplicationRecord, StoreError> {
        self.commit(move |ledger| Ok(ledger.create(draft))).await
    }

    async fn update(&self, id: Uuid, patch: ApplicationPatch) -> Result<ApplicationRecord, StoreError> {
        self.commit(move |ledger| ledger.update(id, patch)).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.commit(move |ledger| ledger.delete(id)).await
    }

    async fn add_interview_note(
        &self,
        id: Uuid,
        title: String,
        content: String,
    ) -> Result<ApplicationRecord, StoreError> {
        self.commit(move |ledger| ledger.add_note(id, title, content))
            .await
    }
}

const CREATE_APPLICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS applications (
    id UUID PRIMARY KEY,
    company TEXT NOT NULL,
    position TEXT NOT NULL,
    applied_date DATE NOT NULL,
    stage TEXT NOT NULL,
    status TEXT NOT NULL,
    salary TEXT,
    location TEXT,
    job_url TEXT,
    notes TEXT,
    interview_prep JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)
"#;

const SELECT_COLUMNS: &str = "id, company, position, applied_date, stage, status, salary, location, job_url, notes, interview_prep, created_at, updated_at";

/// Postgres-backed store; the table is created on connect if missing.
#[derive(Debug, Clone)]
pub struct PgApplicationStore {
    pool: PgPool,
}

impl PgApplicationStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("connecting to postgres")?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(CREATE_APPLICATIONS_TABLE)
            .execute(&self.pool)
            .await
            .context("creating applications table")?;
        Ok(())
    }

    async fn write_row<'e, E>(executor: E, record: &ApplicationRecord) -> Result<(), StoreError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO applications (
                id, company, position, applied_date, stage, status,
                salary, location, job_url, notes, interview_prep, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE
               SET company = EXCLUDED.company,
                   position = EXCLUDED.position,
                   applied_date = EXCLUDED.applied_date,
                   stage = EXCLUDED.stage,
                   status = EXCLUDED.status,
                   salary = EXCLUDED.salary,
                   location = EXCLUDED.location,
                   job_url = EXCLUDED.job_url,
                   notes = EXCLUDED.notes,
                   interview_prep = EXCLUDED.interview_prep,
                   updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.id)
        .bind(&record.company)
        .bind(&record.position)
        .bind(record.applied_date)
        .bind(enum_to_text(&record.stage)?)
        .bind(enum_to_text(&record.status)?)
        .bind(&record.salary)
        .bind(&record.location)
        .bind(&record.job_url)
        .bind(&record.notes)
        .bind(Json(&record.interview_prep))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Read-modify-write under a row lock.
    async fn modify(
        &self,
        id: Uuid,
        change: impl FnOnce(&mut ApplicationRecord) + Send,
    ) -> Result<ApplicationRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM applications WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Err(StoreError::NotFound(id));
        };
        let mut record = record_from_row(&row)?;
        change(&mut record);
        Self::write_row(&mut *tx, &record).await?;
        tx.commit().await?;
        Ok(record)
    }
}

fn enum_to_text<T: Serialize>(value: &T) -> anyhow::Result<String> {
    match serde_json::to_value(value).context("encoding enum column")? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(anyhow::anyhow!("enum column encoded as non-string: {other}")),
    }
}

fn enum_from_text<T: DeserializeOwned>(value: String) -> anyhow::Result<T> {
    serde_json::from_value(serde_json::Value::String(value.clone()))
        .with_context(|| format!("decoding enum column value {value}"))
}

fn record_from_row(row: &PgRow) -> Result<ApplicationRecord, StoreError> {
    let notes: Json<Vec<InterviewNote>> = row.try_get("interview_prep")?;
    let applied_date: NaiveDate = row.try_get("applied_date")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
    Ok(ApplicationRecord {
        id: row.try_get("id")?,
        company: row.try_get("company")?,
        position: row.try_get("position")?,
        applied_date,
        stage: enum_from_text(row.try_get("stage")?)?,
        status: enum_from_text(row.try_get("status")?)?,
        salary: row.try_get("salary")?,
        location: row.try_get("location")?,
        job_url: row.try_get("job_url")?,
        notes: row.try_get("notes")?,
        interview_prep: notes.0,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    async fn list(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM applications ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn get(&self, id: Uuid) -> Result<ApplicationRecord, StoreError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM applications WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        record_from_row(&row)
    }

    async fn create(&self, draft: ApplicationDraft) -> Result<ApplicationRecord, StoreError> {
        let record = ApplicationRecord::from_draft(draft, Utc::now());
        Self::write_row(&self.pool, &record).await?;
        Ok(record)
    }

    async fn update(&self, id: Uuid, patch: ApplicationPatch) -> Result<ApplicationRecord, StoreError> {
        self.modify(id, move |record| record.apply_patch(patch, Utc::now()))
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn add_interview_note(
        &self,
        id: Uuid,
        title: String,
        content: String,
    ) -> Result<ApplicationRecord, StoreError> {
        self.modify(id, move |record| {
            record.push_note(title, content, Utc::now());
        })
        .await
    }
}

/// `DATABASE_URL` selects Postgres, `JOBTRACK_DATA_FILE` a JSON file,
/// otherwise records live in memory.
pub async fn store_from_env() -> anyhow::Result<Arc<dyn ApplicationStore>> {
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        info!("using postgres application store");
        return Ok(Arc::new(PgApplicationStore::connect(&database_url).await?));
    }
    if let Ok(path) = std::env::var("JOBTRACK_DATA_FILE") {
        let store = FileApplicationStore::open(path).await?;
        info!(path = %store.path().display(), "using file application store");
        return Ok(Arc::new(store));
    }
    info!("using in-memory application store");
    Ok(Arc::new(MemoryApplicationStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobtrack_core::{JobStage, JobStatus};
    use tempfile::tempdir;

    fn draft(company: &str) -> ApplicationDraft {
        ApplicationDraft {
            company: company.to_string(),
            position: "Backend Engineer".to_string(),
            applied_date: NaiveDate::from_ymd_opt(2026, 10, 1),
            stage: None,
            status: None,
            salary: Some("$150,000 - $200,000".to_string()),
            location: Some("Remote".to_string()),
            job_url: Some("https://www.linkedin.com/jobs/view/1".to_string()),
            notes: Some("Referred by a former teammate".to_string()),
        }
    }

    async fn exercise_crud(store: &dyn ApplicationStore) {
        let first = store.create(draft("Acme")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = store.create(draft("Globex")).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id, "newest first");

        let updated = store
            .update(
                first.id,
                ApplicationPatch {
                    stage: Some(JobStage::TechnicalInterview),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stage, JobStage::TechnicalInterview);
        assert_eq!(updated.company, first.company);
        assert_eq!(updated.salary, first.salary);
        assert_eq!(updated.notes, first.notes);
        assert_eq!(updated.status, JobStatus::Active);
        assert_eq!(updated.created_at, first.created_at);
        assert!(updated.updated_at >= first.updated_at);

        let with_note = store
            .add_interview_note(first.id, "System design".into(), "Review queues".into())
            .await
            .unwrap();
        assert_eq!(with_note.interview_prep.len(), 1);
        assert_eq!(with_note.interview_prep[0].title, "System design");
        assert_eq!(store.get(first.id).await.unwrap(), with_note);

        store.delete(second.id).await.unwrap();
        assert!(matches!(store.get(second.id).await, Err(StoreError::NotFound(id)) if id == second.id));
        assert!(matches!(store.delete(second.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.update(second.id, ApplicationPatch::default()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.add_interview_note(second.id, "t".into(), "c".into()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn memory_store_crud() {
        exercise_crud(&MemoryApplicationStore::new()).await;
    }

    #[tokio::test]
    async fn file_store_crud_and_reload() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("data").join("applications.json");
        let store = FileApplicationStore::open(&path).await.unwrap();
        exercise_crud(&store).await;

        let remaining = store.list().await.unwrap();
        drop(store);

        let reopened = FileApplicationStore::open(&path).await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), remaining);
        assert!(path.exists());
        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn file_store_keeps_memory_in_step_when_write_fails() {
        let dir = tempdir().expect("tempdir");
        let data_dir = dir.path().join("data");
        let path = data_dir.join("applications.json");
        let store = FileApplicationStore::open(&path).await.unwrap();
        let kept = store.create(draft("Acme")).await.unwrap();

        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, "not a directory").unwrap();

        assert!(matches!(store.create(draft("Globex")).await, Err(StoreError::Backend(_))));
        assert!(store
            .update(
                kept.id,
                ApplicationPatch {
                    status: Some(JobStatus::Archived),
                    ..Default::default()
                },
            )
            .await
            .is_err());
        assert!(store
            .add_interview_note(kept.id, "t".into(), "c".into())
            .await
            .is_err());
        assert!(store.delete(kept.id).await.is_err());

        assert_eq!(store.list().await.unwrap(), vec![kept.clone()]);
        assert_eq!(store.get(kept.id).await.unwrap(), kept);
    }

    #[tokio::test]
    async fn file_store_rejects_corrupt_snapshot() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("applications.json");
        std::fs::write(&path, "[not json").unwrap();
        let err = FileApplicationStore::open(&path).await.unwrap_err();
        assert!(err.to_string().starts_with("parsing"));
    }

    #[test]
    fn enum_columns_round_trip_through_text() {
        assert_eq!(enum_to_text(&JobStage::PhoneScreen).unwrap(), "phone_screen");
        let stage: JobStage = enum_from_text("onsite_interview".to_string()).unwrap();
        assert_eq!(stage, JobStage::OnsiteInterview);
        let status: JobStatus = enum_from_text("interviewing".to_string()).unwrap();
        assert_eq!(status, JobStatus::Interviewing);
        assert!(enum_from_text::<JobStatus>("paused".to_string()).is_err());
    }

    #[tokio::test]
    async fn postgres_store_crud_when_database_available() {
        let Ok(database_url) = std::env::var("JOBTRACK_TEST_DATABASE_URL") else {
            return;
        };
        let store = PgApplicationStore::connect(&database_url).await.unwrap();
        sqlx::query("DELETE FROM applications")
            .execute(&store.pool)
            .await
            .unwrap();
        exercise_crud(&store).await;
    }
}
