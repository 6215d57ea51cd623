use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use thiserror::Error;

use crate::kyc::domain::submission::{AiResult, NewSubmission, SubmissionRecord};
use crate::kyc::domain::submission_repository::SubmissionRepository;

pub const SUBMISSIONS_DB_NAME: &str = "submissions.db";

/// How long a write waits for another process holding the database lock.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "id, full_name, email, document_type, document_image_path, \
     selfie_image_path, status, risk_score, ocr_text, face_verified, face_distance, \
     created_at, updated_at";

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("submission database error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("stored submission {id} is malformed: {message}")]
    Corrupt { id: u64, message: String },
    #[error("no submission with id {0}")]
    NotFound(u64),
}

/// Submission records in a SQLite database inside the data directory.
///
/// Writes run in `IMMEDIATE` transactions against the file and nothing is
/// cached in memory, so several processes can share one data directory.
/// Ids come from `AUTOINCREMENT` and are never reused.
pub struct SqliteSubmissionRepository {
    path: PathBuf,
    conn: Connection,
}

impl SqliteSubmissionRepository {
    /// Opens the database in `data_dir`, creating the directory and schema
    /// if needed.
    pub fn open(data_dir: &Path) -> Result<Self, RepositoryError> {
        fs::create_dir_all(data_dir).map_err(|source| RepositoryError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;
        let path = data_dir.join(SUBMISSIONS_DB_NAME);
        let conn = Connection::open(&path)?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        let repo = Self { path, conn };
        repo.init_schema()?;
        log::debug!("Opened submission store {}", repo.path.display());
        Ok(repo)
    }

    pub fn with_busy_timeout(self, timeout: Duration) -> Result<Self, RepositoryError> {
        self.conn.busy_timeout(timeout)?;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_schema(&self) -> Result<(), RepositoryError> {
        self.conn.execute_batch(
            "BEGIN IMMEDIATE;
            CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL,
                email TEXT NOT NULL,
                document_type TEXT NOT NULL,
                document_image_path TEXT NOT NULL,
                selfie_image_path TEXT NOT NULL,
                status TEXT NOT NULL,
                risk_score REAL,
                ocr_text TEXT NOT NULL DEFAULT '',
                face_verified INTEGER,
                face_distance REAL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    fn insert(&mut self, submission: NewSubmission) -> Result<SubmissionRecord, RepositoryError> {
        let now = Utc::now();
        let mut record = SubmissionRecord {
            id: 0,
            full_name: submission.full_name,
            email: submission.email,
            document_type: submission.document_type,
            document_image_path: submission.document_image_path,
            selfie_image_path: submission.selfie_image_path,
            status: Default::default(),
            ai_result: AiResult::default(),
            created_at: now,
            updated_at: now,
        };
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO submissions (full_name, email, document_type, document_image_path, \
             selfie_image_path, status, risk_score, ocr_text, face_verified, face_distance, \
             created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.full_name,
                record.email,
                record.document_type.as_str(),
                path_text(&record.document_image_path),
                path_text(&record.selfie_image_path),
                record.status.as_str(),
                record.ai_result.risk_score,
                record.ai_result.ocr_text,
                record.ai_result.face_verified,
                record.ai_result.face_distance,
                format_time(&record.created_at),
                format_time(&record.updated_at),
            ],
        )?;
        record.id = tx.last_insert_rowid() as u64;
        tx.commit()?;
        Ok(record)
    }

    fn update(&mut self, record: &SubmissionRecord) -> Result<(), RepositoryError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE submissions SET full_name = ?2, email = ?3, document_type = ?4, \
             document_image_path = ?5, selfie_image_path = ?6, status = ?7, risk_score = ?8, \
             ocr_text = ?9, face_verified = ?10, face_distance = ?11, created_at = ?12, \
             updated_at = ?13 WHERE id = ?1",
            params![
                record.id as i64,
                record.full_name,
                record.email,
                record.document_type.as_str(),
                path_text(&record.document_image_path),
                path_text(&record.selfie_image_path),
                record.status.as_str(),
                record.ai_result.risk_score,
                record.ai_result.ocr_text,
                record.ai_result.face_verified,
                record.ai_result.face_distance,
                format_time(&record.created_at),
                format_time(&record.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(record.id));
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&mut self, id: u64) -> Result<bool, RepositoryError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM submissions WHERE id = ?1", params![id as i64])?;
        tx.commit()?;
        Ok(changed > 0)
    }

    fn load_all(&self) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM submissions ORDER BY id"))?;
        let rows = stmt
            .query_map([], StoredRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(StoredRow::into_record).collect()
    }
}

impl SubmissionRepository for SqliteSubmissionRepository {
    fn create(
        &mut self,
        submission: NewSubmission,
    ) -> Result<SubmissionRecord, Box<dyn std::error::Error>> {
        Ok(self.insert(submission)?)
    }

    fn save(&mut self, record: &SubmissionRecord) -> Result<(), Box<dyn std::error::Error>> {
        Ok(self.update(record)?)
    }

    fn delete(&mut self, id: u64) -> Result<bool, Box<dyn std::error::Error>> {
        Ok(self.remove(id)?)
    }

    fn list(&self) -> Result<Vec<SubmissionRecord>, Box<dyn std::error::Error>> {
        Ok(self.load_all()?)
    }
}

/// Column values as stored, before the text columns are parsed.
struct StoredRow {
    id: i64,
    full_name: String,
    email: String,
    document_type: String,
    document_image_path: String,
    selfie_image_path: String,
    status: String,
    risk_score: Option<f64>,
    ocr_text: String,
    face_verified: Option<bool>,
    face_distance: Option<f64>,
    created_at: String,
    updated_at: String,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            full_name: row.get(1)?,
            email: row.get(2)?,
            document_type: row.get(3)?,
            document_image_path: row.get(4)?,
            selfie_image_path: row.get(5)?,
            status: row.get(6)?,
            risk_score: row.get(7)?,
            ocr_text: row.get(8)?,
            face_verified: row.get(9)?,
            face_distance: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_record(self) -> Result<SubmissionRecord, RepositoryError> {
        let id = self.id as u64;
        let corrupt = |message: String| RepositoryError::Corrupt { id, message };
        Ok(SubmissionRecord {
            id,
            full_name: self.full_name,
            email: self.email,
            document_type: self.document_type.parse().map_err(corrupt)?,
            document_image_path: PathBuf::from(self.document_image_path),
            selfie_image_path: PathBuf::from(self.selfie_image_path),
            status: self.status.parse().map_err(corrupt)?,
            ai_result: AiResult {
                risk_score: self.risk_score,
                ocr_text: self.ocr_text,
                face_verified: self.face_verified,
                face_distance: self.face_distance,
            },
            created_at: parse_time(&self.created_at).map_err(corrupt)?,
            updated_at: parse_time(&self.updated_at).map_err(corrupt)?,
        })
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(text: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp {text:?}: {e}"))
}
