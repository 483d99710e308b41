//! SQLite-backed durable record store.
//!
//! One row per DPR record. The nested analysis is stored as a JSON column;
//! the top-level result fields get their own columns so listing and
//! filtering stay in SQL. Terminal transitions are single `UPDATE`s guarded
//! on `status = 'processing'`.
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use dprscope_core::{
    Analysis, Completion, DprError, DprRecord, DprResult, DprStatus, Failure, RecordQuery,
    RecordStore,
};

use crate::{already_finalized, not_found};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS dpr_records (
         id            TEXT PRIMARY KEY,
         filename      TEXT NOT NULL,
         status        TEXT NOT NULL,
         analysis      TEXT,
         decision      TEXT,
         risk_level    TEXT,
         overall_score INTEGER,
         feedback      TEXT,
         error         TEXT,
         created_at    TEXT NOT NULL,
         updated_at    TEXT NOT NULL
     );
     CREATE INDEX IF NOT EXISTS idx_dpr_created ON dpr_records(created_at);
     CREATE INDEX IF NOT EXISTS idx_dpr_risk ON dpr_records(risk_level);";

const SELECT_COLUMNS: &str = "SELECT id, filename, status, analysis, decision, risk_level,
            overall_score, feedback, error, created_at, updated_at FROM dpr_records";

fn storage_err(e: impl std::fmt::Display) -> DprError {
    DprError::Storage(e.to_string())
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> DprResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(storage_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(storage_err)?;
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        info!(path = ?path.as_ref(), "DPR record store opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> DprResult<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn fetch(conn: &Connection, id: Uuid) -> DprResult<Option<DprRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        conn.query_row(&sql, params![id.to_string()], row_to_record)
            .optional()
            .map_err(storage_err)
    }

    /// Work out why a guarded update touched no rows.
    fn explain_miss(conn: &Connection, id: Uuid) -> DprError {
        match Self::fetch(conn, id) {
            Ok(Some(record)) => already_finalized(id, record.status),
            Ok(None) => not_found(id),
            Err(e) => e,
        }
    }

    fn reload(conn: &Connection, id: Uuid) -> DprResult<DprRecord> {
        Self::fetch(conn, id)?.ok_or_else(|| not_found(id))
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create(&self, filename: &str) -> DprResult<DprRecord> {
        let record = DprRecord::new(filename);
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO dpr_records (id, filename, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.to_string(),
                record.filename,
                record.status.as_str(),
                timestamp(&record.created_at),
                timestamp(&record.updated_at),
            ],
        )
        .map_err(storage_err)?;
        debug!(id = %record.id, "Created DPR placeholder");
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> DprResult<Option<DprRecord>> {
        let conn = self.conn.lock().await;
        Self::fetch(&conn, id)
    }

    async fn complete(&self, id: Uuid, completion: &Completion) -> DprResult<DprRecord> {
        let analysis = serde_json::to_string(&completion.analysis).map_err(storage_err)?;
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE dpr_records
                 SET status = ?2, analysis = ?3, decision = ?4, risk_level = ?5,
                     overall_score = ?6, feedback = ?7, error = NULL, updated_at = ?8
                 WHERE id = ?1 AND status = 'processing'",
                params![
                    id.to_string(),
                    DprStatus::Done.as_str(),
                    analysis,
                    completion.decision.as_str(),
                    completion.risk_level.as_str(),
                    completion.overall_score,
                    completion.feedback,
                    timestamp(&Utc::now()),
                ],
            )
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(Self::explain_miss(&conn, id));
        }
        Self::reload(&conn, id)
    }

    async fn fail(&self, id: Uuid, failure: &Failure) -> DprResult<DprRecord> {
        let analysis = failure
            .partial
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(storage_err)?;
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE dpr_records
                 SET status = ?2, analysis = ?3, error = ?4, updated_at = ?5
                 WHERE id = ?1 AND status = 'processing'",
                params![
                    id.to_string(),
                    DprStatus::Failed.as_str(),
                    analysis,
                    failure.reason,
                    timestamp(&Utc::now()),
                ],
            )
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(Self::explain_miss(&conn, id));
        }
        Self::reload(&conn, id)
    }

    async fn set_feedback(&self, id: Uuid, feedback: &str) -> DprResult<DprRecord> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE dpr_records SET feedback = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), feedback, timestamp(&Utc::now())],
            )
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Self::reload(&conn, id)
    }

    async fn list(&self, query: &RecordQuery) -> DprResult<Vec<DprRecord>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "{SELECT_COLUMNS}
             WHERE (?1 IS NULL OR risk_level = ?1) AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC, id ASC LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
        let rows = stmt
            .query_map(
                params![
                    query.risk_level.map(|l| l.as_str()),
                    query.status.map(|s| s.as_str()),
                    query.limit as i64,
                ],
                row_to_record,
            )
            .map_err(storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
    }
}

// ---------------------------------------------------------------------------
// Row deserialization helper
// ---------------------------------------------------------------------------

fn conversion_err(e: impl std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::InvalidParameterName(e.to_string())
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(conversion_err)
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<DprRecord> {
    let id: String = row.get(0)?;
    let filename: String = row.get(1)?;
    let status: String = row.get(2)?;
    let analysis: Option<String> = row.get(3)?;
    let decision: Option<String> = row.get(4)?;
    let risk_level: Option<String> = row.get(5)?;
    let overall_score: Option<u8> = row.get(6)?;
    let feedback: Option<String> = row.get(7)?;
    let error: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    let analysis: Option<Analysis> = analysis
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(conversion_err)?;

    Ok(DprRecord {
        id: Uuid::parse_str(&id).map_err(conversion_err)?,
        filename,
        status: status.parse().map_err(conversion_err)?,
        analysis,
        decision: decision.map(|d| d.parse()).transpose().map_err(conversion_err)?,
        risk_level: risk_level.map(|l| l.parse()).transpose().map_err(conversion_err)?,
        overall_score,
        feedback,
        error,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}
