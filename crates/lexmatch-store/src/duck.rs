//! DuckDB storage for lawyers and case history.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use arrow::record_batch::RecordBatch;
use duckdb::{Connection, params};
use lexmatch_core::{CaseHistory, CaseRecord, LawyerDirectory, LawyerRecord, SourceError};
use tracing::{debug, info};

use crate::StoreError;
use crate::records::{assignments_from_batches, lawyers_from_batches};

const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS lawyers (
        id BIGINT PRIMARY KEY,
        name VARCHAR,
        experience VARCHAR,
        cases_handled INTEGER,
        specializations VARCHAR[],
        credentials_verified BOOLEAN
    );
    CREATE TABLE IF NOT EXISTS cases (
        id BIGINT PRIMARY KEY,
        case_type VARCHAR,
        urgency VARCHAR,
        status VARCHAR,
        lawyer_id BIGINT
    );
";

const CLOSED_ASSIGNMENTS: &str = "
    SELECT c.id AS case_id, c.case_type, c.urgency, c.status,
           l.id AS lawyer_id, l.name, l.experience, l.cases_handled,
           l.specializations, l.credentials_verified
    FROM cases c
    JOIN lawyers l ON c.lawyer_id = l.id
    WHERE upper(c.status) IN ('COMPLETED', 'CLOSED')
    ORDER BY c.id
";

/// DuckDB store holding a `lawyers` table and a `cases` table.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for a database file that survives across process restarts.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database with empty tables.
    pub fn open() -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.create_tables()?;
        Ok(store)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        store.create_tables()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("duckdb connection lock poisoned".into()))
    }

    /// Create `lawyers` and `cases` if they do not already exist.
    pub fn create_tables(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(CREATE_TABLES)?;
        Ok(())
    }

    /// Specializations travel as one comma-joined parameter, so a value
    /// containing a comma is rejected.
    pub fn insert_lawyer(&self, lawyer: &LawyerRecord) -> Result<(), StoreError> {
        if let Some(bad) = lawyer.specializations.iter().find(|s| s.contains(',')) {
            return Err(StoreError::InvalidValue {
                column: "specializations",
                value: bad.clone(),
            });
        }
        let specs = lawyer.specializations.join(",");
        self.conn()?.execute(
            "INSERT OR REPLACE INTO lawyers VALUES
                (?, ?, ?, ?, list_filter(string_split(?, ','), x -> x <> ''), ?)",
            params![
                lawyer.id,
                lawyer.name,
                lawyer.experience,
                lawyer.cases_handled,
                specs,
                lawyer.credentials_verified,
            ],
        )?;
        Ok(())
    }

    pub fn insert_case(&self, case: &CaseRecord) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO cases VALUES (?, ?, ?, ?, ?)",
            params![
                case.id,
                case.case_type,
                case.urgency,
                case.status.as_str(),
                case.lawyer_id,
            ],
        )?;
        Ok(())
    }

    /// Replace the `lawyers` table with the contents of a Parquet file.
    pub fn load_lawyers(&self, path: &Path) -> Result<(), StoreError> {
        self.load_table("lawyers", path)
    }

    /// Replace the `cases` table with the contents of a Parquet file.
    pub fn load_cases(&self, path: &Path) -> Result<(), StoreError> {
        self.load_table("cases", path)
    }

    fn load_table(&self, table: &str, path: &Path) -> Result<(), StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let sql = format!(
            "CREATE OR REPLACE TABLE {table} AS SELECT * FROM read_parquet('{}')",
            path.display()
        );
        self.conn()?.execute_batch(&sql)?;
        let count = self.count_table(table)?;
        info!(table, count, "loaded table from parquet");
        Ok(())
    }

    // ── Counts ──

    pub fn lawyer_count(&self) -> Result<usize, StoreError> {
        self.count_table("lawyers")
    }

    pub fn case_count(&self) -> Result<usize, StoreError> {
        self.count_table("cases")
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {table}");
        let batches = self.query_arrow(&sql)?;
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }
}

impl CaseHistory for DuckStore {
    fn find_closed_cases_with_assigned_lawyer(
        &self,
    ) -> Result<Vec<(CaseRecord, LawyerRecord)>, SourceError> {
        let batches = self.query_arrow(CLOSED_ASSIGNMENTS)?;
        let pairs = assignments_from_batches(&batches)?;
        debug!(count = pairs.len(), "fetched closed assignments");
        Ok(pairs)
    }
}

impl LawyerDirectory for DuckStore {
    fn find_all_lawyers(&self) -> Result<Vec<LawyerRecord>, SourceError> {
        let batches = self.query_arrow("SELECT * FROM lawyers ORDER BY id")?;
        Ok(lawyers_from_batches(&batches)?)
    }
}
