use std::{str::FromStr, time::Duration};

use appbuild::{BuildRecord, BuildStatus, BuildType, LogEntry};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    ConnectOptions,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt build record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Build records keyed by local id.
///
/// Every call is a single-row read or write; nothing is cached in process.
#[derive(Clone)]
pub struct BuildStore {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct BuildRow {
    id: String,
    provider_job_id: String,
    status: String,
    website_url: String,
    app_name: String,
    package_name: String,
    build_type: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    download_url: Option<String>,
    provider_detail_url: Option<String>,
    logs: String,
}

impl TryFrom<BuildRow> for BuildRecord {
    type Error = StoreError;

    fn try_from(row: BuildRow) -> Result<Self, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        };
        let status = BuildStatus::from_str(&row.status).map_err(|e| corrupt(e.to_string()))?;
        let build_type = row
            .build_type
            .parse::<BuildType>()
            .map_err(|e| corrupt(e.to_string()))?;
        let logs: Vec<LogEntry> =
            serde_json::from_str(&row.logs).map_err(|e| corrupt(format!("logs: {e}")))?;

        Ok(BuildRecord {
            id: row.id,
            provider_job_id: row.provider_job_id,
            status,
            website_url: row.website_url,
            app_name: row.app_name,
            package_name: row.package_name,
            build_type,
            started_at: row.started_at,
            completed_at: row.completed_at,
            updated_at: row.updated_at,
            download_url: row.download_url,
            provider_detail_url: row.provider_detail_url,
            logs,
        })
    }
}

fn encode_logs(record: &BuildRecord) -> Result<String, StoreError> {
    serde_json::to_string(&record.logs).map_err(|e| StoreError::Corrupt {
        id: record.id.clone(),
        reason: format!("logs: {e}"),
    })
}

impl BuildStore {
    /// Open (creating if missing) the database at `database_url` and run
    /// migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30))
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database, for tests and throwaway demos.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // A memory database lives as long as its one connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS builds (
                id TEXT PRIMARY KEY,
                provider_job_id TEXT NOT NULL,
                status TEXT NOT NULL,
                website_url TEXT NOT NULL,
                app_name TEXT NOT NULL,
                package_name TEXT NOT NULL,
                build_type TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                updated_at TEXT NOT NULL,
                download_url TEXT,
                provider_detail_url TEXT,
                logs TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_builds_provider_job ON builds(provider_job_id)"#,
        )
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn insert(&self, record: &BuildRecord) -> Result<(), StoreError> {
        let logs = encode_logs(record)?;
        sqlx::query(
            r#"
            INSERT INTO builds (
                id, provider_job_id, status, website_url, app_name, package_name, build_type,
                started_at, completed_at, updated_at, download_url, provider_detail_url, logs
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&record.id)
        .bind(&record.provider_job_id)
        .bind(record.status.as_str())
        .bind(&record.website_url)
        .bind(&record.app_name)
        .bind(&record.package_name)
        .bind(record.build_type.as_str())
        .bind(record.started_at)
        .bind(record.completed_at)
        .bind(record.updated_at)
        .bind(&record.download_url)
        .bind(&record.provider_detail_url)
        .bind(logs)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<BuildRecord>, StoreError> {
        let row = sqlx::query_as::<_, BuildRow>(
            r#"
            SELECT id, provider_job_id, status, website_url, app_name, package_name, build_type,
                   started_at, completed_at, updated_at, download_url, provider_detail_url, logs
            FROM builds
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BuildRecord::try_from).transpose()
    }

    /// Write the mutable fields of `record` only if the stored status is
    /// still `expected`. Returns whether the write happened.
    ///
    /// Terminal rows are never rewritten.
    pub async fn compare_and_set(
        &self,
        record: &BuildRecord,
        expected: BuildStatus,
    ) -> Result<bool, StoreError> {
        if expected.is_terminal() {
            return Ok(false);
        }

        let logs = encode_logs(record)?;
        let res = sqlx::query(
            r#"
            UPDATE builds
            SET status = ?1, completed_at = ?2, updated_at = ?3, download_url = ?4, logs = ?5
            WHERE id = ?6 AND status = ?7
            "#,
        )
        .bind(record.status.as_str())
        .bind(record.completed_at)
        .bind(record.updated_at)
        .bind(&record.download_url)
        .bind(logs)
        .bind(&record.id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }
}
