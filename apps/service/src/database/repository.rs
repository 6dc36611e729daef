use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Row, params};

use super::models::{StoredRunRecord, millis_to_timestamp, timestamp_to_millis};
use crate::monitoring::types::{MonitorDefinition, RunRecord};
use crate::pool::{LibsqlManager, LibsqlPool};

const MONITOR_COLUMNS: &str =
    "id, name, url, method, interval_ms, form_data, enabled, created_at, updated_at";
const RUN_COLUMNS: &str = "log_id, monitor_id, started_at, duration_ms, status, ok, error";

/// Persistent store for monitor definitions and run logs
#[async_trait]
pub trait Database: Send + Sync {
    /// Enabled monitors, oldest first
    async fn list_enabled_monitors(&self) -> Result<Vec<MonitorDefinition>>;

    /// Every monitor, oldest first
    async fn list_monitors(&self) -> Result<Vec<MonitorDefinition>>;

    async fn get_monitor(&self, id: &str) -> Result<Option<MonitorDefinition>>;

    /// Insert or update a monitor, keyed by id
    async fn save_monitor(&self, monitor: &MonitorDefinition) -> Result<()>;

    /// Delete a monitor and its run log. Returns whether the monitor existed.
    async fn delete_monitor(&self, id: &str) -> Result<bool>;

    /// Append a run record, returning its log id
    async fn append_run_record(&self, record: &RunRecord) -> Result<i64>;

    /// Most recent runs first, optionally for a single monitor
    async fn recent_runs(&self, monitor_id: Option<&str>, limit: usize) -> Result<Vec<StoredRunRecord>>;
}

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }

    async fn query_monitors(&self, sql: &str) -> Result<Vec<MonitorDefinition>> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(sql, ()).await?;
        let mut monitors = Vec::new();

        while let Some(row) = rows.next().await? {
            monitors.push(monitor_from_row(&row)?);
        }

        Ok(monitors)
    }
}

fn monitor_from_row(row: &Row) -> Result<MonitorDefinition> {
    let id: String = row.get(0)?;
    let method: String = row.get(3)?;
    let form_data: String = row.get(5)?;

    Ok(MonitorDefinition {
        name: row.get(1)?,
        target_url: row.get(2)?,
        http_method: method.parse().with_context(|| format!("monitor {id} has a bad method"))?,
        interval_ms: u64::try_from(row.get::<i64>(4)?)
            .with_context(|| format!("monitor {id} has a negative interval"))?,
        parameters: serde_json::from_str(&form_data)
            .with_context(|| format!("monitor {id} has malformed form data"))?,
        enabled: row.get::<i64>(6)? != 0,
        created_at: millis_to_timestamp(row.get(7)?)?,
        updated_at: millis_to_timestamp(row.get(8)?)?,
        id,
    })
}

fn run_from_row(row: &Row) -> Result<StoredRunRecord> {
    Ok(StoredRunRecord {
        log_id: row.get(0)?,
        record: RunRecord {
            monitor_id: row.get(1)?,
            started_at: millis_to_timestamp(row.get(2)?)?,
            duration_ms: u64::try_from(row.get::<i64>(3)?).context("negative run duration")?,
            http_status: row
                .get::<Option<i64>>(4)?
                .map(u16::try_from)
                .transpose()
                .context("run status out of range")?,
            ok: row.get::<i64>(5)? != 0,
            error_message: row.get(6)?,
        },
    })
}

#[async_trait]
impl Database for DatabaseImpl {
    async fn list_enabled_monitors(&self) -> Result<Vec<MonitorDefinition>> {
        self.query_monitors(&format!(
            "SELECT {MONITOR_COLUMNS} FROM monitors WHERE enabled = 1 ORDER BY created_at ASC, rowid ASC"
        ))
        .await
    }

    async fn list_monitors(&self) -> Result<Vec<MonitorDefinition>> {
        self.query_monitors(&format!(
            "SELECT {MONITOR_COLUMNS} FROM monitors ORDER BY created_at ASC, rowid ASC"
        ))
        .await
    }

    async fn get_monitor(&self, id: &str) -> Result<Option<MonitorDefinition>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE id = ? LIMIT 1"),
                params![id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(monitor_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_monitor(&self, monitor: &MonitorDefinition) -> Result<()> {
        let conn = self.get_conn().await?;
        let form_data = serde_json::to_string(&monitor.parameters)?;
        let interval_ms = i64::try_from(monitor.interval_ms)
            .with_context(|| format!("interval {} ms does not fit the store", monitor.interval_ms))?;

        conn.execute(
            "INSERT INTO monitors (id, name, url, method, interval_ms, form_data, enabled, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                method = excluded.method,
                interval_ms = excluded.interval_ms,
                form_data = excluded.form_data,
                enabled = excluded.enabled,
                updated_at = excluded.updated_at",
            params![
                monitor.id.clone(),
                monitor.name.clone(),
                monitor.target_url.clone(),
                monitor.http_method.as_str(),
                interval_ms,
                form_data,
                i64::from(monitor.enabled),
                timestamp_to_millis(monitor.created_at),
                timestamp_to_millis(monitor.updated_at)
            ],
        )
        .await?;

        Ok(())
    }

    async fn delete_monitor(&self, id: &str) -> Result<bool> {
        let conn = self.get_conn().await?;

        conn.execute("DELETE FROM run_logs WHERE monitor_id = ?", params![id]).await?;
        let deleted = conn.execute("DELETE FROM monitors WHERE id = ?", params![id]).await?;

        Ok(deleted > 0)
    }

    async fn append_run_record(&self, record: &RunRecord) -> Result<i64> {
        let conn = self.get_conn().await?;
        let duration_ms = i64::try_from(record.duration_ms).context("run duration does not fit the store")?;

        conn.execute(
            "INSERT INTO run_logs (monitor_id, started_at, duration_ms, status, ok, error, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                record.monitor_id.clone(),
                timestamp_to_millis(record.started_at),
                duration_ms,
                record.http_status.map(i64::from),
                i64::from(record.ok),
                record.error_message.clone(),
                timestamp_to_millis(Utc::now())
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn recent_runs(&self, monitor_id: Option<&str>, limit: usize) -> Result<Vec<StoredRunRecord>> {
        let conn = self.get_conn().await?;
        let limit = limit as i64;

        let mut rows = match monitor_id {
            Some(id) => {
                conn.query(
                    &format!(
                        "SELECT {RUN_COLUMNS} FROM run_logs WHERE monitor_id = ? ORDER BY started_at DESC, log_id DESC LIMIT ?"
                    ),
                    params![id, limit],
                )
                .await?
            }
            None => {
                conn.query(
                    &format!("SELECT {RUN_COLUMNS} FROM run_logs ORDER BY started_at DESC, log_id DESC LIMIT ?"),
                    params![limit],
                )
                .await?
            }
        };

        let mut runs = Vec::new();
        while let Some(row) = rows.next().await? {
            runs.push(run_from_row(&row)?);
        }

        Ok(runs)
    }
}
