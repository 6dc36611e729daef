use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use pingkeeper_service::RunRecord;
use pingkeeper_service::monitoring::MonitorScheduler;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::response::ApiResponse;

macros_utils::routes! {
    route list_logs,
    route append_log,
}

const DEFAULT_LIMIT: usize = 30;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    pub config_id: Option<String>,
    pub limit: Option<usize>,
}

/// Most recent runs first, optionally for a single monitor
#[get("/api/logs")]
pub async fn list_logs(
    scheduler: web::Data<MonitorScheduler>,
    query: web::Query<LogsQuery>,
) -> Result<HttpResponse, AppError> {
    let LogsQuery { config_id, limit } = query.into_inner();
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let runs = scheduler.database().recent_runs(config_id.as_deref(), limit).await?;
    Ok(ApiResponse::data(runs).into())
}

/// Externally produced run, e.g. from a client-side check
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub config_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub status: Option<u16>,
    #[serde(default)]
    pub ok: bool,
    pub error: Option<String>,
}

impl LogEntry {
    fn into_record(self) -> Result<RunRecord, AppError> {
        let missing = |field: &str| AppError::BadRequest(format!("{field} is required"));
        let config_id = self.config_id.filter(|id| !id.trim().is_empty()).ok_or_else(|| missing("configId"))?;
        let started_at = self.started_at.ok_or_else(|| missing("startedAt"))?;
        let duration_ms = self.duration_ms.ok_or_else(|| missing("durationMs"))?;

        Ok(RunRecord {
            monitor_id: config_id,
            started_at,
            duration_ms,
            http_status: self.status,
            ok: self.ok,
            error_message: self.error,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Appended {
    log_id: i64,
}

/// Append a run record as given; nothing is probed
#[post("/api/logs")]
pub async fn append_log(
    scheduler: web::Data<MonitorScheduler>,
    entry: web::Json<LogEntry>,
) -> Result<HttpResponse, AppError> {
    let record = entry.into_inner().into_record()?;
    let log_id = scheduler.database().append_run_record(&record).await?;
    tracing::debug!(monitor = %record.monitor_id, log_id, "Run record appended");
    Ok(ApiResponse::data(Appended { log_id }).into())
}
