use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use pingkeeper_service::monitoring::{DueOutcome, MonitorScheduler, TaskStatus};
use serde::Serialize;

use crate::error::AppError;
use crate::response::ApiResponse;

macros_utils::routes! {
    route init_scheduler,
    route scheduler_status,
    route run_scheduler,
    route reset_scheduler,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActiveTask {
    id: String,
    #[serde(flatten)]
    status: TaskStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    is_initialized: bool,
    active_tasks: Vec<ActiveTask>,
    total_tasks: usize,
    running_tasks: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetReport {
    reset_time: DateTime<Utc>,
}

#[post("/api/scheduler/init")]
pub async fn init_scheduler(scheduler: web::Data<MonitorScheduler>) -> Result<HttpResponse, AppError> {
    scheduler.initialize_scheduler().await?;
    Ok(ApiResponse::message("Scheduler initialized").into())
}

#[get("/api/scheduler/status")]
pub async fn scheduler_status(scheduler: web::Data<MonitorScheduler>) -> HttpResponse {
    let mut active_tasks: Vec<ActiveTask> = scheduler
        .get_all_task_status()
        .await
        .into_iter()
        .map(|(id, status)| ActiveTask { id, status })
        .collect();
    active_tasks.sort_by(|a, b| a.status.next_run_at.cmp(&b.status.next_run_at).then_with(|| a.id.cmp(&b.id)));

    let report = StatusReport {
        is_initialized: scheduler.is_scheduler_initialized().await,
        total_tasks: active_tasks.len(),
        active_tasks,
        running_tasks: scheduler.get_running_tasks_count().await,
    };
    ApiResponse::data(report).into()
}

/// External tick: run whatever is due now
#[get("/api/scheduler/run")]
pub async fn run_scheduler(scheduler: web::Data<MonitorScheduler>) -> Result<HttpResponse, AppError> {
    let results = scheduler.run_due_monitors().await?;

    let (mut executed, mut failed, mut busy, mut skipped) = (0, 0, 0, 0);
    for run in &results {
        match &run.outcome {
            DueOutcome::Executed { record } if record.ok => executed += 1,
            DueOutcome::Executed { .. } => failed += 1,
            DueOutcome::Busy => busy += 1,
            DueOutcome::Skipped { .. } => skipped += 1,
        }
    }

    let message = format!(
        "Executed {executed} monitors, {failed} failed, {busy} busy, {skipped} skipped"
    );
    Ok(ApiResponse::data(results).with_message(message).into())
}

/// Drop every registration and reload enabled monitors from the store
#[post("/api/scheduler/reset")]
pub async fn reset_scheduler(scheduler: web::Data<MonitorScheduler>) -> Result<HttpResponse, AppError> {
    let reset_time = Utc::now();
    scheduler.reload().await?;
    Ok(ApiResponse::data(ResetReport { reset_time }).with_message("Scheduler reset").into())
}
