use actix_web::{HttpResponse, post, web};
use pingkeeper_service::monitoring::MonitorScheduler;
use pingkeeper_service::validation::ProbeDraft;
use serde::Serialize;

use crate::error::AppError;

macros_utils::routes! {
    route ping,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PingResponse {
    ok: bool,
    status: Option<u16>,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Probe a target once without scheduling it. With a `configId` the run is
/// also written to that monitor's log.
#[post("/api/ping")]
pub async fn ping(
    scheduler: web::Data<MonitorScheduler>,
    draft: web::Json<ProbeDraft>,
) -> Result<HttpResponse, AppError> {
    let draft = draft.into_inner();
    let log_run = draft.config_id.is_some();
    let monitor = draft.into_definition()?;

    let record = scheduler.probe().run(&monitor).await;
    if log_run {
        if let Err(e) = scheduler.database().append_run_record(&record).await {
            tracing::error!(monitor = %monitor.id, "Failed to store ad-hoc run: {:#}", e);
        }
    }

    let transport_failed = record.http_status.is_none();
    let body = PingResponse {
        ok: record.ok,
        status: record.http_status,
        duration_ms: record.duration_ms,
        error: record.error_message,
    };

    if transport_failed {
        Ok(HttpResponse::InternalServerError().json(body))
    } else {
        Ok(HttpResponse::Ok().json(body))
    }
}
